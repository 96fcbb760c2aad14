//! `GET`/`HEAD` on a registered page route: builds the `Context`, runs the
//! developer's page handler through [`via_core::Router`], renders the
//! initial (non-update) HTML, and wraps it in the shell (spec.md §6).
//!
//! Unmatched paths and any method besides `GET`/`HEAD` fall through to a
//! plain 404, matching the teacher's own `static_routes` fallback shape
//! (a `ServeDir`-style catch-all, here a developer-route catch-all instead).

use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use log::error;

use crate::session;
use crate::shell;
use crate::state::AppState;

pub async fn page_handler(State(state): State<AppState>, method: Method, headers: HeaderMap, OriginalUri(uri): OriginalUri) -> Response {
    let path = uri.path();

    let Some((route, raw_params)) = state.pages.matching(path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let route_pattern = route.pattern().to_string();

    if method == Method::HEAD {
        return StatusCode::OK.into_response();
    }
    if method != Method::GET {
        return StatusCode::NOT_FOUND.into_response();
    }

    let (session_id, minted_cookie) = match session::read_session_id(&headers, &state.config.session_cookie_name) {
        Some(id) => (id, None),
        None => {
            let id = session::new_session_id();
            let cookie = session::set_cookie_header(&state.config.session_cookie_name, &id, state.config.session_cookie_max_age_days);
            (id, Some(cookie))
        }
    };

    let ctx = via_core::Context::create(state.app.clone(), &route_pattern, raw_params, session_id);
    state.app.register_context(&ctx);

    if let Some(Err(err)) = state.pages.invoke(&ctx, path) {
        error!("page handler for {route_pattern} failed: {err}");
        state.app.destroy_context(&ctx);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let rendered = match state.app.renderer().render(&ctx, false) {
        Ok(html) => html,
        Err(err) => {
            error!("initial render for {route_pattern} failed: {err}");
            state.app.destroy_context(&ctx);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let document = shell::render_shell(&ctx, &rendered, &state.app.head_fragments(), &state.app.foot_fragments());

    let mut response = Html(document).into_response();
    if let Some(cookie) = minted_cookie {
        response.headers_mut().insert(axum::http::header::SET_COOKIE, cookie);
    }
    response
}
