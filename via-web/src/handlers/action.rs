//! `GET`/`POST /_action/{id}`: dispatches to whatever action -- TAB, scoped,
//! route, global or a descendant component's -- `Context::execute_action`'s
//! lookup order resolves to (spec.md §4.4, §6). The inbound signals snapshot
//! is applied onto the context first, so the action body observes whatever
//! the client displayed when it fired.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::WebError;
use crate::signals::InboundSignals;
use crate::state::AppState;

pub async fn action_handler(
    State(state): State<AppState>,
    Path(action_id): Path<String>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let inbound = if method == Method::POST && !body.is_empty() {
        InboundSignals::from_body(&body)
    } else {
        InboundSignals::from_query_params(&params)
    };

    let Some(context_id) = inbound.context_id else {
        return (StatusCode::BAD_REQUEST, "Invalid context").into_response();
    };
    let Some(ctx) = state.app.find_context(&context_id) else {
        return (StatusCode::BAD_REQUEST, "Invalid context").into_response();
    };

    ctx.apply_inbound_signals(&inbound.flat);

    match ctx.execute_action(&action_id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => WebError::from(err).into_response(),
    }
}
