//! `POST /_session/close`: the `navigator.sendBeacon` target the shell's
//! `beforeunload` listener hits (spec.md §6). Always answers `200` --
//! there's no client left to read a failure by the time this fires -- and
//! tears the context's scopes down immediately rather than waiting for the
//! SSE stream's own disconnect guard, which may lag behind tab close by the
//! poll interval or may never fire if the stream never connected.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;

use crate::state::AppState;

pub async fn session_close_handler(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let context_id = String::from_utf8_lossy(&body).trim().to_string();

    if let Some(ctx) = state.app.find_context(&context_id) {
        state.app.unregister_context(&ctx);
        let grace = state.config.cleanup_grace;
        let cleanup_ctx = ctx.clone();
        ctx.schedule_delayed_cleanup(grace, async move {
            cleanup_ctx.cancel_timers();
            cleanup_ctx.run_cleanup_callbacks();
            cleanup_ctx.application().destroy_context(&cleanup_ctx);
        });
    }

    StatusCode::OK
}
