//! `GET /_stats`: a plain observability probe over the process's live
//! state (spec.md §6) -- context/client counts, the render cache's timing
//! stats, RSS, and uptime. No auth, no persistence: a single JSON blob read
//! straight off the running `Application`.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn stats_handler(State(state): State<AppState>) -> Json<Value> {
    let render = state.app.stats();
    let (current_kb, peak_kb) = state.memory.sample();
    let clients: serde_json::Map<String, Value> = state
        .app
        .clients()
        .into_iter()
        .map(|c| {
            let record = json!({
                "identicon": c.identicon,
                "connected_seconds_ago": c.connected_at.elapsed().as_secs(),
                "remote_addr": c.remote_addr,
            });
            (c.connection_id, record)
        })
        .collect();

    Json(json!({
        "contexts": state.app.context_count(),
        "clients": clients,
        "render_stats": {
            "render_count": render.render_count,
            "total_time": render.total_time_ms,
            "avg_time": render.avg_time_ms,
            "min_time": render.min_time_ms,
            "max_time": render.max_time_ms,
        },
        "memory": {
            "current": current_kb,
            "peak": peak_kb,
        },
        "uptime": state.started_at.elapsed().as_secs(),
    }))
}
