//! `Patch` -> `axum::response::sse::Event` encoding (spec.md §4.6 "Patch
//! encoding"). Mirrors the serialize-then-wrap shape of this lineage's
//! `sse::manager::Manager::send_message`, generalized from one `Event` enum
//! variant per domain event to the three fixed patch kinds `via_core`
//! defines.

use axum::response::sse::Event;
use serde_json::json;
use via_core::Patch;

/// Event-type name sent on the wire. What a client library does with each
/// name is its concern, not this crate's (spec.md §4.6).
pub fn encode_patch(patch: &Patch) -> Event {
    match patch {
        Patch::Elements { html, selector, mode } => {
            let payload = json!({
                "html": html,
                "selector": selector,
                "mode": mode,
            });
            Event::default().event("elements").data(payload.to_string())
        }
        Patch::Signals { value } => Event::default().event("signals").data(value.to_string()),
        Patch::Script { js } => {
            let payload = json!({ "js": js });
            Event::default().event("script").data(payload.to_string())
        }
    }
}

/// The one-shot "your context is gone, reload" patch sent for a stale
/// `via_ctx` on SSE connect (spec.md §4.6, scenario S5).
pub fn reload_event() -> Event {
    let payload = json!({ "js": "window.location.reload()" });
    Event::default().event("script").data(payload.to_string())
}
