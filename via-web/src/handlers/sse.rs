//! `GET /_sse`: the single long-lived stream driving a page's updates
//! (spec.md §4.6). A stale or missing `via_ctx` gets one `reload` script
//! patch and the stream ends (scenario S5); otherwise the context is pulled
//! back out of the grace window (if any), re-registered into its scopes,
//! handed a fresh patch queue, resynchronised with whatever signals the
//! client already has, and handed off to [`via_sse::Manager::connect`].

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use via_core::ClientRecord;

use crate::signals::InboundSignals;
use crate::state::AppState;

type BoxedEventStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

pub async fn sse_handler(State(state): State<AppState>, Query(params): Query<HashMap<String, String>>) -> Sse<BoxedEventStream> {
    let inbound = InboundSignals::from_query_params(&params);
    let ctx = inbound.context_id.as_deref().and_then(|id| state.app.find_context(id));

    let Some(ctx) = ctx else {
        let once = futures::stream::once(async { Ok(via_sse::reload_event()) });
        return Sse::new(Box::pin(once) as BoxedEventStream).keep_alive(KeepAlive::default());
    };

    ctx.cancel_delayed_cleanup();
    state.app.register_context(&ctx);
    ctx.recreate_patch_queue();
    ctx.apply_inbound_signals(&inbound.flat);
    ctx.sync_safe();

    state.app.register_client(ClientRecord::new(format!("conn-{}", ctx.id()), None));

    let (_connection_id, stream) = state.sse.connect(
        ctx,
        state.config.sse_poll_interval,
        state.config.sse_keepalive_interval,
        state.config.cleanup_grace,
    );

    Sse::new(Box::pin(stream) as BoxedEventStream).keep_alive(KeepAlive::default())
}
