//! High-level connection lifecycle: registration, the pump loop that drains
//! a context's patch queue onto the wire, and the disconnect/cleanup guard
//! (spec.md §4.6, §4.8). Grounded on this lineage's `sse::manager::Manager`
//! + `web::sse::handler::sse_handler`: a connection registers an unbounded
//! channel, a stream built with `async-stream` consumes it, and the stream
//! is wrapped in `axum::response::sse::Sse`. Reconnection and the delayed
//! cleanup grace window are new behavior this lineage's SSE module doesn't
//! have (its own doc calls its connections "ephemeral, no reconnect
//! window") -- the one place this crate deliberately extends rather than
//! imitates, recorded in DESIGN.md.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_stream::stream;
use axum::response::sse::Event;
use futures::Stream;
use log::info;
use tokio::sync::mpsc;
use via_core::Context;

use crate::connection::{ConnectionId, ConnectionRegistry};
use crate::encode::encode_patch;

pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Open a new SSE connection for `ctx`: register it, spawn the pump
    /// task that drains `ctx`'s patch queue on `poll_interval` (sending a
    /// `: keepalive` comment every `keepalive_interval` of silence instead),
    /// and return the connection id plus the stream the handler hands to
    /// `axum::response::sse::Sse`.
    ///
    /// Disconnection is detected in two independent ways, mirroring the
    /// two cleanup paths the teacher's own handler has but generalized to
    /// actually fire on client disconnect rather than only on an explicit
    /// sender-side close: the pump task notices its send side has nowhere
    /// to go and stops itself; the stream's `DisconnectGuard`, dropped
    /// whenever axum drops the stream (the reliable client-disconnect
    /// signal), does the context-level unregister and schedules the
    /// delayed cleanup timer (spec.md §4.8).
    pub fn connect(
        &self,
        ctx: Context,
        poll_interval: Duration,
        keepalive_interval: Duration,
        cleanup_grace: Duration,
    ) -> (ConnectionId, impl Stream<Item = Result<Event, Infallible>>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection_id = self.registry.register(ctx.id().to_string(), tx.clone());
        info!("registered SSE connection for context {}", ctx.id());

        let pump_ctx = ctx.clone();
        tokio::spawn(async move {
            let mut last_sent = Instant::now();
            loop {
                tokio::time::sleep(poll_interval).await;
                let patches = pump_ctx.drain_patches();
                if patches.is_empty() {
                    if last_sent.elapsed() >= keepalive_interval {
                        if tx.send(Ok(Event::default().comment("keepalive"))).is_err() {
                            break;
                        }
                        last_sent = Instant::now();
                    }
                    continue;
                }
                for patch in patches {
                    if tx.send(Ok(encode_patch(&patch))).is_err() {
                        return;
                    }
                    last_sent = Instant::now();
                }
            }
        });

        let registry = self.registry.clone();
        let guard_connection_id = connection_id.clone();
        let guard_ctx = ctx;
        let stream = stream! {
            let _guard = DisconnectGuard {
                registry,
                connection_id: guard_connection_id,
                ctx: guard_ctx,
                grace: cleanup_grace,
            };
            while let Some(event) = rx.recv().await {
                yield event;
            }
        };

        (connection_id, stream)
    }

    pub fn unregister_connection(&self, connection_id: &ConnectionId) {
        self.registry.unregister(connection_id);
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs once the SSE stream is dropped, whether that's a clean end-of-loop
/// (never happens here -- the pump loop is unbounded) or axum tearing the
/// response body down because the client went away. Unregisters the
/// connection and the context from its scopes immediately, then arms the
/// grace-period timer that either cancels itself on reconnect or finishes
/// tearing the context down (spec.md §4.6, §4.8).
struct DisconnectGuard {
    registry: Arc<ConnectionRegistry>,
    connection_id: ConnectionId,
    ctx: Context,
    grace: Duration,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        self.registry.unregister(&self.connection_id);
        self.ctx.application().unregister_context(&self.ctx);

        let grace_ctx = self.ctx.clone();
        self.ctx.schedule_delayed_cleanup(self.grace, async move {
            grace_ctx.cancel_timers();
            grace_ctx.run_cleanup_callbacks();
            grace_ctx.application().destroy_context(&grace_ctx);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::collections::HashMap;
    use std::sync::Arc as StdArc;
    use via_core::Application;

    fn test_ctx(app: &StdArc<Application>) -> Context {
        let ctx = Context::create(app.clone(), "/test", HashMap::new(), "sess-1".to_string());
        app.register_context(&ctx);
        ctx
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connect_delivers_patches_already_queued_before_the_stream_is_polled() {
        let app = StdArc::new(Application::new());
        let ctx = test_ctx(&app);
        ctx.exec_script("console.log('hi')");

        let manager = Manager::new();
        let (_id, stream) = manager.connect(
            ctx,
            Duration::from_millis(10),
            Duration::from_secs(30),
            Duration::from_secs(5),
        );
        tokio::pin!(stream);
        let first = tokio::time::timeout(Duration::from_secs(1), stream.next()).await;
        assert!(first.is_ok(), "expected a patch event within the timeout");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dropping_the_stream_unregisters_the_context_from_its_scopes() {
        let app = StdArc::new(Application::new());
        let ctx = test_ctx(&app);
        ctx.scope("room:lobby");

        let manager = Manager::new();
        let (_id, stream) = manager.connect(
            ctx.clone(),
            Duration::from_millis(10),
            Duration::from_secs(30),
            Duration::from_secs(5),
        );
        drop(stream);
        tokio::task::yield_now().await;

        // Once unregistered, a broadcast to its old scope no longer reaches it.
        app.broadcast("room:lobby");
        assert!(ctx.drain_patches().is_empty());
    }
}
