//! Dual-index connection registry, generalized from this lineage's
//! `sse::connection::ConnectionRegistry` (primary store by connection id,
//! secondary index by user id) to index by context id instead of user id --
//! a `via` context, not an authenticated user, is the addressable recipient.

use std::collections::HashSet;
use std::convert::Infallible;

use axum::response::sse::Event;
use dashmap::DashMap;
use log::warn;
use tokio::sync::mpsc::UnboundedSender;

pub type ContextId = String;

/// Server-generated identifier for one open SSE stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

struct ConnectionInfo {
    context_id: ContextId,
    sender: UnboundedSender<Result<Event, Infallible>>,
}

/// Primary storage keyed by connection id for O(1) registration/cleanup;
/// secondary index keyed by context id for O(1) lookup when a non-pump
/// code path needs to reach a context's live connections directly (the
/// stale-context reload push, spec.md §4.6, happens before any connection
/// is registered and so never touches this registry at all).
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionInfo>,
    context_index: DashMap<ContextId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            context_index: DashMap::new(),
        }
    }

    pub fn register(
        &self,
        context_id: ContextId,
        sender: UnboundedSender<Result<Event, Infallible>>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                context_id: context_id.clone(),
                sender,
            },
        );
        self.context_index
            .entry(context_id)
            .or_default()
            .insert(connection_id.clone());
        connection_id
    }

    pub fn unregister(&self, connection_id: &ConnectionId) {
        if let Some((_, info)) = self.connections.remove(connection_id) {
            if let Some(mut entry) = self.context_index.get_mut(&info.context_id) {
                entry.remove(connection_id);
                if entry.is_empty() {
                    drop(entry);
                    self.context_index.remove(&info.context_id);
                }
            }
        }
    }

    /// Send one event to every connection currently open for `context_id`.
    pub fn send_to_context(&self, context_id: &ContextId, event: Event) {
        if let Some(connection_ids) = self.context_index.get(context_id) {
            for conn_id in connection_ids.iter() {
                if let Some(info) = self.connections.get(conn_id) {
                    if let Err(e) = info.sender.send(Ok(event.clone())) {
                        warn!("failed to send event to connection {}: {e}", conn_id.as_str());
                    }
                }
            }
        }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn context_count(&self) -> usize {
        self.context_index.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> (UnboundedSender<Result<Event, Infallible>>, tokio::sync::mpsc::UnboundedReceiver<Result<Event, Infallible>>) {
        tokio::sync::mpsc::unbounded_channel()
    }

    #[test]
    fn register_then_unregister_drops_the_empty_context_index_entry() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = sender();
        let id = registry.register("ctx-1".to_string(), tx);
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.context_count(), 1);

        registry.unregister(&id);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.context_count(), 0);
    }

    #[test]
    fn send_to_context_reaches_every_connection_for_that_context() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = sender();
        let (tx2, mut rx2) = sender();
        registry.register("ctx-1".to_string(), tx1);
        registry.register("ctx-1".to_string(), tx2);

        registry.send_to_context(&"ctx-1".to_string(), Event::default().event("script").data("x"));

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn send_to_context_does_not_reach_other_contexts() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = sender();
        registry.register("ctx-1".to_string(), tx1);

        registry.send_to_context(&"ctx-2".to_string(), Event::default().event("script").data("x"));

        assert!(rx1.try_recv().is_err());
    }
}
