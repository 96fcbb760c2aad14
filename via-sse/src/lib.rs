//! The SSE delivery substrate: a dual-index connection registry, patch ->
//! wire-event encoding, and the per-context pump loop (spec.md §4.6).
//!
//! Generalized from this lineage's own `sse` crate: a connection used to be
//! indexed by user id and carry a fixed domain `Event` enum; here it is
//! indexed by context id and carries the three patch kinds a [`Context`]
//! ([`via_core::Context`]) already knows how to produce. Patches themselves
//! still flow through the context's own bounded [`via_core::PatchManager`]
//! queue (nothing here duplicates that buffer) -- the pump below only
//! drains it on a timer and forwards what it finds onto the SSE wire.
//!
//! # Modules
//!
//! - `connection`: `ConnectionRegistry`, dual-indexed by connection id and
//!   context id, exactly the shape this lineage's `sse::connection` uses.
//! - `encode`: `Patch` -> `axum::response::sse::Event` mapping.
//! - `manager`: `Manager`, the pump loop and the disconnect/cleanup guard.

pub mod connection;
pub mod encode;
pub mod manager;

pub use connection::{ConnectionId, ConnectionRegistry};
pub use encode::{encode_patch, reload_event};
pub use manager::Manager;
