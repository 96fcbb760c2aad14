//! The framework-agnostic reactive engine: scopes, signals, actions,
//! contexts, the render cache and the router. Nothing in this crate knows
//! about HTTP or SSE wire formats -- that's `via-sse` and `via-web`.

pub mod action;
pub mod application;
pub mod client;
pub mod context;
pub mod error;
pub mod lifecycle;
pub mod patch;
pub mod render;
pub mod router;
pub mod scope;
pub mod signal;
pub mod signal_value;
pub mod stores;

pub use action::{Action, ActionFn};
pub use application::Application;
pub use client::ClientRecord;
pub use context::{Context, ViewSource};
pub use error::{Error, ErrorKind, RequestErrorKind, Result};
pub use patch::{Patch, PatchManager, DEFAULT_QUEUE_CAPACITY};
pub use render::{RenderStatsSnapshot, Renderer};
pub use router::{ParamKind, ParamMap, ParamSpec, ParamValue, PageHandler, Router};
pub use signal::{Signal, sanitise};
pub use signal_value::SignalValue;
pub use stores::ScopedStore;
