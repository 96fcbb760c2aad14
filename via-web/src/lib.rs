//! The HTTP transport. Assembles the five endpoint classes spec.md §2/§6
//! names -- page render, SSE connect, action dispatch, session close, the
//! stats probe, plus the bundled client script -- into an `axum::Router`,
//! delegating all reactive-core logic to `via-core` and all SSE wire
//! mechanics to `via-sse`. Shaped after the teacher's own `web` crate:
//! state struct, router module, per-endpoint handler modules, and an
//! `init_server`-style entry point (here: [`routes::serve`]).

pub mod error;
pub mod handlers;
pub mod memory;
pub mod routes;
pub mod session;
pub mod shell;
pub mod signals;
pub mod state;

pub use error::WebError;
pub use routes::{build_router, serve};
pub use state::{AppState, WebConfig};
