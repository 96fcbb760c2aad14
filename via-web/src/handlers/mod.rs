//! One module per endpoint class, spec.md §2/§6: page render, SSE connect,
//! action dispatch, session close and the stats probe. `GET /_datastar.js`
//! needs no handler of its own -- it's wired up in `routes.rs` as a
//! `tower_http::services::ServeFile`, the way the teacher serves static
//! assets.

pub mod action;
pub mod page;
pub mod session;
pub mod sse;
pub mod stats;
