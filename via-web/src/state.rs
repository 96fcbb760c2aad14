//! Shared state threaded through every axum handler via
//! [`axum::extract::State`], the same shape as the teacher's own
//! `AppState` (database pool, session store, config) narrowed to what this
//! runtime actually needs: the reactive core, the page router, the SSE
//! connection manager and the timing knobs spec.md §6.1 exposes as config.

use std::sync::Arc;
use std::time::Duration;

use via_core::{Application, Router};
use via_sse::Manager;

use crate::memory::MemoryTracker;

#[derive(Clone)]
pub struct WebConfig {
    pub session_cookie_name: String,
    pub session_cookie_max_age_days: i64,
    pub cleanup_grace: Duration,
    pub sse_poll_interval: Duration,
    pub sse_keepalive_interval: Duration,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "via_session_id".to_string(),
            session_cookie_max_age_days: 30,
            cleanup_grace: Duration::from_secs(5),
            sse_poll_interval: Duration::from_millis(100),
            sse_keepalive_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
    pub pages: Arc<Router>,
    pub sse: Arc<Manager>,
    pub config: WebConfig,
    pub memory: Arc<MemoryTracker>,
    pub started_at: std::time::Instant,
}

impl AppState {
    pub fn new(app: Arc<Application>, pages: Arc<Router>, config: WebConfig) -> Self {
        Self {
            app,
            pages,
            sse: Arc::new(Manager::new()),
            config,
            memory: Arc::new(MemoryTracker::new()),
            started_at: std::time::Instant::now(),
        }
    }
}
