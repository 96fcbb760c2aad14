//! CLI entry point: parses [`Config`], starts the logger, and serves
//! `via-web`'s router. No page routes are registered here -- this binary is
//! the generic host; `demos/playground` shows what a real application
//! wires on top of it. Mirrors the teacher's root binary shape (`Config`
//! + `Logger` + `init_server`), minus the domain-specific page routes a
//! real deployment would add via [`via_core::Router::register`].

mod config;
mod logging;

use std::sync::Arc;

use log::info;

use config::Config;
use logging::Logger;
use via_core::{Application, Router};
use via_web::{AppState, WebConfig};

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!("via starting in {} mode", config.runtime_env());

    let app = Arc::new(Application::with_patch_capacity(config.patch_queue_capacity));
    let router = Arc::new(Router::new());

    let web_config = WebConfig {
        session_cookie_name: "via_session_id".to_string(),
        session_cookie_max_age_days: config.session_cookie_max_age_days,
        cleanup_grace: std::time::Duration::from_secs(config.delayed_cleanup_grace_seconds),
        sse_poll_interval: std::time::Duration::from_millis(config.sse_poll_interval_ms),
        sse_keepalive_interval: std::time::Duration::from_secs(config.sse_keepalive_interval_seconds),
    };

    let state = AppState::new(app, router, web_config);

    if std::env::var("VIA_TEST_MODE").as_deref() == Ok("1") {
        info!("VIA_TEST_MODE=1 set, skipping network listener");
        return;
    }

    via_web::serve(state, &config.interface, config.port).await.expect("server failed");
}
