//! Scenario builders for `via-core` tests: a throwaway [`Application`] with
//! N fake contexts registered under a scope, used to assert broadcast
//! fan-out without standing up `via-web`/`via-sse`. Grounded on the
//! teacher's standalone `testing-tools` crate's purpose -- a dedicated
//! crate of reusable test scenarios, separate from the code under test --
//! narrowed from its live-HTTP-client scenario functions to in-process
//! `Application` state, since `via-core`'s own unit tests need no server.

use std::collections::HashMap;
use std::sync::Arc;

use via_core::{Application, Context};

/// A fresh `Application` plus the contexts registered against it, in
/// registration order.
pub struct Scenario {
    pub app: Arc<Application>,
    pub contexts: Vec<Context>,
}

impl Scenario {
    pub fn new() -> Self {
        Self {
            app: Arc::new(Application::new()),
            contexts: Vec::new(),
        }
    }

    /// Register `count` fresh page contexts, each under its own session id
    /// and `scope`.
    pub fn with_contexts_in_scope(scope: &str, count: usize) -> Self {
        let app = Arc::new(Application::new());
        let contexts = (0..count)
            .map(|i| {
                let ctx = Context::create(app.clone(), "/scenario", HashMap::new(), format!("session-{i}"));
                ctx.scope(scope);
                app.register_context(&ctx);
                ctx
            })
            .collect();
        Self { app, contexts }
    }

    /// Drains every context's patch queue and counts how many had at least
    /// one patch waiting. Consumes the queues as a side effect -- call once
    /// per assertion.
    pub fn contexts_with_pending_patches(&self) -> usize {
        self.contexts.iter().filter(|ctx| !ctx.drain_patches().is_empty()).count()
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}
