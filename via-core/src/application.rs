//! The application object: global state, client registry, the Tera
//! environment, and the broadcast orchestrator (spec.md §4.9).

use std::sync::RwLock;

use dashmap::DashMap;
use tera::Tera;

use crate::client::ClientRecord;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::patch::DEFAULT_QUEUE_CAPACITY;
use crate::render::{RenderStatsSnapshot, Renderer};
use crate::scope;
use crate::signal_value::SignalValue;
use crate::stores::ScopedStore;

pub struct Application {
    pub(crate) contexts: ScopedStore<Context>,
    pub(crate) signals: ScopedStore<crate::signal::Signal>,
    pub(crate) actions: ScopedStore<crate::action::Action>,
    all_contexts: DashMap<String, Context>,
    renderer: Renderer,
    global_state: DashMap<String, SignalValue>,
    clients: DashMap<String, ClientRecord>,
    templates: RwLock<Tera>,
    patch_capacity: usize,
    head_fragments: RwLock<Vec<String>>,
    foot_fragments: RwLock<Vec<String>>,
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Application {
    pub fn new() -> Self {
        Self::with_patch_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_patch_capacity(patch_capacity: usize) -> Self {
        Self {
            contexts: ScopedStore::new(),
            signals: ScopedStore::new(),
            actions: ScopedStore::new(),
            all_contexts: DashMap::new(),
            renderer: Renderer::new(),
            global_state: DashMap::new(),
            clients: DashMap::new(),
            templates: RwLock::new(Tera::default()),
            patch_capacity,
            head_fragments: RwLock::new(Vec::new()),
            foot_fragments: RwLock::new(Vec::new()),
        }
    }

    // -- shell fragments -------------------------------------------------

    /// Developer-defined HTML concatenated into the shell's `<head>`
    /// placeholder, in registration order (spec.md §6 "Shell template").
    pub fn add_head_fragment(&self, html: impl Into<String>) {
        self.head_fragments.write().expect("head fragment lock poisoned").push(html.into());
    }

    pub fn add_foot_fragment(&self, html: impl Into<String>) {
        self.foot_fragments.write().expect("foot fragment lock poisoned").push(html.into());
    }

    pub fn head_fragments(&self) -> String {
        self.head_fragments.read().expect("head fragment lock poisoned").concat()
    }

    pub fn foot_fragments(&self) -> String {
        self.foot_fragments.read().expect("foot fragment lock poisoned").concat()
    }

    pub fn patch_capacity(&self) -> usize {
        self.patch_capacity
    }

    // -- context registry ----------------------------------------------------

    /// Register a freshly created context under every scope in its scope
    /// list, and into the by-id index used for "every context in
    /// existence" broadcasts (spec.md §3 invariant, §4.9).
    pub fn register_context(&self, ctx: &Context) {
        for s in ctx.get_scopes() {
            self.contexts.register(&s, ctx.id().to_string(), ctx.clone());
        }
        self.all_contexts.insert(ctx.id().to_string(), ctx.clone());
    }

    /// Remove `ctx` from every scope in `previous_scopes`, dropping the
    /// SignalStore/ActionStore entries for any scope that becomes empty
    /// (the "scope garbage collection" rule, spec.md §4.3), then
    /// re-register under its current scope list.
    pub fn reregister_context(&self, ctx: &Context, previous_scopes: &[String]) {
        for s in previous_scopes {
            if self.contexts.unregister(s, ctx.id()) {
                self.signals.drop_scope(s);
                self.actions.drop_scope(s);
            }
        }
        for s in ctx.get_scopes() {
            self.contexts.register(&s, ctx.id().to_string(), ctx.clone());
        }
    }

    /// Unregister `ctx` from every one of its current scopes, garbage
    /// collecting any that become empty.
    pub fn unregister_context(&self, ctx: &Context) {
        for s in ctx.get_scopes() {
            if self.contexts.unregister(&s, ctx.id()) {
                self.signals.drop_scope(&s);
                self.actions.drop_scope(&s);
            }
        }
    }

    /// Full teardown: unregister from scopes, drop from the by-id index,
    /// and remove any client record (spec.md §4.8).
    pub fn destroy_context(&self, ctx: &Context) {
        self.unregister_context(ctx);
        self.all_contexts.remove(ctx.id());
        self.clients.remove(ctx.id());
    }

    pub fn find_context(&self, id: &str) -> Option<Context> {
        self.all_contexts.get(id).map(|e| e.clone())
    }

    pub fn context_count(&self) -> usize {
        self.all_contexts.len()
    }

    // -- client registry (observability only) ---------------------------------

    pub fn register_client(&self, record: ClientRecord) {
        self.clients.insert(record.connection_id.clone(), record);
    }

    pub fn remove_client(&self, connection_id: &str) {
        self.clients.remove(connection_id);
    }

    pub fn clients(&self) -> Vec<ClientRecord> {
        self.clients.iter().map(|e| e.value().clone()).collect()
    }

    // -- global state ----------------------------------------------------------

    pub fn get_global(&self, key: &str) -> Option<SignalValue> {
        self.global_state.get(key).map(|v| v.clone())
    }

    pub fn set_global(&self, key: impl Into<String>, value: SignalValue) {
        self.global_state.insert(key.into(), value);
    }

    // -- templates ---------------------------------------------------------

    /// Swap in a fully-built `Tera` environment (the developer's template
    /// directory), e.g. at startup.
    pub fn set_templates(&self, tera: Tera) {
        *self.templates.write().expect("template environment lock poisoned") = tera;
    }

    pub fn render_template(&self, name: &str, data: &tera::Context) -> Result<String> {
        let templates = self.templates.read().expect("template environment lock poisoned");
        templates.render(name, data).map_err(|e| Error::render(e.to_string()))
    }

    pub fn render_string(&self, template: &str, data: &tera::Context) -> Result<String> {
        Tera::one_off(template, data, true).map_err(|e| Error::render(e.to_string()))
    }

    // -- rendering -----------------------------------------------------------

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn stats(&self) -> RenderStatsSnapshot {
        self.renderer.stats()
    }

    // -- broadcast -------------------------------------------------------------

    /// The five-branch decision table, spec.md §4.9. Bare `route` and
    /// `global` both resolve the "every context in the process" reading of
    /// the spec's open question 1.
    pub fn broadcast(&self, scope: &str) {
        if scope == scope::GLOBAL {
            self.renderer.invalidate(scope::GLOBAL);
            self.sync_all_contexts();
        } else if scope == scope::ROUTE {
            self.renderer.invalidate_route_based();
            self.sync_all_contexts();
        } else if let Some(route) = scope.strip_prefix("route:") {
            self.renderer.invalidate(scope);
            self.sync_contexts_with_route(route);
        } else if scope.contains('*') {
            self.renderer.invalidate_pattern(scope);
            for (_, _, ctx) in self.contexts.by_pattern(scope) {
                ctx.sync_safe();
            }
        } else {
            self.renderer.invalidate(scope);
            for (_, ctx) in self.contexts.all(scope) {
                ctx.sync_safe();
            }
        }
    }

    fn sync_all_contexts(&self) {
        for entry in self.all_contexts.iter() {
            entry.value().sync_safe();
        }
    }

    fn sync_contexts_with_route(&self, route: &str) {
        for entry in self.all_contexts.iter() {
            if entry.value().route() == route {
                entry.value().sync_safe();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[test]
    fn global_broadcast_syncs_every_context_regardless_of_scope() {
        let app = Arc::new(Application::new());
        let ctx_a = Context::create(app.clone(), "/home", HashMap::new(), "s1".to_string());
        ctx_a.scope("global");
        app.register_context(&ctx_a);
        let ctx_b = Context::create(app.clone(), "/dash", HashMap::new(), "s2".to_string());
        ctx_b.scope("global");
        app.register_context(&ctx_b);

        let sig_a = ctx_a.signal(json!(0), Some("notifications"), None, true).unwrap();
        sig_a.mark_synced();

        app.broadcast("global");

        let patches = ctx_b.drain_patches();
        assert!(!patches.is_empty());
    }

    #[test]
    fn route_scoped_broadcast_only_syncs_matching_route() {
        let app = Arc::new(Application::new());
        let ctx_home = Context::create(app.clone(), "/home", HashMap::new(), "s1".to_string());
        ctx_home.scope("route:/home");
        app.register_context(&ctx_home);
        let ctx_dash = Context::create(app.clone(), "/dash", HashMap::new(), "s2".to_string());
        ctx_dash.scope("route:/dash");
        app.register_context(&ctx_dash);

        ctx_home.view_callable(true, Arc::new(|_c, _u| Ok("home".to_string())));
        ctx_dash.view_callable(true, Arc::new(|_c, _u| Ok("dash".to_string())));

        app.broadcast("route:/home");

        assert!(!ctx_home.drain_patches().is_empty());
        assert!(ctx_dash.drain_patches().is_empty());
    }

    #[test]
    fn wildcard_broadcast_reaches_matching_scopes_only() {
        let app = Arc::new(Application::new());
        let ctx_lobby = Context::create(app.clone(), "/r", HashMap::new(), "s1".to_string());
        ctx_lobby.scope("room:lobby");
        app.register_context(&ctx_lobby);
        let ctx_other = Context::create(app.clone(), "/x", HashMap::new(), "s2".to_string());
        ctx_other.scope("stock:AAPL");
        app.register_context(&ctx_other);

        ctx_lobby.view_callable(true, Arc::new(|_c, _u| Ok("lobby".to_string())));
        ctx_other.view_callable(true, Arc::new(|_c, _u| Ok("stock".to_string())));

        app.broadcast("room:*");

        assert!(!ctx_lobby.drain_patches().is_empty());
        assert!(ctx_other.drain_patches().is_empty());
    }

    #[test]
    fn head_and_foot_fragments_concatenate_in_registration_order() {
        let app = Application::new();
        app.add_head_fragment("<link rel=\"icon\">");
        app.add_head_fragment("<meta charset=\"utf-8\">");
        app.add_foot_fragment("<script src=\"/extra.js\"></script>");
        assert_eq!(app.head_fragments(), "<link rel=\"icon\"><meta charset=\"utf-8\">");
        assert_eq!(app.foot_fragments(), "<script src=\"/extra.js\"></script>");
    }

    #[test]
    fn global_state_round_trips() {
        let app = Application::new();
        assert_eq!(app.get_global("missing"), None);
        app.set_global("notifications", json!(3));
        assert_eq!(app.get_global("notifications"), Some(json!(3)));
    }

    #[test]
    fn reregister_context_garbage_collects_emptied_scopes() {
        let app = Arc::new(Application::new());
        let ctx = Context::create(app.clone(), "/r", HashMap::new(), "s1".to_string());
        ctx.scope("room:lobby");
        app.register_context(&ctx);
        let _signal = ctx.signal(json!(1), Some("x"), None, true).unwrap();
        assert!(app.signals.contains_scope("room:lobby"));

        ctx.scope("room:vip");
        assert!(!app.contexts.contains_scope("room:lobby"));
        assert!(!app.signals.contains_scope("room:lobby"));
    }
}
