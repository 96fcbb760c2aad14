//! The per-connection façade (spec.md §3 "Context", §4.4).
//!
//! `Context` is a cheap `Arc` handle, the same shape as [`crate::signal::Signal`]:
//! cloning it clones the handle, and every clone observes the same TAB
//! signals, actions, patch queue and view. A component context is just
//! another `Context` with `parent` set; its signals and patch queue are
//! delegated to [`Context::host`] (spec.md §3: "its signals and patch queue
//! are hosted by the parent"). TAB actions are *not* hosted -- each component
//! keeps its own, which is what makes the recursive step of
//! `executeAction`'s lookup order (spec.md §4.4) meaningful.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;
use indexmap::IndexMap;
use log::error;
use uuid::Uuid;

use crate::action::{Action, ActionFn};
use crate::application::Application;
use crate::error::{Error, Result};
use crate::lifecycle::ContextLifecycle;
use crate::patch::{Patch, PatchManager};
use crate::scope;
use crate::signal::{sanitise, Signal};
use crate::signal_value::{self, SignalValue};

/// What a view renders from. `Template` defers to the application's Tera
/// environment; `Callable` is invoked directly with `isUpdate` (spec.md §4.4
/// "View").
#[derive(Clone)]
pub enum ViewSource {
    Template { name: String, data: tera::Context },
    Callable(Arc<dyn Fn(&Context, bool) -> Result<String> + Send + Sync>),
}

#[derive(Clone)]
struct ViewSpec {
    source: ViewSource,
    cache_updates: bool,
}

struct ContextInner {
    id: String,
    route: String,
    route_params: HashMap<String, String>,
    session_id: String,
    namespace: Mutex<Option<String>>,
    scopes: Mutex<Vec<String>>,
    app: Arc<Application>,
    tab_signals: DashMap<String, Signal>,
    tab_actions: DashMap<String, Action>,
    children: DashMap<String, Context>,
    parent: Option<Context>,
    component_css_id: Option<String>,
    view: Mutex<Option<ViewSpec>>,
    patches: PatchManager,
    lifecycle: ContextLifecycle,
}

#[derive(Clone)]
pub struct Context(Arc<ContextInner>);

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.0.id)
            .field("route", &self.0.route)
            .field("scopes", &self.get_scopes())
            .finish()
    }
}

impl Context {
    /// Build a fresh top-level page Context. `session_id` is assumed already
    /// resolved (via-web assigns the session cookie before this is called --
    /// spec.md §6 "Sets session cookie ... if absent" happens ahead of
    /// Context construction, so signals scoped to `session` never fail for
    /// lack of one).
    pub fn create(app: Arc<Application>, route: &str, route_params: HashMap<String, String>, session_id: String) -> Self {
        let patch_capacity = app.patch_capacity();
        Self(Arc::new(ContextInner {
            id: Uuid::new_v4().to_string(),
            route: route.to_string(),
            route_params,
            session_id,
            namespace: Mutex::new(None),
            scopes: Mutex::new(vec![scope::TAB.to_string()]),
            app,
            tab_signals: DashMap::new(),
            tab_actions: DashMap::new(),
            children: DashMap::new(),
            parent: None,
            component_css_id: None,
            view: Mutex::new(None),
            patches: PatchManager::new(patch_capacity),
            lifecycle: ContextLifecycle::new(),
        }))
    }

    // -- identity & routing -------------------------------------------------

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn route(&self) -> &str {
        &self.0.route
    }

    pub fn session_id(&self) -> &str {
        &self.0.session_id
    }

    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.0.route_params.get(name).map(String::as_str)
    }

    pub fn namespace(&self) -> Option<String> {
        self.0.namespace.lock().expect("namespace lock poisoned").clone()
    }

    fn set_namespace(&self, namespace: Option<String>) {
        *self.0.namespace.lock().expect("namespace lock poisoned") = namespace;
    }

    pub fn application(&self) -> &Arc<Application> {
        &self.0.app
    }

    /// The context actually hosting TAB signals and the patch queue: `self`
    /// for a page context, the outermost ancestor for a component.
    fn host(&self) -> Context {
        match &self.0.parent {
            Some(parent) => parent.host(),
            None => self.clone(),
        }
    }

    // -- scopes --------------------------------------------------------------

    pub fn get_scopes(&self) -> Vec<String> {
        self.0.scopes.lock().expect("scope list lock poisoned").clone()
    }

    pub fn get_primary_scope(&self) -> String {
        self.get_scopes().into_iter().next().unwrap_or_else(|| scope::TAB.to_string())
    }

    /// Replace the scope list with a single scope, re-registering in
    /// ScopeRegistry so invariant "a Context is in ScopeRegistry under every
    /// scope listed, and only those" (spec.md §3) holds immediately.
    pub fn scope(&self, s: &str) {
        let previous = self.get_scopes();
        *self.0.scopes.lock().expect("scope list lock poisoned") = vec![s.to_string()];
        self.0.app.reregister_context(self, &previous);
    }

    /// Append `s` if not already present, re-registering as above.
    pub fn add_scope(&self, s: &str) {
        let previous = self.get_scopes();
        if previous.iter().any(|existing| existing == s) {
            return;
        }
        {
            let mut scopes = self.0.scopes.lock().expect("scope list lock poisoned");
            scopes.push(s.to_string());
        }
        self.0.app.reregister_context(self, &previous);
    }

    /// Resolve the `scope` argument to a signal/action call -- explicit
    /// `scope_arg` if given, otherwise the primary scope (or `None` for
    /// TAB-local if the primary itself is `tab`) -- then apply the
    /// `session` substitution to *that* result, since an inherited primary
    /// scope of `session` must land in the same per-session bucket an
    /// explicit `scope="session"` argument would (spec.md §4.4: "If the
    /// resolved scope equals `session`, substitute `session:<sessionId>`").
    fn resolve_scope(&self, scope_arg: Option<&str>) -> Result<Option<String>> {
        let resolved = match scope_arg {
            Some(s) => Some(s.to_string()),
            None => {
                let primary = self.get_primary_scope();
                if primary == scope::TAB {
                    None
                } else {
                    Some(primary)
                }
            }
        };
        match resolved {
            Some(s) if s == scope::SESSION => Ok(Some(scope::build(&[scope::SESSION, self.session_id()]))),
            other => Ok(other),
        }
    }

    // -- signals ---------------------------------------------------------------

    /// Signal creation rules, spec.md §4.4. Returns `Result` rather than a
    /// bare `Signal`: the only failure mode (no session id when scope is
    /// `session`) can't currently happen given how `Context::create` is used,
    /// but the fallible signature keeps the door open without a panic.
    pub fn signal(&self, initial: SignalValue, name: Option<&str>, scope_arg: Option<&str>, auto_broadcast: bool) -> Result<Signal> {
        match self.resolve_scope(scope_arg)? {
            None => Ok(self.host().create_tab_signal(initial, name, auto_broadcast)),
            Some(scope) => Ok(self.create_scoped_signal(initial, name, &scope, auto_broadcast)),
        }
    }

    fn create_tab_signal(&self, initial: SignalValue, name: Option<&str>, auto_broadcast: bool) -> Signal {
        let raw_name = name.map(str::to_string).unwrap_or_else(|| format!("signal{}", Uuid::new_v4().simple()));
        let base_name = match self.namespace() {
            Some(ns) => format!("{ns}.{raw_name}"),
            None => raw_name,
        };
        let id = sanitise(&format!("{base_name}_{}", self.id()));
        if let Some(existing) = self.0.tab_signals.get(&id) {
            return existing.clone();
        }
        let signal = Signal::with_name(id.clone(), base_name, initial, None, auto_broadcast, None);
        self.0.tab_signals.insert(id, signal.clone());
        signal
    }

    fn create_scoped_signal(&self, initial: SignalValue, name: Option<&str>, scope: &str, auto_broadcast: bool) -> Signal {
        let name = name.map(str::to_string).unwrap_or_else(|| format!("signal{}", Uuid::new_v4().simple()));
        let id = sanitise(&format!("{scope}:{name}"));
        let app = self.0.app.clone();
        let scope_owned = scope.to_string();
        self.0.app.signals.get_or_insert_with(scope, id.clone(), || {
            let broadcaster = Arc::new(move |s: &str| app.broadcast(s));
            Signal::with_name(id.clone(), name.clone(), initial.clone(), Some(scope_owned.clone()), auto_broadcast, Some(broadcaster))
        })
    }

    // -- actions -----------------------------------------------------------

    /// Action creation rules, spec.md §4.4. Non-TAB scope requires a name;
    /// TAB actions get a fresh random id every call (re-registering a TAB
    /// action under the same name is legal and simply creates another one,
    /// since nothing else addresses it by name).
    pub fn action(&self, callable: ActionFn, name: Option<&str>, scope_arg: Option<&str>) -> Result<Action> {
        match self.resolve_scope(scope_arg)? {
            None => Ok(self.create_tab_action(callable)),
            Some(scope) => {
                let name = name.ok_or_else(Error::action_name_required)?;
                Ok(self.0.app.actions.get_or_insert_with(&scope, name, || Action::new(name, callable)))
            }
        }
    }

    fn create_tab_action(&self, callable: ActionFn) -> Action {
        let id = sanitise(&format!("action_{}", Uuid::new_v4().simple()));
        let action = Action::new(id.clone(), callable);
        self.0.tab_actions.insert(id, action.clone());
        action
    }

    /// Lookup order, spec.md §4.4: this context's TAB actions, then the
    /// ActionStore at each of its scopes, then `route:<route>` if not
    /// already covered, then `global`, then every component's own TAB
    /// actions, recursively.
    pub fn execute_action(&self, id: &str) -> Result<()> {
        let action = self.find_action(id).ok_or_else(|| Error::action_not_found(id))?;
        action.call(self)
    }

    fn find_action(&self, id: &str) -> Option<Action> {
        if let Some(action) = self.0.tab_actions.get(id) {
            return Some(action.clone());
        }
        let scopes = self.get_scopes();
        for s in &scopes {
            if let Some(action) = self.0.app.actions.get(s, id) {
                return Some(action);
            }
        }
        let route_scope = scope::route_scope(self.route());
        if !scopes.contains(&route_scope) {
            if let Some(action) = self.0.app.actions.get(&route_scope, id) {
                return Some(action);
            }
        }
        if let Some(action) = self.0.app.actions.get(scope::GLOBAL, id) {
            return Some(action);
        }
        self.find_action_in_children(id)
    }

    fn find_action_in_children(&self, id: &str) -> Option<Action> {
        for entry in self.0.children.iter() {
            let child = entry.value();
            if let Some(action) = child.0.tab_actions.get(id) {
                return Some(action.clone());
            }
            if let Some(action) = child.find_action_in_children(id) {
                return Some(action);
            }
        }
        None
    }

    // -- view ----------------------------------------------------------------

    pub fn view_callable(&self, cache_updates: bool, f: Arc<dyn Fn(&Context, bool) -> Result<String> + Send + Sync>) {
        *self.0.view.lock().expect("view lock poisoned") = Some(ViewSpec {
            source: ViewSource::Callable(f),
            cache_updates,
        });
    }

    pub fn view_template(&self, name: impl Into<String>, data: tera::Context, cache_updates: bool) {
        *self.0.view.lock().expect("view lock poisoned") = Some(ViewSpec {
            source: ViewSource::Template { name: name.into(), data },
            cache_updates,
        });
    }

    pub fn has_view(&self) -> bool {
        self.0.view.lock().expect("view lock poisoned").is_some()
    }

    pub fn view_cache_updates(&self) -> bool {
        self.0
            .view
            .lock()
            .expect("view lock poisoned")
            .as_ref()
            .map(|v| v.cache_updates)
            .unwrap_or(true)
    }

    pub fn primary_scope(&self) -> String {
        self.get_primary_scope()
    }

    /// Invoked by [`crate::render::Renderer`]; never called directly by
    /// application code.
    pub fn render_view_raw(&self, is_update: bool) -> Result<String> {
        let spec = self.0.view.lock().expect("view lock poisoned").clone();
        match spec {
            None => Ok(String::new()),
            Some(spec) => match spec.source {
                ViewSource::Callable(f) => f(self, is_update),
                ViewSource::Template { name, data } => self.0.app.render_template(&name, &data),
            },
        }
    }

    pub fn render(&self, template: &str, data: &tera::Context) -> Result<String> {
        self.0.app.render_template(template, data)
    }

    pub fn render_string(&self, template: &str, data: &tera::Context) -> Result<String> {
        self.0.app.render_string(template, data)
    }

    // -- components ----------------------------------------------------------

    /// Creates a nested component Context sharing this context's scopes,
    /// TAB signals and patch queue (spec.md §3), but keeping its own TAB
    /// actions. Returns a render function that produces the wrapped
    /// `<div id="c-<cssid>">…</div>` container for inline embedding in the
    /// parent's own view output.
    pub fn component(
        &self,
        namespace: Option<&str>,
        render_fn: Arc<dyn Fn(&Context) -> Result<String> + Send + Sync>,
    ) -> Arc<dyn Fn() -> Result<String> + Send + Sync> {
        let css_id = sanitise(&format!("{}_{}", namespace.unwrap_or("c"), Uuid::new_v4().simple()));
        let child = Context(Arc::new(ContextInner {
            id: format!("{}/{}", self.id(), css_id),
            route: self.0.route.clone(),
            route_params: self.0.route_params.clone(),
            session_id: self.0.session_id.clone(),
            namespace: Mutex::new(namespace.map(str::to_string)),
            scopes: Mutex::new(self.get_scopes()),
            app: self.0.app.clone(),
            tab_signals: DashMap::new(),
            tab_actions: DashMap::new(),
            children: DashMap::new(),
            parent: Some(self.clone()),
            component_css_id: Some(css_id.clone()),
            view: Mutex::new(None),
            patches: PatchManager::new(self.0.app.patch_capacity()),
            lifecycle: ContextLifecycle::new(),
        }));

        self.0.children.insert(css_id.clone(), child.clone());
        self.0.app.register_context(&child);

        let fn_for_view = render_fn.clone();
        let view_child = child.clone();
        child.view_callable(
            true,
            Arc::new(move |_ctx, _is_update| fn_for_view(&view_child)),
        );

        let embed_child = child.clone();
        Arc::new(move || {
            let inner = render_fn(&embed_child)?;
            Ok(format!("<div id=\"c-{css_id}\">{inner}</div>"))
        })
    }

    // -- lifecycle -------------------------------------------------------------

    pub fn on_cleanup(&self, cb: impl FnOnce() + Send + 'static) {
        self.0.lifecycle.on_cleanup(cb);
    }

    pub fn on_disconnect(&self, cb: impl FnOnce() + Send + 'static) {
        self.on_cleanup(cb);
    }

    /// Spawns a periodic task invoking `cb` every `period`, tracked so it's
    /// cancelled with every other timer this context owns on teardown.
    pub fn set_interval<F>(&self, period: Duration, cb: F) -> String
    where
        F: Fn(&Context) + Send + Sync + 'static,
    {
        let ctx = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                cb(&ctx);
            }
        });
        let timer_id = Uuid::new_v4().to_string();
        self.0.lifecycle.track_timer(handle);
        timer_id
    }

    pub fn cancel_timers(&self) {
        self.0.lifecycle.cancel_timers();
    }

    pub fn run_cleanup_callbacks(&self) {
        self.0.lifecycle.run_cleanup_callbacks();
    }

    pub fn schedule_delayed_cleanup<F>(&self, grace: Duration, on_fire: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.0.lifecycle.schedule_delayed_cleanup(grace, on_fire);
    }

    pub fn cancel_delayed_cleanup(&self) -> bool {
        self.0.lifecycle.cancel_delayed_cleanup()
    }

    // -- patches / sync --------------------------------------------------------

    fn patch_manager(&self) -> &PatchManager {
        &self.host().0.patches
    }

    pub fn drain_patches(&self) -> Vec<Patch> {
        self.host().0.patches.drain()
    }

    pub fn recreate_patch_queue(&self) {
        self.host().0.patches.recreate();
    }

    pub fn exec_script(&self, js: impl Into<String>) {
        self.patch_manager().push(Patch::Script { js: js.into() });
    }

    pub fn broadcast(&self) {
        self.0.app.broadcast(&self.get_primary_scope());
    }

    /// `sync()`, spec.md §4.7: render (if a view exists) then enqueue
    /// signals, in that order.
    pub fn sync(&self) -> Result<()> {
        if self.has_view() {
            let html = self.0.app.renderer().render(self, true)?;
            if !html.trim().is_empty() {
                let selector = self.0.component_css_id.as_ref().map(|id| format!("#c-{id}"));
                self.patch_manager().push(Patch::Elements {
                    html,
                    selector,
                    mode: None,
                });
            }
        }
        self.sync_signals();
        Ok(())
    }

    /// Same as [`Context::sync`] but logs and swallows render errors instead
    /// of propagating them -- the behaviour broadcast fan-out and the SSE
    /// pump require (spec.md §7 "Render errors ... are swallowed with log
    /// for SSE-pump renders").
    pub fn sync_safe(&self) {
        if let Err(err) = self.sync() {
            error!("context {}: sync failed: {err}", self.id());
        }
    }

    /// `syncSignals()`: TAB-local changed signals plus every signal in every
    /// non-TAB scope this context carries, flattened/nested per spec.md §4.6.
    pub fn sync_signals(&self) {
        let flat = self.collect_signals_flat();
        let value = signal_value::nest(&flat);
        self.patch_manager().push(Patch::Signals { value });
    }

    /// Apply a flattened snapshot of signals the client just sent (an
    /// action request body, or the query string on SSE connect) onto any
    /// TAB signal this context already owns with a matching name. Silent
    /// and non-broadcasting: this is resynchronising server state with what
    /// the client already displayed, not a developer-initiated mutation, so
    /// it must not set `changed` or fire `autoBroadcast` (spec.md §4.9
    /// "ActionHandler ... signal injection").
    pub fn apply_inbound_signals(&self, flat: &IndexMap<String, SignalValue>) {
        let host = self.host();
        for entry in host.0.tab_signals.iter() {
            let signal = entry.value();
            if let Some(value) = flat.get(signal.name()) {
                signal.set_with(value.clone(), false, false);
            }
        }
    }

    fn collect_signals_flat(&self) -> IndexMap<String, SignalValue> {
        let mut flat = IndexMap::new();
        let host = self.host();
        for entry in host.0.tab_signals.iter() {
            let signal = entry.value();
            if signal.changed() {
                flat.insert(signal.name().to_string(), signal.get());
                signal.mark_synced();
            }
        }
        for s in self.get_scopes() {
            if s == scope::TAB {
                continue;
            }
            for (_, signal) in self.0.app.signals.all(&s) {
                flat.insert(signal.name().to_string(), signal.get());
            }
        }
        flat
    }
}
