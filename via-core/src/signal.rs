//! A single reactive named value (spec.md §3 "Signal", §4.4 signal creation
//! rules).
//!
//! Two contexts sharing a non-TAB scope and a signal name must see the same
//! `Signal` -- the pointer-identity requirement in spec.md §3. That's modeled
//! here by making `Signal` a cheap `Arc` handle around a `Mutex`-guarded
//! inner value: cloning a `Signal` clones the handle, not the state, the same
//! way the design notes in spec.md §9 describe signals as handles indexing
//! into state a closure captures by reference.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::signal_value::SignalValue;

/// Called when a scoped, auto-broadcasting signal's value actually changes.
/// Takes the signal's scope string.
pub type BroadcastFn = Arc<dyn Fn(&str) + Send + Sync>;

struct Inner {
    id: String,
    /// The developer-facing key this signal appears under in a `signals`
    /// patch -- distinct from `id`, which is only a store lookup key and may
    /// carry scope/context-id plumbing a client should never see.
    name: String,
    scope: Option<String>,
    auto_broadcast: AtomicBool,
    value: Mutex<SignalValue>,
    changed: AtomicBool,
    broadcaster: Option<BroadcastFn>,
}

#[derive(Clone)]
pub struct Signal {
    inner: Arc<Inner>,
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("scope", &self.inner.scope)
            .field("changed", &self.changed())
            .finish()
    }
}

impl Signal {
    /// `changed` starts `true` -- a freshly created signal is always due for
    /// its first sync (spec.md §3 invariant i).
    pub fn new(
        id: impl Into<String>,
        initial: SignalValue,
        scope: Option<String>,
        auto_broadcast: bool,
        broadcaster: Option<BroadcastFn>,
    ) -> Self {
        let id = id.into();
        let name = id.clone();
        Self {
            inner: Arc::new(Inner {
                id,
                name,
                scope,
                auto_broadcast: AtomicBool::new(auto_broadcast),
                value: Mutex::new(initial),
                changed: AtomicBool::new(true),
                broadcaster,
            }),
        }
    }

    /// Like [`Signal::new`] but with a wire-facing `name` distinct from the
    /// store lookup `id` (spec.md §4.4 signal creation rules).
    pub fn with_name(
        id: impl Into<String>,
        name: impl Into<String>,
        initial: SignalValue,
        scope: Option<String>,
        auto_broadcast: bool,
        broadcaster: Option<BroadcastFn>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: id.into(),
                name: name.into(),
                scope,
                auto_broadcast: AtomicBool::new(auto_broadcast),
                value: Mutex::new(initial),
                changed: AtomicBool::new(true),
                broadcaster,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The dotted, developer-facing key used when this signal is encoded
    /// into a `signals` patch (spec.md §4.6).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn scope(&self) -> Option<&str> {
        self.inner.scope.as_deref()
    }

    pub fn get(&self) -> SignalValue {
        self.inner.value.lock().expect("signal value lock poisoned").clone()
    }

    pub fn changed(&self) -> bool {
        self.inner.changed.load(Ordering::SeqCst)
    }

    pub fn mark_synced(&self) {
        self.inner.changed.store(false, Ordering::SeqCst);
    }

    /// Convenience: mark changed and broadcast, matching the common case in
    /// spec.md §3 ("changing value via the setter").
    pub fn set(&self, value: SignalValue) {
        self.set_with(value, true, true);
    }

    /// Full setter: `mark_changed` controls invariant (i), `broadcast`
    /// controls whether invariant (ii) is even considered for this call.
    pub fn set_with(&self, value: SignalValue, mark_changed: bool, broadcast: bool) {
        let differs = {
            let mut guard = self.inner.value.lock().expect("signal value lock poisoned");
            let differs = *guard != value;
            *guard = value;
            differs
        };

        if mark_changed {
            self.inner.changed.store(true, Ordering::SeqCst);
        }

        if broadcast && differs && self.inner.auto_broadcast.load(Ordering::SeqCst) {
            if let (Some(scope), Some(broadcaster)) = (&self.inner.scope, &self.inner.broadcaster) {
                broadcaster(scope);
            }
        }
    }

    pub fn auto_broadcast(&self) -> bool {
        self.inner.auto_broadcast.load(Ordering::SeqCst)
    }

    pub fn set_auto_broadcast(&self, value: bool) {
        self.inner.auto_broadcast.store(value, Ordering::SeqCst);
    }

    /// Pointer identity check, used by tests asserting the shared-signal
    /// identity invariant (spec.md §8 property 2).
    pub fn is_same_as(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Sanitise an arbitrary name into `[A-Za-z0-9_]+`, replacing every other
/// character with `_` (spec.md §4.4).
pub fn sanitise(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
