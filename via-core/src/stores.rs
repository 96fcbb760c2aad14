//! The three parallel scope-keyed maps from spec.md §3/§4.3: ScopeRegistry
//! (scope -> contexts), SignalStore (scope -> signals), ActionStore
//! (scope -> actions). All three share the same shape, so it's a single
//! generic `ScopedStore<T>` here; `Application` owns one instance of each and
//! is the only place that wires the "scope garbage collection" rule between
//! them (spec.md §4.3).

use dashmap::DashMap;

use crate::scope;

/// `scope -> id -> T`, a dual-level map. `T` is expected to be a cheap
/// `Clone` (an `Arc` handle), matching `Context`, `Signal` and `Action`.
pub struct ScopedStore<T: Clone> {
    scopes: DashMap<String, DashMap<String, T>>,
}

impl<T: Clone> Default for ScopedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ScopedStore<T> {
    pub fn new() -> Self {
        Self {
            scopes: DashMap::new(),
        }
    }

    pub fn register(&self, scope: &str, id: impl Into<String>, value: T) {
        self.scopes
            .entry(scope.to_string())
            .or_default()
            .insert(id.into(), value);
    }

    pub fn get(&self, scope: &str, id: &str) -> Option<T> {
        self.scopes.get(scope).and_then(|m| m.get(id).map(|v| v.clone()))
    }

    /// Remove `id` from `scope`. Returns `true` iff the scope's entry map
    /// became empty as a result (the caller uses this to trigger GC of the
    /// sibling stores, per spec.md §4.3).
    pub fn unregister(&self, scope: &str, id: &str) -> bool {
        let Some(entries) = self.scopes.get(scope) else {
            return false;
        };
        entries.remove(id);
        let became_empty = entries.is_empty();
        drop(entries);
        if became_empty {
            self.scopes.remove(scope);
        }
        became_empty
    }

    /// Atomic get-or-create within one scope's entry map, used for the
    /// shared-signal / stable-action-id identity rules (spec.md §4.4): two
    /// racing callers for the same `(scope, id)` must end up sharing one `T`.
    pub fn get_or_insert_with(&self, scope: &str, id: impl Into<String>, make: impl FnOnce() -> T) -> T {
        let entries = self.scopes.entry(scope.to_string()).or_default();
        entries.entry(id.into()).or_insert_with(make).clone()
    }

    pub fn contains_scope(&self, scope: &str) -> bool {
        self.scopes.contains_key(scope)
    }

    /// Drop every entry under `scope`, used as the GC side effect when the
    /// registering store (ScopeRegistry) finds a scope has gone empty.
    pub fn drop_scope(&self, scope: &str) {
        self.scopes.remove(scope);
    }

    pub fn all(&self, scope: &str) -> Vec<(String, T)> {
        match self.scopes.get(scope) {
            Some(entries) => entries.iter().map(|e| (e.key().clone(), e.value().clone())).collect(),
            None => Vec::new(),
        }
    }

    /// Every `(scope, id, value)` across every scope matching `pattern`
    /// (exact match if `pattern` has no `*`, else a glob per [`scope::matches`]).
    pub fn by_pattern(&self, pattern: &str) -> Vec<(String, String, T)> {
        if !pattern.contains('*') {
            return self
                .all(pattern)
                .into_iter()
                .map(|(id, v)| (pattern.to_string(), id, v))
                .collect();
        }
        let mut out = Vec::new();
        for entry in self.scopes.iter() {
            let scope = entry.key();
            if scope::matches(scope, pattern) {
                for (id, value) in entry.value().iter().map(|e| (e.key().clone(), e.value().clone())) {
                    out.push((scope.clone(), id, value));
                }
            }
        }
        out
    }

    pub fn all_values(&self) -> Vec<T> {
        self.scopes
            .iter()
            .flat_map(|entry| entry.value().iter().map(|e| e.value().clone()).collect::<Vec<_>>())
            .collect()
    }

    pub fn scopes(&self) -> Vec<String> {
        self.scopes.iter().map(|e| e.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_get_round_trips() {
        let store: ScopedStore<i32> = ScopedStore::new();
        store.register("global", "x", 1);
        assert_eq!(store.get("global", "x"), Some(1));
        assert_eq!(store.get("global", "y"), None);
    }

    #[test]
    fn unregister_reports_scope_emptiness() {
        let store: ScopedStore<i32> = ScopedStore::new();
        store.register("room:lobby", "a", 1);
        store.register("room:lobby", "b", 2);

        assert!(!store.unregister("room:lobby", "a"));
        assert!(store.contains_scope("room:lobby"));

        assert!(store.unregister("room:lobby", "b"));
        assert!(!store.contains_scope("room:lobby"));
    }

    #[test]
    fn by_pattern_matches_wildcard_scopes() {
        let store: ScopedStore<i32> = ScopedStore::new();
        store.register("room:lobby", "a", 1);
        store.register("room:vip", "b", 2);
        store.register("stock:AAPL", "c", 3);

        let mut matched = store.by_pattern("room:*");
        matched.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[0].1, "a");
        assert_eq!(matched[1].1, "b");
    }

    #[test]
    fn get_or_insert_with_only_builds_once() {
        let store: ScopedStore<i32> = ScopedStore::new();
        let first = store.get_or_insert_with("global", "counter", || 1);
        let second = store.get_or_insert_with("global", "counter", || 99);
        assert_eq!(first, 1);
        assert_eq!(second, 1);
    }

    #[test]
    fn by_pattern_exact_when_no_wildcard() {
        let store: ScopedStore<i32> = ScopedStore::new();
        store.register("global", "x", 1);
        let matched = store.by_pattern("global");
        assert_eq!(matched, vec![("global".to_string(), "x".to_string(), 1)]);
    }
}
