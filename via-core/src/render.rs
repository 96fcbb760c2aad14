//! Scope-keyed render cache, the advisory render-lock, and render-duration
//! stats (spec.md §4.5).
//!
//! The decision table from spec.md §4.5:
//!
//! | primary scope | is_update | use cache? | write cache? |
//! |---|---|---|---|
//! | `tab`     | any   | no            | no  |
//! | non-`tab` | false | no            | no  |
//! | non-`tab` | true  | iff `cache_updates` | iff `cache_updates` |

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::context::Context;
use crate::error::Result;
use crate::scope;

#[derive(Debug, Clone, Copy)]
pub struct RenderStatsSnapshot {
    pub render_count: u64,
    pub total_time_ms: f64,
    pub avg_time_ms: f64,
    pub min_time_ms: f64,
    pub max_time_ms: f64,
}

#[derive(Default)]
struct RenderStats {
    count: AtomicU64,
    total_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl RenderStats {
    fn record(&self, elapsed: Duration) {
        let nanos = elapsed.as_nanos() as u64;
        self.count.fetch_add(1, Ordering::SeqCst);
        self.total_nanos.fetch_add(nanos, Ordering::SeqCst);
        self.min_nanos.fetch_min(nanos, Ordering::SeqCst);
        self.max_nanos.fetch_max(nanos, Ordering::SeqCst);
    }

    fn snapshot(&self) -> RenderStatsSnapshot {
        let count = self.count.load(Ordering::SeqCst);
        let total_nanos = self.total_nanos.load(Ordering::SeqCst);
        let min_nanos = self.min_nanos.load(Ordering::SeqCst);
        let max_nanos = self.max_nanos.load(Ordering::SeqCst);
        let to_ms = |n: u64| n as f64 / 1_000_000.0;
        RenderStatsSnapshot {
            render_count: count,
            total_time_ms: to_ms(total_nanos),
            avg_time_ms: if count > 0 { to_ms(total_nanos) / count as f64 } else { 0.0 },
            min_time_ms: if count > 0 { to_ms(min_nanos) } else { 0.0 },
            max_time_ms: to_ms(max_nanos),
        }
    }
}

/// Per-scope in-flight marker. Not a hard mutex: a racer that observes
/// `true` waits briefly and re-checks the cache, then proceeds regardless
/// (spec.md §4.5).
#[derive(Default)]
struct RenderLock {
    rendering: DashMap<String, Arc<AtomicBool>>,
}

impl RenderLock {
    fn flag_for(&self, scope: &str) -> Arc<AtomicBool> {
        self.rendering.entry(scope.to_string()).or_insert_with(|| Arc::new(AtomicBool::new(false))).clone()
    }
}

pub struct Renderer {
    cache: DashMap<String, String>,
    lock: RenderLock,
    stats: RenderStats,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
            lock: RenderLock::default(),
            stats: RenderStats::default(),
        }
    }

    /// Render `ctx`'s view per the decision table above, timing the call
    /// and feeding [`RenderStats`] regardless of whether the result came
    /// from cache.
    pub fn render(&self, ctx: &Context, is_update: bool) -> Result<String> {
        if !ctx.has_view() {
            return Ok(String::new());
        }

        let primary = ctx.primary_scope();
        let cache_updates = ctx.view_cache_updates();
        let use_cache = primary != scope::TAB && is_update && cache_updates;
        let write_cache = use_cache;

        if use_cache {
            if let Some(cached) = self.cache.get(&primary) {
                return Ok(cached.clone());
            }
            return self.render_locked(ctx, &primary, is_update, write_cache);
        }

        self.timed_render(ctx, is_update)
    }

    fn render_locked(&self, ctx: &Context, scope_key: &str, is_update: bool, write_cache: bool) -> Result<String> {
        let flag = self.lock.flag_for(scope_key);
        if flag.swap(true, Ordering::SeqCst) {
            // Someone else is already rendering this scope; give them a
            // moment, then just check the cache once before proceeding
            // anyway (advisory, not a hard mutex).
            std::thread::sleep(Duration::from_millis(1));
            if let Some(cached) = self.cache.get(scope_key) {
                flag.store(false, Ordering::SeqCst);
                return Ok(cached.clone());
            }
        }

        let result = self.timed_render(ctx, is_update);
        if let Ok(html) = &result {
            if write_cache {
                self.cache.insert(scope_key.to_string(), html.clone());
            }
        }
        flag.store(false, Ordering::SeqCst);
        result
    }

    fn timed_render(&self, ctx: &Context, is_update: bool) -> Result<String> {
        let start = Instant::now();
        let result = ctx.render_view_raw(is_update);
        self.stats.record(start.elapsed());
        result
    }

    /// Invalidate exactly one scope's cached HTML.
    pub fn invalidate(&self, scope: &str) {
        self.cache.remove(scope);
    }

    /// Invalidate every cached entry keyed by a route-based scope (used for
    /// a bare `route` broadcast, spec.md §4.9 step 2).
    pub fn invalidate_route_based(&self) {
        let keys: Vec<String> = self
            .cache
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| scope::is_route_based(k, None))
            .collect();
        for key in keys {
            self.cache.remove(&key);
        }
    }

    /// Invalidate every cached entry whose scope matches a wildcard pattern.
    pub fn invalidate_pattern(&self, pattern: &str) {
        let keys: Vec<String> = self
            .cache
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| scope::matches(k, pattern))
            .collect();
        for key in keys {
            self.cache.remove(&key);
        }
    }

    pub fn cache_contains(&self, scope: &str) -> bool {
        self.cache.contains_key(scope)
    }

    pub fn stats(&self) -> RenderStatsSnapshot {
        self.stats.snapshot()
    }
}
