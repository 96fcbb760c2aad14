//! Per-context cleanup callbacks, timers, and the delayed-cleanup grace
//! window (spec.md §4.8).

use std::panic::{self, AssertUnwindSafe};
use std::sync::Mutex;
use std::time::Duration;

use log::error;
use tokio::task::JoinHandle;

type CleanupFn = Box<dyn FnOnce() + Send>;

#[derive(Default)]
pub struct ContextLifecycle {
    cleanup_callbacks: Mutex<Vec<CleanupFn>>,
    timers: Mutex<Vec<JoinHandle<()>>>,
    delayed_cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl ContextLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_cleanup(&self, cb: impl FnOnce() + Send + 'static) {
        self.cleanup_callbacks
            .lock()
            .expect("cleanup callback list lock poisoned")
            .push(Box::new(cb));
    }

    pub fn track_timer(&self, handle: JoinHandle<()>) {
        self.timers.lock().expect("timer list lock poisoned").push(handle);
    }

    /// Cancel every timer owned by this context. Done first during teardown
    /// (spec.md §4.8: "all timers owned by the context are cancelled
    /// first").
    pub fn cancel_timers(&self) {
        let handles: Vec<JoinHandle<()>> = self.timers.lock().expect("timer list lock poisoned").drain(..).collect();
        for handle in handles {
            handle.abort();
        }
    }

    /// Run every registered cleanup callback, each isolated behind
    /// `catch_unwind` so one failure doesn't prevent the others from
    /// running (spec.md §4.8, §7).
    pub fn run_cleanup_callbacks(&self) {
        let callbacks: Vec<CleanupFn> = self
            .cleanup_callbacks
            .lock()
            .expect("cleanup callback list lock poisoned")
            .drain(..)
            .collect();
        for cb in callbacks {
            if panic::catch_unwind(AssertUnwindSafe(cb)).is_err() {
                error!("context cleanup callback panicked; continuing with remaining callbacks");
            }
        }
    }

    /// Schedule a one-shot delayed-cleanup task. If a delayed cleanup is
    /// already pending, it's replaced (the caller is responsible for only
    /// calling this once per disconnect).
    pub fn schedule_delayed_cleanup<F>(&self, grace: Duration, on_fire: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            on_fire.await;
        });
        *self.delayed_cleanup.lock().expect("delayed cleanup lock poisoned") = Some(handle);
    }

    /// Cancel a pending delayed cleanup, e.g. because SSE reconnected
    /// within the grace window. Returns `true` iff one was pending.
    pub fn cancel_delayed_cleanup(&self) -> bool {
        match self.delayed_cleanup.lock().expect("delayed cleanup lock poisoned").take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn cleanup_callbacks_run_even_if_one_panics() {
        let lifecycle = ContextLifecycle::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        lifecycle.on_cleanup(|| panic!("boom"));
        lifecycle.on_cleanup(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });
        lifecycle.run_cleanup_callbacks();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancel_delayed_cleanup_prevents_it_from_firing() {
        let lifecycle = ContextLifecycle::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        lifecycle.schedule_delayed_cleanup(Duration::from_millis(20), async move {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(lifecycle.cancel_delayed_cleanup());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delayed_cleanup_fires_after_grace_if_not_cancelled() {
        let lifecycle = ContextLifecycle::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        lifecycle.schedule_delayed_cleanup(Duration::from_millis(10), async move {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
