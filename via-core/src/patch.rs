//! The three patch kinds and the bounded, drop-oldest delivery queue that
//! feeds the SSE pump (spec.md §4.6 "Patch encoding", §4.7 "PatchManager",
//! §8 property 7).

use std::collections::VecDeque;
use std::sync::Mutex;

use log::warn;

use crate::signal_value::SignalValue;

pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

#[derive(Debug, Clone)]
pub enum Patch {
    /// An HTML fragment, optionally targeted at a CSS selector with a merge
    /// mode (the exact vocabulary of modes -- morph, append, prepend, ... --
    /// is the client library's concern; the runtime only carries the name
    /// through).
    Elements {
        html: String,
        selector: Option<String>,
        mode: Option<String>,
    },
    /// A nested signals object, already encoded per `signal_value::nest`.
    Signals { value: SignalValue },
    /// Raw JavaScript to execute client-side.
    Script { js: String },
}

/// Bounded per-context queue with drop-oldest backpressure (spec.md §4.7).
pub struct PatchManager {
    capacity: usize,
    queue: Mutex<VecDeque<Patch>>,
}

impl PatchManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Push a patch. If the queue is already at capacity, the oldest entry
    /// is discarded (with a warning) before the new one is pushed -- the
    /// last patch enqueued is always present (spec.md §8 property 7).
    pub fn push(&self, patch: Patch) {
        let mut queue = self.queue.lock().expect("patch queue lock poisoned");
        while queue.len() >= self.capacity {
            queue.pop_front();
            warn!("patch queue at capacity ({}), dropping oldest patch", self.capacity);
        }
        queue.push_back(patch);
    }

    /// Pop one patch in FIFO order, if any.
    pub fn pop(&self) -> Option<Patch> {
        self.queue.lock().expect("patch queue lock poisoned").pop_front()
    }

    /// Drain every currently-queued patch, in order.
    pub fn drain(&self) -> Vec<Patch> {
        self.queue.lock().expect("patch queue lock poisoned").drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().expect("patch queue lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear the queue. Called on SSE reconnect ("recreate its patch queue",
    /// spec.md §4.6).
    pub fn recreate(&self) {
        self.queue.lock().expect("patch queue lock poisoned").clear();
    }
}
