//! Process RSS sampling for the `/_stats` `memory` field (spec.md §6).
//!
//! No crate in the teacher's stack covers memory introspection -- this is
//! new ambient observability code, Linux-only, read straight from
//! `/proc/self/status` rather than pulled in as a dependency for one gauge.

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks the high-water mark across calls to [`current_rss_kb`].
#[derive(Default)]
pub struct MemoryTracker {
    peak_kb: AtomicU64,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `(current_kb, peak_kb)`, updating the tracked peak as a side
    /// effect.
    pub fn sample(&self) -> (u64, u64) {
        let current = current_rss_kb();
        let mut peak = self.peak_kb.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_kb.compare_exchange_weak(peak, current, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => peak = observed,
            }
        }
        (current, peak.max(current))
    }
}

/// Parses `VmRSS` out of `/proc/self/status`; returns `0` off Linux or if
/// the file can't be read.
fn current_rss_kb() -> u64 {
    let Ok(status) = fs::read_to_string("/proc/self/status") else {
        return 0;
    };
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_never_reports_peak_below_current() {
        let tracker = MemoryTracker::new();
        let (current, peak) = tracker.sample();
        assert!(peak >= current);
    }
}
