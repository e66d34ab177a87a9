//! Atomic stats counters and snapshots (spec §4.9), grounded on the donor's
//! `crawl_events::metrics::EventBusMetrics`/`MetricsSnapshot` pattern.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::types::StatsSnapshot;

#[derive(Default)]
pub struct Stats {
    pages_visited: AtomicU64,
    bytes_downloaded: AtomicU64,
    links_extracted: AtomicU64,
    links_enqueued: AtomicU64,
    errors_by_kind: Mutex<std::collections::HashMap<String, u64>>,
    duration_buckets_ms: [AtomicU64; 5],
}

impl Stats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_page_visited(&self, bytes: u64) {
        self.pages_visited.fetch_add(1, Ordering::Relaxed);
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_links_extracted(&self, n: u64) {
        self.links_extracted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_links_enqueued(&self, n: u64) {
        self.links_enqueued.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_error(&self, kind: &str) {
        let mut map = self.errors_by_kind.lock().expect("errors_by_kind mutex poisoned");
        *map.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn record_duration(&self, duration_ms: u64) {
        let idx = match duration_ms {
            0..=99 => 0,
            100..=499 => 1,
            500..=1999 => 2,
            2000..=9999 => 3,
            _ => 4,
        };
        self.duration_buckets_ms[idx].fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn pages_visited(&self) -> u64 {
        self.pages_visited.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let mut buckets = [0u64; 5];
        for (i, b) in self.duration_buckets_ms.iter().enumerate() {
            buckets[i] = b.load(Ordering::Relaxed);
        }
        StatsSnapshot {
            pages_visited: self.pages_visited.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            links_extracted: self.links_extracted.load(Ordering::Relaxed),
            links_enqueued: self.links_enqueued.load(Ordering::Relaxed),
            errors_by_kind: self
                .errors_by_kind
                .lock()
                .expect("errors_by_kind mutex poisoned")
                .clone(),
            duration_buckets_ms: buckets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_pages_and_bytes() {
        let stats = Stats::new();
        stats.record_page_visited(100);
        stats.record_page_visited(50);
        let snap = stats.snapshot();
        assert_eq!(snap.pages_visited, 2);
        assert_eq!(snap.bytes_downloaded, 150);
    }

    #[test]
    fn tracks_errors_by_kind() {
        let stats = Stats::new();
        stats.record_error("timeout");
        stats.record_error("timeout");
        stats.record_error("dns");
        let snap = stats.snapshot();
        assert_eq!(snap.errors_by_kind.get("timeout"), Some(&2));
        assert_eq!(snap.errors_by_kind.get("dns"), Some(&1));
    }

    #[test]
    fn buckets_durations() {
        let stats = Stats::new();
        stats.record_duration(50);
        stats.record_duration(5000);
        let snap = stats.snapshot();
        assert_eq!(snap.duration_buckets_ms[0], 1);
        assert_eq!(snap.duration_buckets_ms[3], 1);
    }
}
