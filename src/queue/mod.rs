//! Abstract URL queue with dedup, backpressure, and pluggable backends
//! (spec §4.3).
//!
//! Grounded on the donor's registry-of-backends intent (spec §9 redesign
//! note: "dynamic class-name dispatch ... becomes a registry of named
//! constructors") and on the donor's `crawl_engine::core` combination of a
//! `Mutex`-guarded `VecDeque` plus a `DashSet` for the visited fingerprints,
//! generalized behind a trait so a file-backed backend can share it.

mod file_backed;
mod memory;

pub use file_backed::FileBackedQueue;
pub use memory::MemoryQueue;

use crate::url::Fingerprint;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// (url, depth, referer?, discovered_via) — immutable once enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlTask {
    pub url: String,
    pub depth: u32,
    pub referer: Option<String>,
    pub discovered_via: DiscoveredVia,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscoveredVia {
    Seed,
    Sitemap,
    HtmlLink,
    RobotsRedirect,
}

/// (fingerprint, CrawlTask) as stored in the queue (spec §3 "QueueEntry").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub fingerprint: Fingerprint,
    pub task: CrawlTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    Duplicate,
    RejectedFull,
}

/// FIFO queue with dedup, size cap, and backpressure. Thread-safe by
/// construction (the concrete backends use interior synchronization), so
/// the trait takes `&self` throughout.
#[async_trait]
pub trait CrawlQueue: Send + Sync {
    /// Atomically check-and-insert the fingerprint, then enqueue if new.
    async fn enqueue(&self, fingerprint: Fingerprint, task: CrawlTask) -> EnqueueOutcome;

    /// Blocks until an item is available or the queue is closed.
    async fn dequeue(&self) -> Option<QueueEntry>;

    /// Irreversible: subsequent enqueues fail, dequeues drain then `None`.
    fn close(&self);

    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Number of distinct fingerprints ever admitted (bounded by
    /// `max_unique_url_count`; spec §3 "VisitedSet").
    fn visited_count(&self) -> usize;
}
