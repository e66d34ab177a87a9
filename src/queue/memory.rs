//! In-memory bounded concurrent queue backend (spec §4.3, §5).

use super::{CrawlQueue, CrawlTask, EnqueueOutcome, QueueEntry};
use crate::url::Fingerprint;
use async_trait::async_trait;
use dashmap::DashSet;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

struct Inner {
    items: Mutex<VecDeque<QueueEntry>>,
    visited: DashSet<Fingerprint>,
    notify: Notify,
    closed: AtomicBool,
    capacity: usize,
}

/// Bounded concurrent FIFO plus a concurrent fingerprint set, matching the
/// donor's `Mutex<VecDeque<_>>` + `DashSet<_>` shape in
/// `crawl_engine::core::crawl_pages`.
#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Inner>,
}

impl MemoryQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::new()),
                visited: DashSet::new(),
                notify: Notify::new(),
                closed: AtomicBool::new(false),
                capacity,
            }),
        }
    }
}

#[async_trait]
impl CrawlQueue for MemoryQueue {
    async fn enqueue(&self, fingerprint: Fingerprint, task: CrawlTask) -> EnqueueOutcome {
        if self.inner.closed.load(Ordering::Acquire) {
            return EnqueueOutcome::RejectedFull;
        }

        // Check-and-insert must happen before we know whether there's room,
        // so a duplicate never counts against capacity.
        if !self.inner.visited.insert(fingerprint) {
            return EnqueueOutcome::Duplicate;
        }

        let mut items = self.inner.items.lock().await;
        if items.len() >= self.inner.capacity {
            // Not actually enqueued; undo the visited-set insert so a later
            // retry of the same URL is not treated as a duplicate.
            self.inner.visited.remove(&fingerprint);
            return EnqueueOutcome::RejectedFull;
        }
        items.push_back(QueueEntry { fingerprint, task });
        drop(items);
        self.inner.notify.notify_one();
        EnqueueOutcome::Enqueued
    }

    async fn dequeue(&self) -> Option<QueueEntry> {
        loop {
            {
                let mut items = self.inner.items.lock().await;
                if let Some(entry) = items.pop_front() {
                    return Some(entry);
                }
                if self.inner.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            self.inner.notify.notified().await;
        }
    }

    fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.notify.notify_waiters();
    }

    fn size(&self) -> usize {
        self.inner.items.try_lock().map(|g| g.len()).unwrap_or(0)
    }

    fn visited_count(&self) -> usize {
        self.inner.visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::DiscoveredVia;

    fn task(url: &str) -> CrawlTask {
        CrawlTask {
            url: url.to_string(),
            depth: 1,
            referer: None,
            discovered_via: DiscoveredVia::Seed,
        }
    }

    fn fp(n: u128) -> Fingerprint {
        Fingerprint(n)
    }

    #[tokio::test]
    async fn duplicate_fingerprint_is_rejected() {
        let q = MemoryQueue::new(10);
        assert_eq!(
            q.enqueue(fp(1), task("http://a/")).await,
            EnqueueOutcome::Enqueued
        );
        assert_eq!(
            q.enqueue(fp(1), task("http://a/")).await,
            EnqueueOutcome::Duplicate
        );
        assert_eq!(q.size(), 1);
    }

    #[tokio::test]
    async fn rejects_when_at_capacity() {
        let q = MemoryQueue::new(1);
        assert_eq!(
            q.enqueue(fp(1), task("http://a/")).await,
            EnqueueOutcome::Enqueued
        );
        assert_eq!(
            q.enqueue(fp(2), task("http://b/")).await,
            EnqueueOutcome::RejectedFull
        );
    }

    #[tokio::test]
    async fn retry_after_rejected_full_is_not_treated_as_duplicate() {
        let q = MemoryQueue::new(1);
        let _ = q.enqueue(fp(1), task("http://a/")).await;
        assert_eq!(
            q.enqueue(fp(2), task("http://b/")).await,
            EnqueueOutcome::RejectedFull
        );
        // Drain then retry: should succeed, not report Duplicate.
        let _ = q.dequeue().await;
        assert_eq!(
            q.enqueue(fp(2), task("http://b/")).await,
            EnqueueOutcome::Enqueued
        );
    }

    #[tokio::test]
    async fn fifo_order_preserved() {
        let q = MemoryQueue::new(10);
        let _ = q.enqueue(fp(1), task("http://a/")).await;
        let _ = q.enqueue(fp(2), task("http://b/")).await;
        let first = q.dequeue().await.unwrap();
        let second = q.dequeue().await.unwrap();
        assert_eq!(first.task.url, "http://a/");
        assert_eq!(second.task.url, "http://b/");
    }

    #[tokio::test]
    async fn close_drains_then_returns_none() {
        let q = MemoryQueue::new(10);
        let _ = q.enqueue(fp(1), task("http://a/")).await;
        q.close();
        assert!(q.dequeue().await.is_some());
        assert!(q.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn enqueue_after_close_is_rejected() {
        let q = MemoryQueue::new(10);
        q.close();
        assert_eq!(
            q.enqueue(fp(1), task("http://a/")).await,
            EnqueueOutcome::RejectedFull
        );
    }

    #[tokio::test]
    async fn dequeue_blocks_until_enqueue_wakes_it() {
        let q = Arc::new(MemoryQueue::new(10));
        let q2 = q.clone();
        let handle = tokio::spawn(async move { q2.dequeue().await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let _ = q.enqueue(fp(1), task("http://a/")).await;
        let result = tokio::time::timeout(std::time::Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_some());
    }
}
