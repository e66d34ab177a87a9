//! File-backed queue backend (SPEC_FULL.md A.5 supplement).
//!
//! Journals every admitted `QueueEntry` as newline-delimited JSON so the
//! abstract `CrawlQueue` trait has more than one real backend. In-memory
//! ordering/dedup/backpressure semantics are delegated to `MemoryQueue`;
//! this wrapper only adds the append-only journal, grounded on the donor's
//! general append-file style in `content_saver`.

use super::memory::MemoryQueue;
use super::{CrawlQueue, CrawlTask, EnqueueOutcome, QueueEntry};
use crate::url::Fingerprint;
use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;

pub struct FileBackedQueue {
    memory: MemoryQueue,
    journal_path: PathBuf,
    journal: AsyncMutex<Option<tokio::fs::File>>,
}

impl FileBackedQueue {
    pub async fn open(journal_path: impl Into<PathBuf>, capacity: usize) -> io::Result<Self> {
        let journal_path = journal_path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&journal_path)
            .await?;
        Ok(Self {
            memory: MemoryQueue::new(capacity),
            journal_path,
            journal: AsyncMutex::new(Some(file)),
        })
    }

    #[must_use]
    pub fn journal_path(&self) -> &std::path::Path {
        &self.journal_path
    }

    async fn append(&self, fingerprint: Fingerprint, task: &CrawlTask) {
        let entry = QueueEntry {
            fingerprint,
            task: task.clone(),
        };
        let Ok(mut line) = serde_json::to_vec(&entry) else {
            return;
        };
        line.push(b'\n');

        let mut guard = self.journal.lock().await;
        if let Some(file) = guard.as_mut() {
            let _ = file.write_all(&line).await;
            let _ = file.flush().await;
        }
    }
}

#[async_trait]
impl CrawlQueue for FileBackedQueue {
    async fn enqueue(&self, fingerprint: Fingerprint, task: CrawlTask) -> EnqueueOutcome {
        let outcome = self.memory.enqueue(fingerprint, task.clone()).await;
        if outcome == EnqueueOutcome::Enqueued {
            self.append(fingerprint, &task).await;
        }
        outcome
    }

    async fn dequeue(&self) -> Option<QueueEntry> {
        self.memory.dequeue().await
    }

    fn close(&self) {
        self.memory.close();
    }

    fn size(&self) -> usize {
        self.memory.size()
    }

    fn visited_count(&self) -> usize {
        self.memory.visited_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::DiscoveredVia;
    use assert_fs::prelude::*;

    fn task(url: &str) -> CrawlTask {
        CrawlTask {
            url: url.to_string(),
            depth: 1,
            referer: None,
            discovered_via: DiscoveredVia::Seed,
        }
    }

    #[tokio::test]
    async fn journals_enqueued_entries() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.child("queue.ndjson");
        let q = FileBackedQueue::open(path.path(), 10).await.unwrap();
        let _ = q.enqueue(Fingerprint(1), task("http://a/")).await;
        let _ = q.enqueue(Fingerprint(1), task("http://a/")).await; // duplicate, not journaled

        let contents = tokio::fs::read_to_string(q.journal_path()).await.unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("http://a/"));
    }

    #[tokio::test]
    async fn dedup_and_fifo_delegate_to_memory_backend() {
        let dir = assert_fs::TempDir::new().unwrap();
        let path = dir.child("queue.ndjson");
        let q = FileBackedQueue::open(path.path(), 10).await.unwrap();
        let _ = q.enqueue(Fingerprint(1), task("http://a/")).await;
        let _ = q.enqueue(Fingerprint(2), task("http://b/")).await;
        assert_eq!(q.dequeue().await.unwrap().task.url, "http://a/");
        assert_eq!(q.dequeue().await.unwrap().task.url, "http://b/");
    }
}
