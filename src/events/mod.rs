//! Crawl lifecycle events and the event bus (spec §4.8, §4.9).
//!
//! Grounded on the donor's `crawl_events::bus::core::CrawlEventBus`
//! (`broadcast::Sender` + overload/backpressure awareness), narrowed to
//! the event variant set spec §4.8 names instead of the donor's
//! content-pipeline-specific variants.

pub mod metrics;

pub use metrics::Stats;

use crate::types::StatsSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    QueueDrained,
    MaxDurationElapsed,
    BudgetExhausted,
    StopSignal,
    ConfigError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    RobotsDisallowed,
    DepthExceeded,
    Duplicate,
    NotAllowlisted,
    UnsupportedScheme,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CrawlEvent {
    CrawlStart {
        crawl_id: String,
        at: DateTime<Utc>,
    },
    CrawlEnd {
        crawl_id: String,
        reason: TerminationReason,
        at: DateTime<Utc>,
    },
    UrlFetchStart {
        url: String,
        at: DateTime<Utc>,
    },
    UrlFetchEnd {
        url: String,
        result_kind: String,
        status: u16,
        bytes: u64,
        at: DateTime<Utc>,
    },
    UrlDiscover {
        from: String,
        to: String,
    },
    UrlDrop {
        url: String,
        reason: DropReason,
    },
    RobotsFetched {
        authority: String,
        is_fallback: bool,
    },
    Error {
        kind: String,
        url: String,
    },
    StatsSnapshot {
        pages_visited: u64,
        bytes_downloaded: u64,
        links_extracted: u64,
        links_enqueued: u64,
    },
}

impl CrawlEvent {
    #[must_use]
    pub fn stats_snapshot(stats: &StatsSnapshot) -> Self {
        Self::StatsSnapshot {
            pages_visited: stats.pages_visited,
            bytes_downloaded: stats.bytes_downloaded,
            links_extracted: stats.links_extracted,
            links_enqueued: stats.links_enqueued,
        }
    }
}

/// Broadcasts events to any number of subscribers. Event emission is
/// effectively a single writer (the coordinator) per spec §5, so no
/// additional serialization is needed beyond the broadcast channel's own.
pub struct EventBus {
    sender: broadcast::Sender<CrawlEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity);
        Self { sender }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.sender.subscribe()
    }

    /// Best-effort: a lagging or absent subscriber never blocks the crawl.
    pub fn publish(&self, event: CrawlEvent) {
        let _ = self.sender.send(event);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(CrawlEvent::CrawlStart {
            crawl_id: "abc".into(),
            at: Utc::now(),
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, CrawlEvent::CrawlStart { .. }));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(CrawlEvent::CrawlStart {
            crawl_id: "abc".into(),
            at: Utc::now(),
        });
    }
}
