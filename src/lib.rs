//! `crawlkit`: a configurable, bounded web crawl engine.
//!
//! The crate exposes the crawl engine only — output sinks beyond a minimal
//! console default, the extraction-rule DSL's surface syntax, CLI/config
//! loading, and metrics serialization are explicitly out of scope and are
//! left to a hosting application.

pub mod config;
pub mod coordinator;
pub mod dns;
pub mod error;
pub mod events;
pub mod extract;
pub mod http;
pub mod queue;
pub mod robots;
pub mod sink;
pub mod sitemap;
pub mod types;
pub mod url;

pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use coordinator::{CoordinatorState, CrawlCoordinator};
pub use error::{CrawlError, CrawlResult as EngineResult, FailureKind};
pub use events::{CrawlEvent, EventBus, Stats, TerminationReason};
pub use queue::{CrawlQueue, MemoryQueue};
pub use types::CrawlResult;

use std::sync::Arc;

/// Builds the default collaborators for a config and runs one crawl to
/// completion, matching the donor's `pub async fn crawl(config)` entry
/// point shape in `lib.rs` (minus the browser/MCP bootstrap it also did).
pub async fn crawl(config: CrawlerConfig) -> Result<TerminationReason, CrawlError> {
    let config = Arc::new(config);
    let queue: Arc<dyn CrawlQueue> = Arc::new(MemoryQueue::new(config.url_queue_size_limit()));
    let http = Arc::new(http::HttpClient::build(config.clone())?);
    let robots = Arc::new(robots::RobotsService::new(
        http.clone(),
        config.user_agent(),
    ));
    let events = Arc::new(EventBus::new(1024));
    let sink: Arc<dyn sink::Sink> = Arc::new(sink::ConsoleSink);

    let coordinator = CrawlCoordinator::new(config, queue, http, robots, events, sink);
    Ok(coordinator.run().await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_surface_compiles() {
        let _ = CrawlerConfigBuilder::new();
    }
}
