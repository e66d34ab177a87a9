//! Crawl coordinator: orchestrates seeding, the worker pool, depth/budget
//! accounting, termination, and event emission (spec §4.8).
//!
//! Grounded on the donor's `crawl_engine::core::crawl_pages` worker loop
//! (shared queue + spawned tasks draining it concurrently, progress events
//! published throughout) but rebuilt around `reqwest` fetches instead of
//! `chromiumoxide`, and around the typed termination-trigger set spec §4.8
//! names instead of the donor's single "crawl finished" condition.

mod worker;

use crate::config::CrawlerConfig;
use crate::events::{CrawlEvent, EventBus, Stats, TerminationReason};
use crate::extract::rules::CompiledDomainRules;
use crate::http::HttpClient;
use crate::queue::{CrawlQueue, CrawlTask, DiscoveredVia};
use crate::robots::RobotsService;
use crate::sink::Sink;
use crate::url::UrlLimits;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as SyncMutex};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Idle,
    Seeding,
    Running,
    Draining,
    Terminated,
}

struct Shared {
    config: Arc<CrawlerConfig>,
    queue: Arc<dyn CrawlQueue>,
    http: Arc<HttpClient>,
    robots: Arc<RobotsService>,
    events: Arc<EventBus>,
    stats: Arc<Stats>,
    sink: Arc<dyn Sink>,
    domain_rules: HashMap<String, CompiledDomainRules>,
    authority_pacing: DashMap<String, Arc<AsyncMutex<Instant>>>,
    url_limits: UrlLimits,
    in_flight: AtomicUsize,
    stop_requested: AtomicBool,
    /// Set exactly once, by whichever termination trigger fires first
    /// (spec §4.8/§9: five distinct triggers, each its own reason).
    termination_reason: SyncMutex<Option<TerminationReason>>,
    state: AsyncMutex<CoordinatorState>,
}

impl Shared {
    fn set_termination_reason(&self, reason: TerminationReason) {
        let mut guard = self
            .termination_reason
            .lock()
            .expect("termination_reason mutex poisoned");
        if guard.is_none() {
            *guard = Some(reason);
        }
    }

    fn take_termination_reason(&self) -> TerminationReason {
        self.termination_reason
            .lock()
            .expect("termination_reason mutex poisoned")
            .take()
            .unwrap_or(TerminationReason::QueueDrained)
    }
}

/// Orchestrates one crawl from `Idle` through `Terminated`. Not reusable
/// across crawls — construct a fresh coordinator per crawl (spec §3's
/// lifecycle rules tie `RobotsRecord`/`VisitedSet` lifetime to one crawl).
pub struct CrawlCoordinator {
    shared: Arc<Shared>,
}

impl CrawlCoordinator {
    #[must_use]
    pub fn new(
        config: Arc<CrawlerConfig>,
        queue: Arc<dyn CrawlQueue>,
        http: Arc<HttpClient>,
        robots: Arc<RobotsService>,
        events: Arc<EventBus>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let domain_rules = config
            .domains_extraction_rules()
            .iter()
            .map(|(domain, rules)| (domain.clone(), CompiledDomainRules::compile(domain, rules)))
            .collect();
        let url_limits = config.url_limits();
        Self {
            shared: Arc::new(Shared {
                config,
                queue,
                http,
                robots,
                events,
                stats: Arc::new(Stats::new()),
                sink,
                domain_rules,
                authority_pacing: DashMap::new(),
                url_limits,
                in_flight: AtomicUsize::new(0),
                stop_requested: AtomicBool::new(false),
                termination_reason: SyncMutex::new(None),
                state: AsyncMutex::new(CoordinatorState::Idle),
            }),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<Stats> {
        self.shared.stats.clone()
    }

    /// Requests graceful termination; observable by workers between I/O
    /// steps (spec §5).
    pub fn stop(&self) {
        self.shared.set_termination_reason(TerminationReason::StopSignal);
        self.shared.stop_requested.store(true, Ordering::SeqCst);
        self.shared.queue.close();
    }

    async fn set_state(&self, state: CoordinatorState) {
        *self.shared.state.lock().await = state;
    }

    #[must_use]
    pub async fn state(&self) -> CoordinatorState {
        *self.shared.state.lock().await
    }

    /// Runs the crawl to completion: seed, launch workers, drain, and
    /// return the reason the crawl ended.
    pub async fn run(&self) -> TerminationReason {
        self.set_state(CoordinatorState::Seeding).await;
        self.shared.events.publish(CrawlEvent::CrawlStart {
            crawl_id: self.shared.config.crawl_id().to_string(),
            at: chrono::Utc::now(),
        });

        self.seed().await;
        self.fetch_extra_sitemaps().await;

        if self.shared.queue.is_empty() {
            // Nothing could be scheduled at all: every seed (and sitemap
            // entry) failed to parse or enqueue. Non-empty seed_urls was
            // already required at build() time, but build() can't validate
            // seed syntax itself since seeds are consumed lazily — this is
            // the runtime counterpart of that check.
            self.shared
                .set_termination_reason(TerminationReason::ConfigError);
        } else {
            self.set_state(CoordinatorState::Running).await;

            let duration_guard = self.spawn_duration_timer();

            let mut handles = Vec::with_capacity(self.shared.config.threads_per_crawl());
            for _ in 0..self.shared.config.threads_per_crawl() {
                let shared = self.shared.clone();
                handles.push(tokio::spawn(async move {
                    worker::run_worker(shared).await;
                }));
            }
            for handle in handles {
                let _ = handle.await;
            }
            duration_guard.abort();
        }

        self.set_state(CoordinatorState::Draining).await;

        let reason = self.shared.take_termination_reason();

        self.set_state(CoordinatorState::Terminated).await;
        self.shared.events.publish(CrawlEvent::CrawlEnd {
            crawl_id: self.shared.config.crawl_id().to_string(),
            reason,
            at: chrono::Utc::now(),
        });
        self.shared
            .events
            .publish(CrawlEvent::stats_snapshot(&self.shared.stats.snapshot()));

        reason
    }

    fn spawn_duration_timer(&self) -> tokio::task::JoinHandle<()> {
        let shared = self.shared.clone();
        let max_duration = shared.config.max_duration();
        tokio::spawn(async move {
            tokio::time::sleep(max_duration).await;
            shared.set_termination_reason(TerminationReason::MaxDurationElapsed);
            shared.stop_requested.store(true, Ordering::SeqCst);
            shared.queue.close();
        })
    }

    async fn seed(&self) {
        // Seed URLs are pulled one at a time from the config's iterator-like
        // `SeedUrls` source (spec §9's "lazy seed iteration" note) rather
        // than materialized up front, and enqueued one at a time, respecting
        // `url_queue_size_limit` via the queue's own backpressure.
        while let Some(seed) = self.shared.config.seed_urls().next() {
            if let Ok(url) = crate::url::NormalizedUrl::parse(&seed, &self.shared.url_limits) {
                // Open question (spec §9) resolved: a seed's authority is
                // implicitly allowed even if absent from domain_allowlist.
                let task = CrawlTask {
                    url: url.to_string(),
                    depth: 1,
                    referer: None,
                    discovered_via: DiscoveredVia::Seed,
                };
                let outcome = self.shared.queue.enqueue(url.fingerprint(), task).await;
                if outcome == crate::queue::EnqueueOutcome::Enqueued {
                    self.shared.stats.record_links_enqueued(1);
                }
            }
        }
    }

    async fn fetch_extra_sitemaps(&self) {
        if self.shared.config.sitemap_discovery_disabled() {
            return;
        }
        let sitemap_urls: Vec<String> = self.shared.config.sitemap_urls().to_vec();
        let mut futures = Vec::new();
        for url in sitemap_urls {
            let shared = self.shared.clone();
            futures.push(tokio::spawn(async move {
                if let Ok(response) = shared.http.get(&url).await {
                    let parsed = crate::sitemap::parse_sitemap(
                        &response.body,
                        crate::sitemap::MAX_SITEMAP_BYTES,
                    );
                    if parsed.malformed_skipped > 0 || parsed.truncated {
                        shared.events.publish(CrawlEvent::Error {
                            kind: "sitemap_truncated_or_malformed".into(),
                            url: url.clone(),
                        });
                    }
                    for task in parsed.tasks {
                        if let Ok(u) =
                            crate::url::NormalizedUrl::parse(&task.url, &shared.url_limits)
                        {
                            let _ = shared.queue.enqueue(u.fingerprint(), task).await;
                        }
                    }
                }
            }));
        }
        for f in futures {
            let _ = f.await;
        }
    }
}
