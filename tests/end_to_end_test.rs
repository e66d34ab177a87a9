//! End-to-end crawl scenarios against a mock HTTP server (spec §8).

use crawlkit::config::CrawlerConfigBuilder;
use crawlkit::dns::Resolver;
use crawlkit::error::CrawlError;
use crawlkit::events::EventBus;
use crawlkit::http::HttpClient;
use crawlkit::queue::{CrawlQueue, MemoryQueue};
use crawlkit::robots::RobotsService;
use crawlkit::sink::Sink;
use crawlkit::types::CrawlResult;
use crawlkit::{CrawlCoordinator, TerminationReason};
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// Resolves every host to loopback; tests pair this with
/// `loopback_allowed`/`private_networks_allowed` on the config so the
/// crawler's own DNS filter doesn't reject its own mock server.
struct LoopbackResolver;

#[async_trait::async_trait]
impl Resolver for LoopbackResolver {
    async fn resolve(&self, _host: &str) -> Result<Vec<IpAddr>, CrawlError> {
        Ok(vec!["127.0.0.1".parse().unwrap()])
    }
}

struct CollectingSink {
    results: Mutex<Vec<CrawlResult>>,
}

#[async_trait::async_trait]
impl Sink for CollectingSink {
    async fn emit(&self, result: CrawlResult) {
        self.results.lock().unwrap().push(result);
    }
}

#[tokio::test]
async fn allowlist_filtering_drops_foreign_authority_links() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    let home = format!(
        "<html><body><a href=\"{base}/b\">b</a><a href=\"{base}/c\">c</a><a href=\"http://evil.example/x\">evil</a></body></html>"
    );
    let _m_home = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(home)
        .create_async()
        .await;
    let _m_b = server
        .mock("GET", "/b")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><body>b</body></html>")
        .create_async()
        .await;
    let _m_c = server
        .mock("GET", "/c")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html><body>c</body></html>")
        .create_async()
        .await;
    let _m_robots = server
        .mock("GET", "/robots.txt")
        .with_status(404)
        .create_async()
        .await;

    let config = Arc::new(
        CrawlerConfigBuilder::new()
            .domain_allowlist(vec![base.clone()])
            .seed_urls(vec![format!("{base}/")])
            .threads_per_crawl(2)
            .loopback_allowed(true)
            .private_networks_allowed(true)
            .build()
            .unwrap(),
    );

    let http = Arc::new(HttpClient::build_with_resolver(config.clone(), LoopbackResolver).unwrap());
    let robots = Arc::new(RobotsService::new(http.clone(), config.user_agent()));
    let queue: Arc<dyn CrawlQueue> = Arc::new(MemoryQueue::new(config.url_queue_size_limit()));
    let events = Arc::new(EventBus::new(64));
    let sink = Arc::new(CollectingSink {
        results: Mutex::new(Vec::new()),
    });

    let coordinator = CrawlCoordinator::new(
        config,
        queue,
        http,
        robots,
        events,
        sink.clone() as Arc<dyn Sink>,
    );

    let reason = tokio::time::timeout(std::time::Duration::from_secs(5), coordinator.run())
        .await
        .expect("crawl should finish quickly");

    assert_eq!(reason, TerminationReason::QueueDrained);
    let results = sink.results.lock().unwrap();
    assert_eq!(results.len(), 3, "expected exactly 3 results: /, /b, /c");
    assert!(results.iter().all(|r| !r.common().url.contains("evil.example")));
}

#[tokio::test]
async fn robots_disallow_drops_linked_page() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    let home = format!("<html><body><a href=\"{base}/private\">p</a></body></html>");
    let _m_home = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(home)
        .create_async()
        .await;
    let _m_robots = server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body("User-agent: *\nDisallow: /private")
        .create_async()
        .await;

    let config = Arc::new(
        CrawlerConfigBuilder::new()
            .domain_allowlist(vec![base.clone()])
            .seed_urls(vec![format!("{base}/")])
            .threads_per_crawl(1)
            .loopback_allowed(true)
            .private_networks_allowed(true)
            .build()
            .unwrap(),
    );

    let http = Arc::new(HttpClient::build_with_resolver(config.clone(), LoopbackResolver).unwrap());
    let robots = Arc::new(RobotsService::new(http.clone(), config.user_agent()));
    let queue: Arc<dyn CrawlQueue> = Arc::new(MemoryQueue::new(config.url_queue_size_limit()));
    let events = Arc::new(EventBus::new(64));
    let sink = Arc::new(CollectingSink {
        results: Mutex::new(Vec::new()),
    });

    let coordinator = CrawlCoordinator::new(
        config,
        queue,
        http,
        robots,
        events,
        sink.clone() as Arc<dyn Sink>,
    );

    tokio::time::timeout(std::time::Duration::from_secs(5), coordinator.run())
        .await
        .expect("crawl should finish quickly");

    let results = sink.results.lock().unwrap();
    assert_eq!(results.len(), 1, "disallowed /private must not produce a result");
    assert!(!results[0].common().url.ends_with("/private"));
}

#[tokio::test]
async fn budget_exhaustion_terminates_after_max_unique_url_count() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    let home = format!(
        "<html><body><a href=\"{base}/a\">a</a><a href=\"{base}/b\">b</a><a href=\"{base}/c\">c</a><a href=\"{base}/d\">d</a></body></html>"
    );
    let _m_home = server
        .mock("GET", "/")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(home)
        .create_async()
        .await;
    for p in ["/a", "/b", "/c", "/d"] {
        let _ = server
            .mock("GET", p)
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body>leaf</body></html>")
            .create_async()
            .await;
    }
    let _m_robots = server.mock("GET", "/robots.txt").with_status(404).create_async().await;

    let config = Arc::new(
        CrawlerConfigBuilder::new()
            .domain_allowlist(vec![base.clone()])
            .seed_urls(vec![format!("{base}/")])
            .max_unique_url_count(3)
            .threads_per_crawl(1)
            .loopback_allowed(true)
            .private_networks_allowed(true)
            .build()
            .unwrap(),
    );

    let http = Arc::new(HttpClient::build_with_resolver(config.clone(), LoopbackResolver).unwrap());
    let robots = Arc::new(RobotsService::new(http.clone(), config.user_agent()));
    let queue: Arc<dyn CrawlQueue> = Arc::new(MemoryQueue::new(config.url_queue_size_limit()));
    let events = Arc::new(EventBus::new(64));
    let sink = Arc::new(CollectingSink {
        results: Mutex::new(Vec::new()),
    });

    let coordinator = CrawlCoordinator::new(
        config,
        queue,
        http,
        robots,
        events,
        sink.clone() as Arc<dyn Sink>,
    );

    let reason = tokio::time::timeout(std::time::Duration::from_secs(5), coordinator.run())
        .await
        .expect("crawl should finish quickly");

    assert_eq!(reason, TerminationReason::BudgetExhausted);
    assert_eq!(coordinator.stats().pages_visited(), 3);
}
