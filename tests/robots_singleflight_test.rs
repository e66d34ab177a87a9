//! Concurrent callers for the same authority observe exactly one
//! robots.txt fetch (spec §4.4, §8: "single robots fetch per authority").

use crawlkit::config::CrawlerConfigBuilder;
use crawlkit::http::HttpClient;
use crawlkit::robots::RobotsService;
use crawlkit::url::Domain;
use std::sync::Arc;

struct LoopbackResolver;

#[async_trait::async_trait]
impl crawlkit::dns::Resolver for LoopbackResolver {
    async fn resolve(&self, _host: &str) -> Result<Vec<std::net::IpAddr>, crawlkit::error::CrawlError> {
        Ok(vec!["127.0.0.1".parse().unwrap()])
    }
}

#[tokio::test]
async fn concurrent_callers_trigger_exactly_one_fetch() {
    let mut server = mockito::Server::new_async().await;
    let base = server.url();

    let mock = server
        .mock("GET", "/robots.txt")
        .with_status(200)
        .with_body("User-agent: *\nDisallow: /private\nCrawl-delay: 1")
        .expect(1)
        .create_async()
        .await;

    let config = Arc::new(
        CrawlerConfigBuilder::new()
            .domain_allowlist(vec![base.clone()])
            .seed_urls(vec![format!("{base}/")])
            .loopback_allowed(true)
            .private_networks_allowed(true)
            .build()
            .unwrap(),
    );

    let http = Arc::new(HttpClient::build_with_resolver(config.clone(), LoopbackResolver).unwrap());
    let robots = Arc::new(RobotsService::new(http, config.user_agent()));

    let authority = Domain::parse(&base).unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let robots = robots.clone();
        let authority = authority.clone();
        handles.push(tokio::spawn(async move { robots.get(&authority).await }));
    }

    let mut records = Vec::new();
    for h in handles {
        records.push(h.await.unwrap());
    }

    assert!(records.iter().all(|r| !r.is_fallback));
    assert!(!records[0].allowed(&format!("{base}/private")));

    mock.assert_async().await;
}
