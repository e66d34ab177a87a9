//! `CrawlerConfigBuilder` (spec §6), grounded on the donor's chainable
//! `with_*` builder methods in `config::types::CrawlConfig`.

use super::types::{
    CrawlerConfig, DomainExtractionRules, HostCredential, OutputSink, ProxyConfig, QueueBackend,
    SeedUrls, TlsVerificationMode,
};
use crate::error::CrawlError;
use crate::url::Domain;
use std::time::Duration;
use uuid::Uuid;

#[derive(Default)]
pub struct CrawlerConfigBuilder {
    inner: CrawlerConfig,
    /// Raw allowlist entries, parsed in `build()` so a malformed entry is
    /// surfaced as a `ConfigError` instead of silently dropped.
    domain_allowlist_raw: Vec<String>,
}

impl CrawlerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn crawl_id(mut self, id: impl Into<String>) -> Self {
        self.inner.crawl_id = id.into();
        self
    }

    #[must_use]
    pub fn domain_allowlist(mut self, domains: Vec<String>) -> Self {
        self.domain_allowlist_raw = domains;
        self
    }

    #[must_use]
    pub fn seed_urls(mut self, seeds: Vec<String>) -> Self {
        self.inner.seed_urls = SeedUrls::from_vec(seeds);
        self
    }

    /// Accepts a true iterator/stream of seed URLs instead of a
    /// fully-materialized `Vec` (spec §9: seeds may be an unbounded
    /// sequence; the coordinator pulls them one at a time).
    #[must_use]
    pub fn seed_urls_from_iter(
        mut self,
        seeds: impl Iterator<Item = String> + Send + 'static,
    ) -> Self {
        self.inner.seed_urls = SeedUrls::from_iter(seeds);
        self
    }

    #[must_use]
    pub fn sitemap_urls(mut self, sitemaps: Vec<String>) -> Self {
        self.inner.sitemap_urls = sitemaps;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.inner.user_agent = ua.into();
        self
    }

    #[must_use]
    pub fn output_sink(mut self, sink: OutputSink) -> Self {
        self.inner.output_sink = sink;
        self
    }

    #[must_use]
    pub fn output_dir(mut self, dir: impl Into<String>) -> Self {
        self.inner.output_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn url_queue(mut self, backend: QueueBackend) -> Self {
        self.inner.url_queue = backend;
        self
    }

    #[must_use]
    pub fn url_queue_size_limit(mut self, limit: usize) -> Self {
        self.inner.url_queue_size_limit = limit;
        self
    }

    #[must_use]
    pub fn max_duration(mut self, secs: u64) -> Self {
        self.inner.max_duration = Duration::from_secs(secs);
        self
    }

    #[must_use]
    pub fn max_crawl_depth(mut self, depth: u32) -> Self {
        self.inner.max_crawl_depth = depth;
        self
    }

    #[must_use]
    pub fn max_unique_url_count(mut self, count: usize) -> Self {
        self.inner.max_unique_url_count = count;
        self
    }

    #[must_use]
    pub fn threads_per_crawl(mut self, n: usize) -> Self {
        self.inner.threads_per_crawl = n;
        self
    }

    #[must_use]
    pub fn max_redirects(mut self, n: u32) -> Self {
        self.inner.max_redirects = n;
        self
    }

    #[must_use]
    pub fn max_response_size(mut self, bytes: u64) -> Self {
        self.inner.max_response_size = bytes;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.inner.connect_timeout = Duration::from_secs(secs);
        self
    }

    #[must_use]
    pub fn socket_timeout(mut self, secs: u64) -> Self {
        self.inner.socket_timeout = Duration::from_secs(secs);
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, secs: u64) -> Self {
        self.inner.request_timeout = Duration::from_secs(secs);
        self
    }

    #[must_use]
    pub fn content_extraction_enabled(mut self, enabled: bool) -> Self {
        self.inner.content_extraction_enabled = enabled;
        self
    }

    #[must_use]
    pub fn content_extraction_mime_types(mut self, types: Vec<String>) -> Self {
        self.inner.content_extraction_mime_types = types;
        self
    }

    #[must_use]
    pub fn compression_enabled(mut self, enabled: bool) -> Self {
        self.inner.compression_enabled = enabled;
        self
    }

    #[must_use]
    pub fn sitemap_discovery_disabled(mut self, disabled: bool) -> Self {
        self.inner.sitemap_discovery_disabled = disabled;
        self
    }

    #[must_use]
    pub fn head_requests_enabled(mut self, enabled: bool) -> Self {
        self.inner.head_requests_enabled = enabled;
        self
    }

    #[must_use]
    pub fn ssl_ca_certificates(mut self, pems_or_paths: Vec<String>) -> Self {
        self.inner.ssl_ca_certificates = pems_or_paths;
        self
    }

    #[must_use]
    pub fn ssl_verification_mode(mut self, mode: TlsVerificationMode) -> Self {
        self.inner.ssl_verification_mode = mode;
        self
    }

    #[must_use]
    pub fn http_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.inner.http_proxy = Some(proxy);
        self
    }

    #[must_use]
    pub fn loopback_allowed(mut self, allowed: bool) -> Self {
        self.inner.loopback_allowed = allowed;
        self
    }

    #[must_use]
    pub fn private_networks_allowed(mut self, allowed: bool) -> Self {
        self.inner.private_networks_allowed = allowed;
        self
    }

    #[must_use]
    pub fn http_auth_allowed(mut self, allowed: bool) -> Self {
        self.inner.http_auth_allowed = allowed;
        self
    }

    #[must_use]
    pub fn auth_for_host(mut self, host: impl Into<String>, cred: HostCredential) -> Self {
        self.inner.auth.insert(host.into(), cred);
        self
    }

    #[must_use]
    pub fn domain_extraction_rules(
        mut self,
        domain: impl Into<String>,
        rules: DomainExtractionRules,
    ) -> Self {
        self.inner.domains_extraction_rules.insert(domain.into(), rules);
        self
    }

    #[must_use]
    pub fn stats_dump_interval(mut self, secs: u64) -> Self {
        self.inner.stats_dump_interval = Duration::from_secs(secs);
        self
    }

    /// Validate and finalize. Fatal at startup on failure (spec §6/§7).
    pub fn build(mut self) -> Result<CrawlerConfig, CrawlError> {
        if self.inner.crawl_id.is_empty() {
            self.inner.crawl_id = Uuid::new_v4().to_string();
        }

        let mut allowlist = Vec::with_capacity(self.domain_allowlist_raw.len());
        for raw in &self.domain_allowlist_raw {
            allowlist.push(Domain::parse(raw)?);
        }
        self.inner.domain_allowlist = allowlist;

        if self.inner.domain_allowlist.is_empty() {
            return Err(CrawlError::ConfigError(
                "domain_allowlist must be non-empty".into(),
            ));
        }
        if self.inner.seed_urls.is_empty() {
            return Err(CrawlError::ConfigError("seed_urls must be non-empty".into()));
        }
        if self.inner.threads_per_crawl == 0 {
            return Err(CrawlError::ConfigError(
                "threads_per_crawl must be at least 1".into(),
            ));
        }
        if matches!(self.inner.output_sink, OutputSink::File) && self.inner.output_dir.is_none() {
            return Err(CrawlError::ConfigError(
                "output_dir is required when output_sink = file".into(),
            ));
        }

        Ok(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_allowlist() {
        let result = CrawlerConfigBuilder::new()
            .seed_urls(vec!["http://a.example/".into()])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn rejects_malformed_allowlist_entry() {
        let result = CrawlerConfigBuilder::new()
            .domain_allowlist(vec!["not a url".into()])
            .seed_urls(vec!["http://a.example/".into()])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn seed_urls_from_iter_accepts_a_non_vec_source() {
        let cfg = CrawlerConfigBuilder::new()
            .domain_allowlist(vec!["http://a.example".into()])
            .seed_urls_from_iter(std::iter::once("http://a.example/".to_string()))
            .build()
            .unwrap();
        assert_eq!(cfg.seed_urls().next().as_deref(), Some("http://a.example/"));
        assert!(cfg.seed_urls().next().is_none());
    }

    #[test]
    fn rejects_empty_seeds() {
        let result = CrawlerConfigBuilder::new()
            .domain_allowlist(vec!["http://a.example".into()])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn generates_crawl_id_when_absent() {
        let cfg = CrawlerConfigBuilder::new()
            .domain_allowlist(vec!["http://a.example".into()])
            .seed_urls(vec!["http://a.example/".into()])
            .build()
            .unwrap();
        assert!(!cfg.crawl_id.is_empty());
    }

    #[test]
    fn file_sink_requires_output_dir() {
        let result = CrawlerConfigBuilder::new()
            .domain_allowlist(vec!["http://a.example".into()])
            .seed_urls(vec!["http://a.example/".into()])
            .output_sink(OutputSink::File)
            .build();
        assert!(result.is_err());
    }
}
