//! `&self` accessors for `CrawlerConfig`, grounded on the donor's
//! `config::types` accessor methods (e.g. `excluded_patterns_compiled()`).

use super::types::{
    CrawlerConfig, DomainExtractionRules, OutputSink, ProxyConfig, QueueBackend, SeedUrls,
    TlsVerificationMode,
};
use crate::url::Domain;
use std::collections::HashMap;
use std::time::Duration;

impl CrawlerConfig {
    #[must_use]
    pub fn crawl_id(&self) -> &str {
        &self.crawl_id
    }

    #[must_use]
    pub fn domain_allowlist(&self) -> &[Domain] {
        &self.domain_allowlist
    }

    #[must_use]
    pub fn seed_urls(&self) -> &SeedUrls {
        &self.seed_urls
    }

    #[must_use]
    pub fn sitemap_urls(&self) -> &[String] {
        &self.sitemap_urls
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn output_sink(&self) -> OutputSink {
        self.output_sink
    }

    #[must_use]
    pub fn output_dir(&self) -> Option<&str> {
        self.output_dir.as_deref()
    }

    #[must_use]
    pub fn url_queue(&self) -> QueueBackend {
        self.url_queue
    }

    #[must_use]
    pub fn url_queue_size_limit(&self) -> usize {
        self.url_queue_size_limit
    }

    #[must_use]
    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    #[must_use]
    pub fn max_crawl_depth(&self) -> u32 {
        self.max_crawl_depth
    }

    #[must_use]
    pub fn max_unique_url_count(&self) -> usize {
        self.max_unique_url_count
    }

    #[must_use]
    pub fn url_limits(&self) -> crate::url::UrlLimits {
        crate::url::UrlLimits {
            max_url_length: self.max_url_length,
            max_url_segments: self.max_url_segments,
            max_url_params: self.max_url_params,
        }
    }

    #[must_use]
    pub fn threads_per_crawl(&self) -> usize {
        self.threads_per_crawl
    }

    #[must_use]
    pub fn max_redirects(&self) -> u32 {
        self.max_redirects
    }

    #[must_use]
    pub fn max_response_size(&self) -> u64 {
        self.max_response_size
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    #[must_use]
    pub fn socket_timeout(&self) -> Duration {
        self.socket_timeout
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub fn max_title_size(&self) -> usize {
        self.max_title_size
    }

    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    #[must_use]
    pub fn max_keywords_size(&self) -> usize {
        self.max_keywords_size
    }

    #[must_use]
    pub fn max_description_size(&self) -> usize {
        self.max_description_size
    }

    #[must_use]
    pub fn max_extracted_links_count(&self) -> usize {
        self.max_extracted_links_count
    }

    #[must_use]
    pub fn max_indexed_links_count(&self) -> usize {
        self.max_indexed_links_count
    }

    #[must_use]
    pub fn max_headings_count(&self) -> usize {
        self.max_headings_count
    }

    #[must_use]
    pub fn content_extraction_enabled(&self) -> bool {
        self.content_extraction_enabled
    }

    #[must_use]
    pub fn content_extraction_mime_types(&self) -> &[String] {
        &self.content_extraction_mime_types
    }

    #[must_use]
    pub fn default_encoding(&self) -> &str {
        &self.default_encoding
    }

    #[must_use]
    pub fn compression_enabled(&self) -> bool {
        self.compression_enabled
    }

    #[must_use]
    pub fn sitemap_discovery_disabled(&self) -> bool {
        self.sitemap_discovery_disabled
    }

    #[must_use]
    pub fn head_requests_enabled(&self) -> bool {
        self.head_requests_enabled
    }

    #[must_use]
    pub fn ssl_ca_certificates(&self) -> &[String] {
        &self.ssl_ca_certificates
    }

    #[must_use]
    pub fn ssl_verification_mode(&self) -> TlsVerificationMode {
        self.ssl_verification_mode
    }

    #[must_use]
    pub fn http_proxy(&self) -> Option<&ProxyConfig> {
        self.http_proxy.as_ref()
    }

    #[must_use]
    pub fn loopback_allowed(&self) -> bool {
        self.loopback_allowed
    }

    #[must_use]
    pub fn private_networks_allowed(&self) -> bool {
        self.private_networks_allowed
    }

    #[must_use]
    pub fn http_auth_allowed(&self) -> bool {
        self.http_auth_allowed
    }

    #[must_use]
    pub fn auth(&self) -> &HashMap<String, super::types::HostCredential> {
        &self.auth
    }

    #[must_use]
    pub fn domains_extraction_rules(&self) -> &HashMap<String, DomainExtractionRules> {
        &self.domains_extraction_rules
    }

    #[must_use]
    pub fn stats_dump_interval(&self) -> Duration {
        self.stats_dump_interval
    }

    #[must_use]
    pub fn dns_filter_policy(&self) -> crate::dns::DnsFilterPolicy {
        crate::dns::DnsFilterPolicy {
            loopback_allowed: self.loopback_allowed,
            private_networks_allowed: self.private_networks_allowed,
        }
    }

    /// Whether `domain` (scheme+host+port) may be fetched: explicit
    /// allowlist membership, per spec §9's resolved open question seeds
    /// are auto-allowlisted by the coordinator at seeding time, not here.
    #[must_use]
    pub fn is_domain_allowed(&self, domain: &Domain) -> bool {
        self.domain_allowlist.contains(domain)
    }
}
