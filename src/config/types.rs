//! Configuration data struct (spec §6).
//!
//! Grounded on the donor's `config::types::CrawlConfig` — a plain struct
//! with crate-visible fields, a `Default` impl documenting each default,
//! and no validation logic of its own (validation lives in the builder).

use crate::url::Domain;
use std::collections::HashMap;
use std::iter::Peekable;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSink {
    Console,
    File,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    MemoryOnly,
    FileBacked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsVerificationMode {
    Full,
    Certificate,
    None,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct HostCredential {
    pub username: String,
    pub password: String,
}

/// A single `url_filters` entry for a domain's extraction ruleset (spec §4.7).
#[derive(Debug, Clone)]
pub enum UrlFilterRule {
    Begins(String),
    Ends(String),
    Contains(String),
    Regex(String),
}

#[derive(Debug, Clone, Default)]
pub struct DomainExtractionRules {
    pub url_filters: Vec<UrlFilterRule>,
    /// Field name -> CSS selector, applied to HTML results only.
    pub field_selectors: HashMap<String, String>,
}

/// Seed URLs as an iterable of strings, parsed lazily on consumption (spec
/// §6 `seed_urls`): the coordinator never materializes the full set, since
/// it may in principle be an unbounded sequence. Wraps a boxed iterator
/// behind a mutex and a peek buffer so `build()` can confirm at least one
/// seed exists without consuming it.
pub struct SeedUrls {
    iter: Mutex<Peekable<Box<dyn Iterator<Item = String> + Send>>>,
}

impl SeedUrls {
    #[must_use]
    pub fn from_vec(urls: Vec<String>) -> Self {
        Self::from_iter(urls.into_iter())
    }

    pub fn from_iter(iter: impl Iterator<Item = String> + Send + 'static) -> Self {
        let boxed: Box<dyn Iterator<Item = String> + Send> = Box::new(iter);
        Self {
            iter: Mutex::new(boxed.peekable()),
        }
    }

    /// True if no seed remains. Peeks without consuming.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter
            .lock()
            .expect("seed iterator mutex poisoned")
            .peek()
            .is_none()
    }

    /// Pulls the next seed, if any.
    pub fn next(&self) -> Option<String> {
        self.iter.lock().expect("seed iterator mutex poisoned").next()
    }
}

impl Default for SeedUrls {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

/// Every recognized configuration option from spec §6.
pub struct CrawlerConfig {
    pub(crate) crawl_id: String,
    pub(crate) domain_allowlist: Vec<Domain>,
    pub(crate) seed_urls: SeedUrls,
    pub(crate) sitemap_urls: Vec<String>,
    pub(crate) user_agent: String,

    pub(crate) output_sink: OutputSink,
    pub(crate) output_dir: Option<String>,

    pub(crate) url_queue: QueueBackend,
    pub(crate) url_queue_size_limit: usize,

    pub(crate) max_duration: Duration,
    pub(crate) max_crawl_depth: u32,
    pub(crate) max_unique_url_count: usize,
    pub(crate) max_url_length: usize,
    pub(crate) max_url_segments: usize,
    pub(crate) max_url_params: usize,
    pub(crate) threads_per_crawl: usize,

    pub(crate) max_redirects: u32,
    pub(crate) max_response_size: u64,
    pub(crate) connect_timeout: Duration,
    pub(crate) socket_timeout: Duration,
    pub(crate) request_timeout: Duration,

    pub(crate) max_title_size: usize,
    pub(crate) max_body_size: usize,
    pub(crate) max_keywords_size: usize,
    pub(crate) max_description_size: usize,
    pub(crate) max_extracted_links_count: usize,
    pub(crate) max_indexed_links_count: usize,
    pub(crate) max_headings_count: usize,

    pub(crate) content_extraction_enabled: bool,
    pub(crate) content_extraction_mime_types: Vec<String>,

    pub(crate) default_encoding: String,
    pub(crate) compression_enabled: bool,
    pub(crate) sitemap_discovery_disabled: bool,
    pub(crate) head_requests_enabled: bool,

    pub(crate) ssl_ca_certificates: Vec<String>,
    pub(crate) ssl_verification_mode: TlsVerificationMode,

    pub(crate) http_proxy: Option<ProxyConfig>,

    pub(crate) loopback_allowed: bool,
    pub(crate) private_networks_allowed: bool,

    pub(crate) http_auth_allowed: bool,
    pub(crate) auth: HashMap<String, HostCredential>,

    pub(crate) domains_extraction_rules: HashMap<String, DomainExtractionRules>,

    pub(crate) stats_dump_interval: Duration,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            crawl_id: String::new(),
            domain_allowlist: Vec::new(),
            seed_urls: SeedUrls::default(),
            sitemap_urls: Vec::new(),
            user_agent: format!("Elastic-Crawler/{}", env!("CARGO_PKG_VERSION")),

            output_sink: OutputSink::Console,
            output_dir: None,

            url_queue: QueueBackend::MemoryOnly,
            url_queue_size_limit: 100_000,

            max_duration: Duration::from_secs(86_400),
            max_crawl_depth: 10,
            max_unique_url_count: 100_000,
            max_url_length: 2048,
            max_url_segments: 16,
            max_url_params: 32,
            threads_per_crawl: 10,

            max_redirects: 10,
            max_response_size: 10 * 1024 * 1024,
            connect_timeout: Duration::from_secs(10),
            socket_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),

            max_title_size: 1024,
            max_body_size: 5 * 1024 * 1024,
            max_keywords_size: 512,
            max_description_size: 1024,
            max_extracted_links_count: 1000,
            max_indexed_links_count: 25,
            max_headings_count: 25,

            content_extraction_enabled: false,
            content_extraction_mime_types: Vec::new(),

            default_encoding: "UTF-8".to_string(),
            compression_enabled: true,
            sitemap_discovery_disabled: false,
            head_requests_enabled: false,

            ssl_ca_certificates: Vec::new(),
            ssl_verification_mode: TlsVerificationMode::Full,

            http_proxy: None,

            loopback_allowed: false,
            private_networks_allowed: false,

            http_auth_allowed: false,
            auth: HashMap::new(),

            domains_extraction_rules: HashMap::new(),

            stats_dump_interval: Duration::from_secs(30),
        }
    }
}
