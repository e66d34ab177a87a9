//! Configuration surface (spec §6), split the way the donor crate splits
//! `config::{types, builder, getters}`.

mod builder;
mod getters;
mod types;

pub use builder::CrawlerConfigBuilder;
pub use types::{
    CrawlerConfig, DomainExtractionRules, HostCredential, OutputSink, ProxyConfig, QueueBackend,
    SeedUrls, TlsVerificationMode, UrlFilterRule,
};
