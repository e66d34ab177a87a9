//! Crate-wide error type and failure classification.
//!
//! Grounded on the donor crate's `crawl_engine::crawl_types::CrawlError` /
//! `FailureKind` pair, but expressed as a single `thiserror` enum instead of
//! a hand-rolled `Display` impl plus a second string-sniffing classifier —
//! since every variant here is already typed, classification is a match,
//! not a substring search.

use std::fmt;
use thiserror::Error;

/// Every error kind named in the crawl engine's error handling design.
#[derive(Debug, Error, Clone)]
pub enum CrawlError {
    /// Fatal at startup: bad or missing configuration.
    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid host: {0}")]
    InvalidHost(String),

    #[error("dns resolution failed: {0}")]
    DnsFailure(String),

    #[error("connection failed: {0}")]
    ConnectionError(String),

    #[error("request timed out: {0}")]
    TimeoutError(String),

    #[error("tls error: {0}")]
    TlsError(String),

    #[error("too many redirects (limit {limit})")]
    TooManyRedirects { limit: u32 },

    #[error("response size exceeded cap of {cap_bytes} bytes")]
    ResponseSizeExceeded { cap_bytes: u64 },

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("parser error: {0}")]
    ParserError(String),

    #[error("proxy error: {0}")]
    ProxyError(String),

    /// Not a true error: the robots record forbids this URL. Carried as a
    /// drop reason, never emitted as a `CrawlResult::Error`.
    #[error("disallowed by robots.txt")]
    RobotsDisallowed,

    /// Transient: the queue is at `url_queue_size_limit`.
    #[error("queue is full")]
    QueueFullError,

    /// Drop: task depth exceeds `max_crawl_depth`.
    #[error("depth exceeded")]
    DepthExceeded,

    /// Drop: fingerprint already present in the visited set.
    #[error("duplicate url")]
    DuplicateUrl,

    /// Terminal: `max_unique_url_count` reached.
    #[error("budget exhausted")]
    BudgetExhausted,

    /// Operation was cancelled via the coordinator's stop signal.
    #[error("crawl cancelled")]
    Cancelled,
}

pub type CrawlResult<T> = Result<T, CrawlError>;

impl From<anyhow::Error> for CrawlError {
    fn from(err: anyhow::Error) -> Self {
        Self::ParserError(format!("{err:#}"))
    }
}

/// How a failure should be treated by the coordinator and the HTTP client.
///
/// Distinguishes terminal conditions (stop the whole crawl), drops (no
/// result record, counted only as an event), and per-task errors that
/// become an `Error` result but never halt the crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Recorded as an `Error` result; the task is not retried by the
    /// coordinator (the HTTP client already retried internally).
    Transient,
    /// Recorded as an `Error` result with `FATAL_ERROR_STATUS`; never retried.
    Fatal,
    /// Not recorded as a result; counted as a drop event only.
    Drop,
    /// Transitions the coordinator to `Draining`.
    Terminal,
}

impl CrawlError {
    #[must_use]
    pub const fn failure_kind(&self) -> FailureKind {
        match self {
            Self::ConnectionError(_)
            | Self::TimeoutError(_)
            | Self::DnsFailure(_)
            | Self::TooManyRedirects { .. }
            | Self::ResponseSizeExceeded { .. }
            | Self::ProxyError(_)
            | Self::UnsupportedContentType(_)
            | Self::ParserError(_) => FailureKind::Transient,
            Self::TlsError(_) | Self::InvalidHost(_) | Self::InvalidUrl(_) => FailureKind::Fatal,
            Self::RobotsDisallowed | Self::DepthExceeded | Self::DuplicateUrl => {
                FailureKind::Drop
            }
            Self::QueueFullError => FailureKind::Transient,
            Self::BudgetExhausted | Self::ConfigError(_) | Self::Cancelled => {
                FailureKind::Terminal
            }
        }
    }

    #[must_use]
    pub const fn is_drop(&self) -> bool {
        matches!(self.failure_kind(), FailureKind::Drop)
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self.failure_kind(), FailureKind::Terminal)
    }
}

/// Status sentinel used on `CrawlResult::Error` records, distinct from any
/// real HTTP status code (spec §3: "FATAL_ERROR_STATUS").
pub const FATAL_ERROR_STATUS: u16 = 0;

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Fatal => write!(f, "fatal"),
            Self::Drop => write!(f, "drop"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_kinds_stop_the_crawl() {
        assert!(CrawlError::BudgetExhausted.is_terminal());
        assert!(!CrawlError::ConnectionError("x".into()).is_terminal());
    }

    #[test]
    fn drops_are_not_errors() {
        assert!(CrawlError::RobotsDisallowed.is_drop());
        assert!(CrawlError::DepthExceeded.is_drop());
        assert!(CrawlError::DuplicateUrl.is_drop());
    }

    #[test]
    fn tls_errors_are_fatal_never_retried() {
        assert_eq!(
            CrawlError::TlsError("bad cert".into()).failure_kind(),
            FailureKind::Fatal
        );
    }
}
