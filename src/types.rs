//! Crawl result and stats data model (spec §3).

use crate::error::FATAL_ERROR_STATUS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    Transient,
    Fatal,
    UnsupportedContentType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCommon {
    pub id: Uuid,
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlPayload {
    pub title: Option<String>,
    pub body: String,
    pub meta_keywords: Option<String>,
    pub meta_description: Option<String>,
    pub headings: Vec<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectPayload {
    pub final_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentExtractableFilePayload {
    pub bytes: Vec<u8>,
}

/// Success sub-variants (spec §3 `CrawlResult`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SuccessKind {
    Html(HtmlPayload),
    Sitemap { discovered_urls: usize },
    ContentExtractableFile(ContentExtractableFilePayload),
    Redirect(RedirectPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CrawlResult {
    Success {
        common: ResultCommon,
        kind: SuccessKind,
    },
    Error {
        common: ResultCommon,
        category: ErrorCategory,
        message: String,
    },
}

impl CrawlResult {
    /// `status_code` is the real HTTP status when one was observed (e.g. a
    /// transient 5xx); fatal errors and errors with no HTTP response use
    /// `FATAL_ERROR_STATUS` (spec §4.8: "Fatal errors: recorded with
    /// FATAL_ERROR_STATUS").
    #[must_use]
    pub fn error(
        url: String,
        category: ErrorCategory,
        message: String,
        start_time: DateTime<Utc>,
        status_code: Option<u16>,
    ) -> Self {
        let end_time = Utc::now();
        let status_code = if category == ErrorCategory::Fatal {
            FATAL_ERROR_STATUS
        } else {
            status_code.unwrap_or(FATAL_ERROR_STATUS)
        };
        Self::Error {
            common: ResultCommon {
                id: Uuid::new_v4(),
                url,
                status_code,
                content_type: None,
                start_time,
                end_time,
                duration_ms: (end_time - start_time).num_milliseconds().max(0) as u64,
            },
            category,
            message,
        }
    }

    #[must_use]
    pub fn common(&self) -> &ResultCommon {
        match self {
            Self::Success { common, .. } | Self::Error { common, .. } => common,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Counters updated from events (spec §3, §4.9).
#[derive(Debug, Default)]
pub struct StatsSnapshot {
    pub pages_visited: u64,
    pub bytes_downloaded: u64,
    pub links_extracted: u64,
    pub links_enqueued: u64,
    pub errors_by_kind: HashMap<String, u64>,
    /// Coarse duration histogram buckets, in milliseconds: <100, <500, <2000, <10000, >=10000.
    pub duration_buckets_ms: [u64; 5],
}

impl StatsSnapshot {
    pub fn record_duration(&mut self, duration_ms: u64) {
        let idx = match duration_ms {
            0..=99 => 0,
            100..=499 => 1,
            500..=1999 => 2,
            2000..=9999 => 3,
            _ => 4,
        };
        self.duration_buckets_ms[idx] += 1;
    }
}
