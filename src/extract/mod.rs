//! Content-type dispatch and extraction pipeline (spec §4.7).

pub mod html;
pub mod rules;

use crate::config::CrawlerConfig;
use crate::error::{CrawlError, FailureKind};
use crate::http::FetchedResponse;
use crate::types::{
    ContentExtractableFilePayload, CrawlResult, ErrorCategory, RedirectPayload, ResultCommon,
    SuccessKind,
};
use crate::url::NormalizedUrl;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use html::{filter_links, DiscoveredLink};

/// What to do with a fetched response, and what its children (if any) are.
pub struct Extraction {
    pub result: CrawlResult,
    pub discovered_links: Vec<DiscoveredLink>,
}

fn is_html_content_type(ct: &str) -> bool {
    ct.starts_with("text/html") || ct.starts_with("application/xhtml+xml")
}

fn is_sitemap_content_type(ct: &str) -> bool {
    ct.starts_with("application/xml") || ct.starts_with("text/xml") || ct.contains("sitemap")
}

/// Dispatches a fetched response to the right extraction path and produces
/// a `CrawlResult` plus any links discovered for further enqueueing.
#[must_use]
pub fn dispatch(
    response: &FetchedResponse,
    base: &NormalizedUrl,
    config: &CrawlerConfig,
    start_time: DateTime<Utc>,
) -> Extraction {
    let content_type = response.content_type.clone().unwrap_or_default();
    let end_time = Utc::now();
    let common = |kind_content_type: Option<String>| ResultCommon {
        id: Uuid::new_v4(),
        url: response.final_url.clone(),
        status_code: response.status,
        content_type: kind_content_type,
        start_time,
        end_time,
        duration_ms: (end_time - start_time).num_milliseconds().max(0) as u64,
    };

    if (300..400).contains(&response.status) {
        Extraction {
            result: CrawlResult::Success {
                common: common(None),
                kind: SuccessKind::Redirect(RedirectPayload {
                    final_url: response.final_url.clone(),
                }),
            },
            discovered_links: Vec::new(),
        }
    } else if is_html_content_type(&content_type) {
        let text = html::decode_body(
            &response.body,
            response.content_type.as_deref(),
            config.default_encoding(),
        );
        let extraction = html::extract(&text, base, config);
        Extraction {
            result: CrawlResult::Success {
                common: common(Some(content_type)),
                kind: SuccessKind::Html(extraction.payload),
            },
            discovered_links: extraction.discovered_links,
        }
    } else if is_sitemap_content_type(&content_type) {
        let parsed = crate::sitemap::parse_sitemap(&response.body, crate::sitemap::MAX_SITEMAP_BYTES);
        Extraction {
            result: CrawlResult::Success {
                common: common(Some(content_type)),
                kind: SuccessKind::Sitemap {
                    discovered_urls: parsed.tasks.len(),
                },
            },
            discovered_links: Vec::new(),
        }
    } else if config.content_extraction_enabled()
        && config
            .content_extraction_mime_types()
            .iter()
            .any(|m| content_type.starts_with(m.as_str()))
    {
        Extraction {
            result: CrawlResult::Success {
                common: common(Some(content_type)),
                kind: SuccessKind::ContentExtractableFile(ContentExtractableFilePayload {
                    bytes: response.body.to_vec(),
                }),
            },
            discovered_links: Vec::new(),
        }
    } else {
        let err = CrawlError::UnsupportedContentType(content_type.clone());
        Extraction {
            result: CrawlResult::Error {
                common: common(Some(content_type)),
                category: ErrorCategory::UnsupportedContentType,
                message: err.to_string(),
            },
            discovered_links: Vec::new(),
        }
    }
}

/// Maps a fetch-time [`CrawlError`] into an `Error` result record (spec
/// §4.8's per-task error handling).
#[must_use]
pub fn error_result(
    url: String,
    err: &CrawlError,
    start_time: DateTime<Utc>,
    status_code: Option<u16>,
) -> CrawlResult {
    let category = match err.failure_kind() {
        FailureKind::Fatal => ErrorCategory::Fatal,
        _ => ErrorCategory::Transient,
    };
    CrawlResult::error(url, category, err.to_string(), start_time, status_code)
}
