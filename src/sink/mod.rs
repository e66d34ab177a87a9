//! Output sink interface (spec §6: "emit(Result) — must be safe for
//! concurrent calls if the engine is configured with more than one
//! emitter"). Concrete sink implementations (file/HTTP push) are out of
//! scope (spec §1); only the abstract interface plus a minimal console
//! default are implemented here, grounded on the donor's `log`/`tracing`
//! usage for structured output.

use crate::types::CrawlResult;
use async_trait::async_trait;

#[async_trait]
pub trait Sink: Send + Sync {
    async fn emit(&self, result: CrawlResult);
}

/// Writes each result as a single JSON line to stdout via `tracing::info!`.
/// Safe for concurrent calls: `tracing` serializes its own writer.
pub struct ConsoleSink;

#[async_trait]
impl Sink for ConsoleSink {
    async fn emit(&self, result: CrawlResult) {
        match serde_json::to_string(&result) {
            Ok(line) => tracing::info!(target: "crawlkit::sink", "{line}"),
            Err(err) => tracing::warn!(target: "crawlkit::sink", "failed to serialize result: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CrawlResult, ErrorCategory};
    use chrono::Utc;

    #[tokio::test]
    async fn console_sink_does_not_panic_on_emit() {
        let sink = ConsoleSink;
        let result = CrawlResult::error(
            "https://a.example/".into(),
            ErrorCategory::Transient,
            "boom".into(),
            Utc::now(),
            None,
        );
        sink.emit(result).await;
    }
}
