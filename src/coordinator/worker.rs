//! Per-worker loop: dequeue → robots-check → fetch → extract → emit →
//! enqueue-children (spec §4.8 "Running").

use super::Shared;
use crate::events::{CrawlEvent, DropReason};
use crate::extract;
use crate::queue::{CrawlTask, DiscoveredVia, EnqueueOutcome};
use crate::types::CrawlResult;
use crate::url::NormalizedUrl;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

pub(super) async fn run_worker(shared: Arc<Shared>) {
    loop {
        if shared.stop_requested.load(Ordering::SeqCst) {
            return;
        }
        let Some(entry) = shared.queue.dequeue().await else {
            return;
        };
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        process_task(&shared, entry.task).await;
        shared.in_flight.fetch_sub(1, Ordering::SeqCst);

        if shared.in_flight.load(Ordering::SeqCst) == 0 && shared.queue.is_empty() {
            shared.queue.close();
        }
        if shared.queue.visited_count() >= shared.config.max_unique_url_count() {
            shared.set_termination_reason(crate::events::TerminationReason::BudgetExhausted);
            shared.stop_requested.store(true, Ordering::SeqCst);
            shared.queue.close();
        }
    }
}

async fn process_task(shared: &Arc<Shared>, task: CrawlTask) {
    let start = chrono::Utc::now();

    let Ok(url) = NormalizedUrl::parse(&task.url, &shared.url_limits) else {
        return;
    };

    if task.depth > shared.config.max_crawl_depth() {
        shared.events.publish(CrawlEvent::UrlDrop {
            url: task.url.clone(),
            reason: DropReason::DepthExceeded,
        });
        return;
    }

    let Some(authority) = url.authority() else {
        return;
    };

    let robots = shared.robots.get(&authority).await;
    if !robots.is_fallback {
        shared.events.publish(CrawlEvent::RobotsFetched {
            authority: authority.to_string(),
            is_fallback: false,
        });
    }
    if !robots.allowed(url.as_str()) {
        shared.events.publish(CrawlEvent::UrlDrop {
            url: task.url.clone(),
            reason: DropReason::RobotsDisallowed,
        });
        return;
    }

    pace(shared, &authority, robots.crawl_delay()).await;

    shared.events.publish(CrawlEvent::UrlFetchStart {
        url: task.url.clone(),
        at: start,
    });

    match shared.http.get(url.as_str()).await {
        Ok(response) => {
            let bytes = response.body.len() as u64;
            let extraction = extract::dispatch(&response, &url, &shared.config, start);
            let result_kind = match &extraction.result {
                CrawlResult::Success {
                    kind: crate::types::SuccessKind::Html(_),
                    ..
                } => "html",
                CrawlResult::Success {
                    kind: crate::types::SuccessKind::Sitemap { .. },
                    ..
                } => "sitemap",
                CrawlResult::Success {
                    kind: crate::types::SuccessKind::ContentExtractableFile(_),
                    ..
                } => "content_extractable_file",
                CrawlResult::Success {
                    kind: crate::types::SuccessKind::Redirect(_),
                    ..
                } => "redirect",
                CrawlResult::Error { .. } => "error",
            }
            .to_string();
            shared.events.publish(CrawlEvent::UrlFetchEnd {
                url: task.url.clone(),
                result_kind,
                status: response.status,
                bytes,
                at: chrono::Utc::now(),
            });

            shared.stats.record_page_visited(bytes);
            shared
                .stats
                .record_duration(extraction.result.common().duration_ms);
            if extraction.result.is_error() {
                if let CrawlResult::Error { category, .. } = &extraction.result {
                    shared.stats.record_error(&format!("{category:?}"));
                }
            }

            enqueue_children(shared, &task, &url, &extraction.discovered_links).await;

            shared.sink.emit(extraction.result).await;
        }
        Err(err) => {
            shared.stats.record_error(&format!("{:?}", err.failure_kind()));
            let result = extract::error_result(task.url.clone(), &err, start, None);
            shared.events.publish(CrawlEvent::Error {
                kind: format!("{err}"),
                url: task.url.clone(),
            });
            shared.sink.emit(result).await;
        }
    }
}

async fn pace(shared: &Arc<Shared>, authority: &crate::url::Domain, delay: Option<std::time::Duration>) {
    let Some(delay) = delay else { return };
    let key = authority.to_string();
    let slot = shared
        .authority_pacing
        .entry(key)
        .or_insert_with(|| Arc::new(AsyncMutex::new(Instant::now() - delay)))
        .clone();
    let mut last = slot.lock().await;
    let ready_at = *last + delay;
    let now = Instant::now();
    if ready_at > now {
        tokio::time::sleep(ready_at - now).await;
    }
    *last = Instant::now();
}

async fn enqueue_children(
    shared: &Arc<Shared>,
    parent: &CrawlTask,
    base: &NormalizedUrl,
    links: &[extract::DiscoveredLink],
) {
    if links.is_empty() {
        return;
    }
    shared.stats.record_links_extracted(links.len() as u64);

    let domain_rules = shared.domain_rules.get(
        base.authority()
            .map(|a| a.to_string())
            .unwrap_or_default()
            .as_str(),
    );

    let resolved: Vec<String> = links
        .iter()
        .filter_map(|l| base.join(&l.href).ok())
        .map(|u| u.to_string())
        .collect();

    let candidates = extract::filter_links(resolved.iter(), &shared.config, &shared.url_limits);

    for child_url in candidates {
        if let Some(rules) = domain_rules {
            if !rules.allows(child_url.as_str()) {
                continue;
            }
        }

        let child_depth = parent.depth + 1;
        if child_depth > shared.config.max_crawl_depth() {
            shared.events.publish(CrawlEvent::UrlDrop {
                url: child_url.to_string(),
                reason: DropReason::DepthExceeded,
            });
            continue;
        }

        if let Some(child_authority) = child_url.authority() {
            let robots = shared.robots.get(&child_authority).await;
            if !robots.allowed(child_url.as_str()) {
                shared.events.publish(CrawlEvent::UrlDrop {
                    url: child_url.to_string(),
                    reason: DropReason::RobotsDisallowed,
                });
                continue;
            }
        }

        let task = CrawlTask {
            url: child_url.to_string(),
            depth: child_depth,
            referer: Some(parent.url.clone()),
            discovered_via: DiscoveredVia::HtmlLink,
        };

        shared.events.publish(CrawlEvent::UrlDiscover {
            from: parent.url.clone(),
            to: child_url.to_string(),
        });

        match shared.queue.enqueue(child_url.fingerprint(), task).await {
            EnqueueOutcome::Enqueued => shared.stats.record_links_enqueued(1),
            EnqueueOutcome::Duplicate => {
                shared.events.publish(CrawlEvent::UrlDrop {
                    url: child_url.to_string(),
                    reason: DropReason::Duplicate,
                });
            }
            EnqueueOutcome::RejectedFull => {
                shared.stats.record_error("QueueFullError");
            }
        }
    }
}
