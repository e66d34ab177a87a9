//! Per-authority robots.txt fetch, cache, and Allow/Disallow decisions
//! (spec §4.4), wrapping the `texting_robots` crate (one of the example
//! repos this crate is built from) for the actual parse, and adding the
//! caching/single-flight/retry/fallback policy spec §4.4–§5 describes
//! around it.

use crate::error::CrawlError;
use crate::http::HttpClient;
use crate::url::Domain;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use texting_robots::Robot;
use tokio::sync::broadcast;
use tokio::time::sleep;

/// (authority, fetched_at, rules, sitemap_urls, is_fallback) — spec §3.
pub struct RobotsRecord {
    pub authority: Domain,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub is_fallback: bool,
    robot: Robot,
}

impl RobotsRecord {
    fn allow_all(authority: Domain) -> Self {
        let robot = Robot::new("*", b"User-agent: *\nAllow: /")
            .expect("a minimal allow-all robots body always parses");
        Self {
            authority,
            fetched_at: chrono::Utc::now(),
            is_fallback: true,
            robot,
        }
    }

    fn parsed(authority: Domain, user_agent: &str, body: &[u8]) -> Option<Self> {
        let robot = Robot::new(user_agent, body).ok()?;
        Some(Self {
            authority,
            fetched_at: chrono::Utc::now(),
            is_fallback: false,
            robot,
        })
    }

    #[must_use]
    pub fn allowed(&self, url: &str) -> bool {
        self.robot.allowed(url)
    }

    #[must_use]
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.robot.delay.map(|secs| Duration::from_secs(u64::from(secs)))
    }

    #[must_use]
    pub fn sitemap_urls(&self) -> &[String] {
        &self.robot.sitemaps
    }
}

enum SlotState {
    Pending(broadcast::Sender<()>),
    Ready(Arc<RobotsRecord>),
}

/// Per-authority single-flight cache: the first caller for an authority
/// fetches and parses; concurrent callers await the same outcome instead of
/// issuing their own requests (spec §5).
pub struct RobotsService {
    http: Arc<HttpClient>,
    user_agent: String,
    cache: DashMap<String, SlotState>,
}

impl RobotsService {
    #[must_use]
    pub fn new(http: Arc<HttpClient>, user_agent: impl Into<String>) -> Self {
        Self {
            http,
            user_agent: user_agent.into(),
            cache: DashMap::new(),
        }
    }

    fn key(authority: &Domain) -> String {
        format!("{authority}")
    }

    /// Returns the cached or freshly fetched record for `authority`,
    /// coordinating a single in-flight fetch per key.
    pub async fn get(&self, authority: &Domain) -> Arc<RobotsRecord> {
        let key = Self::key(authority);

        loop {
            let maybe_wait = match self.cache.get(&key) {
                Some(slot) => match &*slot {
                    SlotState::Ready(record) => return record.clone(),
                    SlotState::Pending(tx) => Some(tx.subscribe()),
                },
                None => None,
            };

            if let Some(mut rx) = maybe_wait {
                drop(rx.recv().await);
                continue;
            }

            // No entry yet: try to become the fetcher.
            use dashmap::mapref::entry::Entry;
            let became_fetcher = match self.cache.entry(key.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(v) => {
                    let (tx, _rx) = broadcast::channel(1);
                    v.insert(SlotState::Pending(tx));
                    true
                }
            };

            if !became_fetcher {
                continue;
            }

            let record = Arc::new(self.fetch_with_retry(authority).await);
            if let Some(mut slot) = self.cache.get_mut(&key) {
                if let SlotState::Pending(tx) = &*slot {
                    let _ = tx.send(());
                }
                *slot = SlotState::Ready(record.clone());
            }
            return record;
        }
    }

    async fn fetch_with_retry(&self, authority: &Domain) -> RobotsRecord {
        let url = format!("{authority}/robots.txt");
        let mut attempt = 0u32;
        loop {
            match self.http.fetch_robots_txt(&url).await {
                Ok(body) => {
                    if let Some(record) =
                        RobotsRecord::parsed(authority.clone(), &self.user_agent, &body)
                    {
                        return record;
                    }
                    return RobotsRecord::allow_all(authority.clone());
                }
                Err(CrawlError::ConnectionError(_) | CrawlError::TimeoutError(_))
                    if attempt < 2 =>
                {
                    attempt += 1;
                    sleep(Duration::from_millis(200 * 2u64.pow(attempt))).await;
                }
                Err(_) => return RobotsRecord::allow_all(authority.clone()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_all_permits_everything() {
        let record = RobotsRecord::allow_all(Domain {
            scheme: "http".into(),
            host: "a.example".into(),
            port: 80,
        });
        assert!(record.is_fallback);
        assert!(record.allowed("http://a.example/anything"));
    }

    #[test]
    fn disallow_all_blocks_path() {
        let record = RobotsRecord::parsed(
            Domain {
                scheme: "http".into(),
                host: "a.example".into(),
                port: 80,
            },
            "*",
            b"User-agent: *\nDisallow: /",
        )
        .unwrap();
        assert!(!record.allowed("http://a.example/x"));
    }

    #[test]
    fn exposes_sitemap_urls() {
        let record = RobotsRecord::parsed(
            Domain {
                scheme: "http".into(),
                host: "a.example".into(),
                port: 80,
            },
            "*",
            b"Sitemap: http://a.example/sitemap.xml\nUser-agent: *\nAllow: /",
        )
        .unwrap();
        assert_eq!(record.sitemap_urls(), &["http://a.example/sitemap.xml"]);
    }
}
