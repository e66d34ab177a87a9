//! Per-domain extraction ruleset: compiled `url_filters` and field
//! extraction (spec §4.7).
//!
//! Grounded on `examples/cyrup-ai-kodegen-tools-citescrape/src/crawl_engine/crawler.rs`'s
//! `should_visit_url`/`extract_valid_urls` free functions (path/pattern
//! filtering logic), generalized here into the anchored-regex compilation
//! spec §4.7 specifies instead of the donor's plain substring/prefix checks.

use crate::config::{DomainExtractionRules, UrlFilterRule};
use regex::Regex;

/// A compiled `url_filters` entry, ready to match against a normalized URL.
pub struct CompiledFilter {
    regex: Regex,
}

impl CompiledFilter {
    pub fn compile(domain: &str, rule: &UrlFilterRule) -> Option<Self> {
        let domain_quoted = regex::escape(domain);
        let pattern = match rule {
            UrlFilterRule::Begins(p) => format!("\\A{domain_quoted}{}", star_to_dotstar(p)),
            UrlFilterRule::Ends(p) => {
                format!("\\A{domain_quoted}.*{}\\z", star_to_dotstar(p))
            }
            UrlFilterRule::Contains(p) => {
                format!("\\A{domain_quoted}.*{}", star_to_dotstar(p))
            }
            UrlFilterRule::Regex(p) => p.clone(),
        };
        Regex::new(&pattern).ok().map(|regex| Self { regex })
    }

    #[must_use]
    pub fn is_match(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }
}

/// Escapes everything except `*`, which becomes `.*` (spec §4.7).
fn star_to_dotstar(pattern: &str) -> String {
    pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}

/// A domain's compiled ruleset.
pub struct CompiledDomainRules {
    pub url_filters: Vec<CompiledFilter>,
}

impl CompiledDomainRules {
    #[must_use]
    pub fn compile(domain: &str, rules: &DomainExtractionRules) -> Self {
        let url_filters = rules
            .url_filters
            .iter()
            .filter_map(|r| CompiledFilter::compile(domain, r))
            .collect();
        Self { url_filters }
    }

    /// A task is retained only if it matches at least one allow filter, or
    /// no filters are configured at all (spec §4.7).
    #[must_use]
    pub fn allows(&self, url: &str) -> bool {
        self.url_filters.is_empty() || self.url_filters.iter().any(|f| f.is_match(url))
    }
}
