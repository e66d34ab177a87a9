//! HTML parsing and field extraction (spec §4.7).
//!
//! Grounded on the donor crate's dependency on `scraper`/`ego-tree` for DOM
//! traversal (the donor used it inside `page_extractor` alongside
//! `chromiumoxide`'s live-page extraction; here it is the whole story,
//! since this crate fetches with `reqwest` rather than driving a browser).

use crate::config::CrawlerConfig;
use crate::types::HtmlPayload;
use crate::url::{Domain, NormalizedUrl};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());
static META_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static HEADING_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").unwrap());
static BODY_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());
static NOISE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("script, style, nav").unwrap());
static LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href], link[rel=canonical], area[href]").unwrap());

pub struct DiscoveredLink {
    pub href: String,
}

pub struct HtmlExtraction {
    pub payload: HtmlPayload,
    /// All candidate hrefs, resolved against the document base, before
    /// scheme/allowlist/visited filtering (the coordinator applies those —
    /// this module only knows about document structure).
    pub discovered_links: Vec<DiscoveredLink>,
}

/// Decode `body` using the charset implied by `content_type`, falling back
/// to BOM sniffing and finally `config.default_encoding()`.
#[must_use]
pub fn decode_body(body: &[u8], content_type: Option<&str>, default_encoding: &str) -> String {
    let charset_from_header = content_type.and_then(|ct| {
        ct.split(';')
            .find_map(|part| part.trim().strip_prefix("charset="))
            .map(|c| c.trim_matches('"').to_string())
    });

    let label = charset_from_header
        .or_else(|| sniff_bom(body))
        .unwrap_or_else(|| default_encoding.to_string());

    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .unwrap_or(encoding_rs::UTF_8);
    let (decoded, _, _) = encoding.decode(body);
    decoded.into_owned()
}

fn sniff_bom(body: &[u8]) -> Option<String> {
    if body.starts_with(&[0xEF, 0xBB, 0xBF]) {
        Some("UTF-8".to_string())
    } else if body.starts_with(&[0xFF, 0xFE]) {
        Some("UTF-16LE".to_string())
    } else if body.starts_with(&[0xFE, 0xFF]) {
        Some("UTF-16BE".to_string())
    } else {
        None
    }
}

#[must_use]
pub fn extract(html_text: &str, base: &NormalizedUrl, config: &CrawlerConfig) -> HtmlExtraction {
    let document = Html::parse_document(html_text);

    let title = document
        .select(&TITLE_SEL)
        .next()
        .map(|el| truncate_bytes(el.text().collect::<String>().trim(), config.max_title_size()));

    let mut meta_keywords = None;
    let mut meta_description = None;
    for meta in document.select(&META_SEL) {
        let name = meta.value().attr("name").unwrap_or_default().to_lowercase();
        if let Some(content) = meta.value().attr("content") {
            if name == "keywords" && meta_keywords.is_none() {
                meta_keywords = Some(truncate_bytes(content, config.max_keywords_size()));
            } else if name == "description" && meta_description.is_none() {
                meta_description = Some(truncate_bytes(content, config.max_description_size()));
            }
        }
    }

    let headings: Vec<String> = document
        .select(&HEADING_SEL)
        .take(config.max_headings_count())
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect();

    let body = extract_body_text(&document, config.max_body_size());

    let mut discovered_links = Vec::new();
    for el in document.select(&LINK_SEL) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if href.is_empty() {
            continue;
        }
        if discovered_links.len() >= config.max_extracted_links_count() {
            break;
        }
        discovered_links.push(DiscoveredLink {
            href: href.to_string(),
        });
    }

    let resolved_links: Vec<String> = discovered_links
        .iter()
        .filter_map(|l| base.join(&l.href).ok())
        .map(|u| u.to_string())
        .take(config.max_indexed_links_count())
        .collect();

    HtmlExtraction {
        payload: HtmlPayload {
            title,
            body,
            meta_keywords,
            meta_description,
            headings,
            links: resolved_links,
        },
        discovered_links,
    }
}

fn extract_body_text(document: &Html, max_body_size: usize) -> String {
    let Some(body_el) = document.select(&BODY_SEL).next() else {
        return String::new();
    };
    let noisy: std::collections::HashSet<_> = document
        .select(&NOISE_SEL)
        .map(|el| el.id())
        .collect();

    let mut out = String::new();
    for node in body_el.descendants() {
        if let Some(text) = node.value().as_text() {
            let ancestor_is_noise = node
                .ancestors()
                .any(|a| noisy.contains(&a.id()));
            if !ancestor_is_noise {
                out.push_str(text);
                out.push(' ');
            }
        }
        if out.len() >= max_body_size {
            break;
        }
    }
    truncate_bytes(out.trim(), max_body_size)
}

fn truncate_bytes(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Filters discovered links per spec §4.7: scheme, allowlist. Already-visited
/// fingerprints are dropped later by the queue's own dedup on enqueue.
pub fn filter_links<'a>(
    links: impl Iterator<Item = &'a String>,
    config: &CrawlerConfig,
    limits: &crate::url::UrlLimits,
) -> Vec<NormalizedUrl> {
    links
        .filter_map(|href| NormalizedUrl::parse(href, limits).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .filter(|u| {
            u.authority()
                .map(|a: Domain| config.is_domain_allowed(&a))
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlerConfigBuilder;

    fn cfg() -> CrawlerConfig {
        CrawlerConfigBuilder::new()
            .domain_allowlist(vec!["https://a.example".into()])
            .seed_urls(vec!["https://a.example/".into()])
            .build()
            .unwrap()
    }

    fn base() -> NormalizedUrl {
        NormalizedUrl::parse("https://a.example/", &crate::url::UrlLimits::default()).unwrap()
    }

    #[test]
    fn extracts_title_and_headings() {
        let html = "<html><head><title> Hello </title></head><body><h1>One</h1><h2>Two</h2></body></html>";
        let result = extract(html, &base(), &cfg());
        assert_eq!(result.payload.title.as_deref(), Some("Hello"));
        assert_eq!(result.payload.headings, vec!["One", "Two"]);
    }

    #[test]
    fn extracts_meta_keywords_and_description() {
        let html = r#"<html><head>
            <meta name="keywords" content="rust, crawler">
            <meta name="description" content="a test page">
        </head><body></body></html>"#;
        let result = extract(html, &base(), &cfg());
        assert_eq!(result.payload.meta_keywords.as_deref(), Some("rust, crawler"));
        assert_eq!(result.payload.meta_description.as_deref(), Some("a test page"));
    }

    #[test]
    fn resolves_relative_links_against_base() {
        let html = r#"<html><body><a href="/b">b</a><a href="https://other.example/x">x</a></body></html>"#;
        let result = extract(html, &base(), &cfg());
        assert!(result.payload.links.contains(&"https://a.example/b".to_string()));
        assert!(result.payload.links.iter().any(|l| l.contains("other.example")));
    }

    #[test]
    fn filter_links_drops_non_allowlisted_authority() {
        let links = vec![
            "https://a.example/b".to_string(),
            "https://evil.example/x".to_string(),
        ];
        let kept = filter_links(links.iter(), &cfg(), &crate::url::UrlLimits::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].host(), Some("a.example"));
    }

    #[test]
    fn body_text_excludes_script_and_style() {
        let html = "<html><body><script>var x=1;</script><p>Visible</p><style>.a{}</style></body></html>";
        let result = extract(html, &base(), &cfg());
        assert!(result.payload.body.contains("Visible"));
        assert!(!result.payload.body.contains("var x"));
    }
}
