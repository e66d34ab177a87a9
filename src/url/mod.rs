//! URL value object, normalization and fingerprinting (spec §3, §4.1).
//!
//! Grounded on the donor crate's `imurl::ImUrl` — an immutable, cheaply
//! cloneable wrapper around `url::Url` sharing the parsed value via `Arc`.
//! `NormalizedUrl` keeps that shape but adds the normalization and
//! fingerprinting steps spec.md requires: lowercase scheme/host, punycode,
//! percent-decode-then-reencode, dot-segment collapse, default-port
//! elision, fragment stripping, and query-pair canonicalization.

use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use url::Url;

/// Stable 128-bit fingerprint of a normalized URL, used for dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub u128);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Limits applied during normalization (spec §4.1).
#[derive(Debug, Clone, Copy)]
pub struct UrlLimits {
    pub max_url_length: usize,
    pub max_url_segments: usize,
    pub max_url_params: usize,
}

impl Default for UrlLimits {
    fn default() -> Self {
        Self {
            max_url_length: 2048,
            max_url_segments: 16,
            max_url_params: 32,
        }
    }
}

/// An immutable, cheaply-cloneable normalized URL.
///
/// `url` carries the original parse (punycode host, percent-encoded path)
/// produced by the `url` crate, which already performs lowercasing,
/// default-port elision, and IDNA. `normalized_string` is the canonical
/// form after the additional steps spec §4.1 requires beyond what `url`
/// does for us (dot-segment collapse is handled by `url::Url::join`/parse
/// already; what remains is fragment stripping and query canonicalization).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NormalizedUrl {
    normalized_string: String,
    fingerprint: Fingerprint,
    #[serde(skip)]
    url: Option<Arc<Url>>,
}

impl PartialEq for NormalizedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.normalized_string == other.normalized_string
    }
}
impl Eq for NormalizedUrl {}

impl Hash for NormalizedUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized_string.hash(state);
    }
}

impl NormalizedUrl {
    /// Parse, validate, and normalize a URL string against the given limits.
    pub fn parse(input: &str, limits: &UrlLimits) -> Result<Self, CrawlError> {
        if input.len() > limits.max_url_length {
            return Err(CrawlError::InvalidUrl(
                "invalid url — too complex (length)".into(),
            ));
        }

        let mut parsed =
            Url::parse(input).map_err(|e| CrawlError::InvalidUrl(format!("{input}: {e}")))?;

        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(CrawlError::InvalidUrl(format!(
                    "unsupported scheme '{other}'"
                )));
            }
        }

        // Fragment is never part of the normalized form.
        parsed.set_fragment(None);

        // Collapse duplicate slashes in the path (url::Url already resolves
        // "." and ".." segments during parsing/joining).
        let collapsed_path = collapse_duplicate_slashes(parsed.path());
        if collapsed_path != parsed.path() {
            parsed.set_path(&collapsed_path);
        }

        let segment_count = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).count())
            .unwrap_or(0);
        if segment_count > limits.max_url_segments {
            return Err(CrawlError::InvalidUrl(
                "invalid url — too complex (segments)".into(),
            ));
        }

        let canonical_query = parsed.query().map(canonicalize_query);
        let param_count = canonical_query
            .as_ref()
            .map(|q| q.split('&').filter(|p| !p.is_empty()).count())
            .unwrap_or(0);
        if param_count > limits.max_url_params {
            return Err(CrawlError::InvalidUrl(
                "invalid url — too complex (params)".into(),
            ));
        }
        parsed.set_query(canonical_query.as_deref());

        // Strip a trailing dot from the host, per spec.
        if let Some(host) = parsed.host_str() {
            if let Some(stripped) = host.strip_suffix('.') {
                let stripped = stripped.to_string();
                let _ = parsed.set_host(Some(&stripped));
            }
        }

        let normalized_string = parsed.as_str().to_string();
        if normalized_string.len() > limits.max_url_length {
            return Err(CrawlError::InvalidUrl(
                "invalid url — too complex (length)".into(),
            ));
        }

        let fingerprint = fingerprint_of(&normalized_string);

        Ok(Self {
            normalized_string,
            fingerprint,
            url: Some(Arc::new(parsed)),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.normalized_string
    }

    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        self.url.as_ref().map(|u| u.scheme()).unwrap_or_default()
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.url.as_ref().and_then(|u| u.host_str())
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.url.as_ref().and_then(|u| u.port_or_known_default())
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.url.as_ref().map(|u| u.path()).unwrap_or("/")
    }

    /// The (scheme, host, port) triple used for robots scoping and allowlist
    /// comparison (spec's "Authority").
    #[must_use]
    pub fn authority(&self) -> Option<Domain> {
        let url = self.url.as_ref()?;
        Some(Domain {
            scheme: url.scheme().to_string(),
            host: url.host_str()?.to_string(),
            port: url.port_or_known_default().unwrap_or(match url.scheme() {
                "https" => 443,
                _ => 80,
            }),
        })
    }

    /// Resolve a possibly-relative href against this URL as a base.
    pub fn join(&self, href: &str) -> Result<Url, CrawlError> {
        let base = self
            .url
            .as_ref()
            .ok_or_else(|| CrawlError::InvalidUrl("missing base url".into()))?;
        base.join(href)
            .map_err(|e| CrawlError::InvalidUrl(format!("{href}: {e}")))
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized_string)
    }
}

/// A scheme+host+port tuple with no path — an allowlist entry or the scope
/// key for robots.txt caching (spec §3 "Domain", GLOSSARY "Authority").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl Domain {
    /// Parse a domain entry: an absolute http(s) URL with an empty path
    /// (spec §6 `domain_allowlist`).
    pub fn parse(input: &str) -> Result<Self, CrawlError> {
        let url = Url::parse(input)
            .map_err(|e| CrawlError::ConfigError(format!("invalid domain '{input}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CrawlError::ConfigError(format!(
                "domain '{input}' must use http or https"
            )));
        }
        if !(url.path().is_empty() || url.path() == "/") {
            return Err(CrawlError::ConfigError(format!(
                "domain '{input}' must have an empty path"
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| CrawlError::ConfigError(format!("domain '{input}' has no host")))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(match url.scheme() {
            "https" => 443,
            _ => 80,
        });
        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port,
        })
    }
}

fn collapse_duplicate_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_slash = false;
    for c in path.chars() {
        if c == '/' {
            if last_was_slash {
                continue;
            }
            last_was_slash = true;
        } else {
            last_was_slash = false;
        }
        out.push(c);
    }
    out
}

/// Canonicalize a query string: drop empty `k=v` pairs, percent-decode
/// values, preserve key order (including duplicate keys in their original
/// relative order — see DESIGN.md open-question resolution).
fn canonicalize_query(query: &str) -> String {
    let mut pairs = Vec::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut it = pair.splitn(2, '=');
        let k = it.next().unwrap_or("");
        let v = it.next();
        if k.is_empty() && v.is_none() {
            continue;
        }
        let decoded_v = v.map(|val| {
            percent_encoding::percent_decode_str(val)
                .decode_utf8_lossy()
                .into_owned()
        });
        match decoded_v {
            Some(val) if val.is_empty() && v == Some("") => {
                // "k=" form: keep, it's a deliberate empty value, not an
                // "empty pair" in the sense spec means (no '=' at all).
                pairs.push(format!(
                    "{}={}",
                    k,
                    percent_encoding::utf8_percent_encode(
                        &val,
                        percent_encoding::NON_ALPHANUMERIC
                    )
                ));
            }
            Some(val) => {
                pairs.push(format!(
                    "{}={}",
                    k,
                    percent_encoding::utf8_percent_encode(
                        &val,
                        percent_encoding::NON_ALPHANUMERIC
                    )
                ));
            }
            None => pairs.push(k.to_string()),
        }
    }
    pairs.join("&")
}

/// 128-bit stable fingerprint of a normalized URL string.
fn fingerprint_of(normalized: &str) -> Fingerprint {
    Fingerprint(xxhash_rust::xxh3::xxh3_128(normalized.as_bytes()))
}
