//! Property tests for URL normalization and fingerprinting (spec §8:
//! "normalization is idempotent" and "fingerprint is stable for equal
//! normalized strings").

use crawlkit::url::{NormalizedUrl, UrlLimits};
use proptest::prelude::*;

fn limits() -> UrlLimits {
    UrlLimits::default()
}

fn arb_path_segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,8}"
}

proptest! {
    #[test]
    fn normalization_is_idempotent(
        host in "[a-z]{3,10}",
        segments in proptest::collection::vec(arb_path_segment(), 0..5),
        query_key in "[a-z]{1,6}",
        query_val in "[a-zA-Z0-9]{0,10}",
    ) {
        let path = if segments.is_empty() {
            String::new()
        } else {
            format!("/{}", segments.join("/"))
        };
        let input = format!("https://{host}.example{path}?{query_key}={query_val}");

        if let Ok(once) = NormalizedUrl::parse(&input, &limits()) {
            let twice = NormalizedUrl::parse(once.as_str(), &limits()).unwrap();
            prop_assert_eq!(once.as_str(), twice.as_str());
            prop_assert_eq!(once.fingerprint(), twice.fingerprint());
        }
    }

    #[test]
    fn equal_normalized_strings_always_share_a_fingerprint(
        host in "[a-z]{3,10}",
        segment in arb_path_segment(),
    ) {
        let input = format!("https://{host}.example/{segment}");
        let a = NormalizedUrl::parse(&input, &limits());
        let b = NormalizedUrl::parse(&input, &limits());
        if let (Ok(a), Ok(b)) = (a, b) {
            prop_assert_eq!(a.as_str(), b.as_str());
            prop_assert_eq!(a.fingerprint(), b.fingerprint());
        }
    }

    #[test]
    fn case_and_default_port_variants_normalize_identically(
        host in "[a-z]{3,10}",
        segment in arb_path_segment(),
    ) {
        let lower = format!("https://{host}.example/{segment}");
        let upper = format!("HTTPS://{}.EXAMPLE:443/{segment}", host.to_uppercase());
        if let (Ok(a), Ok(b)) = (
            NormalizedUrl::parse(&lower, &limits()),
            NormalizedUrl::parse(&upper, &limits()),
        ) {
            prop_assert_eq!(a.as_str(), b.as_str());
            prop_assert_eq!(a.fingerprint(), b.fingerprint());
        }
    }
}
