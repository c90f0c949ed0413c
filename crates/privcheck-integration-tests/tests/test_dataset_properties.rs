//! Property tests for the master dataset builder.
//!
//! Generates random cookie and request crawls over a small pool of sites
//! and hosts, then checks that the builder is deterministic, never counts
//! more third-party cookies than cookies, and only emits covered domains.

use std::collections::BTreeSet;
use std::sync::Arc;

use privcheck_core::{Observation, Timestamp};
use privcheck_dataset::{
    parse_jsonl, CookieRecord, DatasetInputs, Enricher, MasterDatasetBuilder, RequestRecord, Source,
};
use privcheck_taxonomy::{parse_taxonomy, Resolver};
use proptest::prelude::*;

const SITES: [&str; 4] = ["a.example.gov", "b.example.gov", "sede.gob.es", "portal.gov.uk"];
const HOSTS: [&str; 6] = [
    "a.example.gov",
    "static.sede.gob.es",
    "ads.example-cdn.com",
    "www.google-analytics.com",
    "unknown-widgets.net",
    "cdn.portal.gov.uk",
];

fn enricher() -> Enricher {
    let taxonomy = parse_taxonomy(
        "trackers:\n  ads.example-cdn.com:\n    owner: AdCo\n    category: advertising\n    owner_country: US\n  google-analytics.com:\n    owner: Google LLC\n    category: analytics\n",
        "<properties>",
    )
    .unwrap();
    Enricher::new(Resolver::new(Arc::new(taxonomy)))
}

fn as_of() -> Timestamp {
    Timestamp::parse("2025-03-01T00:00:00Z").unwrap()
}

fn crawl() -> impl Strategy<Value = Vec<(usize, usize, bool)>> {
    proptest::collection::vec((0..SITES.len(), 0..HOSTS.len(), any::<bool>()), 0..40)
}

fn inputs(cookies: &[(usize, usize, bool)], requests: &[(usize, usize, bool)]) -> DatasetInputs {
    let enricher = enricher();
    let cookie_text: String = cookies
        .iter()
        .map(|(s, h, session)| {
            format!(
                "{{\"domain\":\"{}\",\"hostname\":\"{}\",\"is_session\":{session},\"expiry\":\"2025-06-01T00:00:00Z\"}}\n",
                SITES[*s], HOSTS[*h]
            )
        })
        .collect();
    let request_text: String = requests
        .iter()
        .map(|(s, h, _)| {
            format!(
                "{{\"domain\":\"{}\",\"hostname\":\"{}\",\"url\":\"https://{}/x\"}}\n",
                SITES[*s], HOSTS[*h], HOSTS[*h]
            )
        })
        .collect();
    let cookies = parse_jsonl::<CookieRecord, _>(cookie_text.as_bytes(), Source::Cookies).unwrap();
    let requests = parse_jsonl::<RequestRecord, _>(request_text.as_bytes(), Source::Requests).unwrap();
    DatasetInputs {
        cookies: Some(enricher.enrich_cookies(cookies.records).records),
        requests: Some(enricher.enrich_requests(requests.records).records),
        ..DatasetInputs::default()
    }
}

proptest! {
    #[test]
    fn builder_is_idempotent(cookies in crawl(), requests in crawl()) {
        let inputs = inputs(&cookies, &requests);
        let builder = MasterDatasetBuilder::new(as_of());
        let first = serde_json::to_vec(&builder.build(&inputs).profiles.values().collect::<Vec<_>>()).unwrap();
        let second = serde_json::to_vec(&builder.build(&inputs).profiles.values().collect::<Vec<_>>()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn third_party_cookies_never_exceed_cookies(cookies in crawl(), requests in crawl()) {
        let ds = MasterDatasetBuilder::new(as_of()).build(&inputs(&cookies, &requests));
        for profile in ds.profiles.values() {
            if let (Observation::Observed(tp), Observation::Observed(total)) =
                (profile.third_party_cookie_count, profile.cookie_count)
            {
                prop_assert!(tp <= total, "{}: {} > {}", profile.domain, tp, total);
            }
            if let (Observation::Observed(tp), Observation::Observed(total)) =
                (profile.third_party_request_count, profile.request_count)
            {
                prop_assert!(tp <= total);
            }
        }
    }

    #[test]
    fn only_covered_domains_are_emitted(cookies in crawl(), requests in crawl()) {
        let ds = MasterDatasetBuilder::new(as_of()).build(&inputs(&cookies, &requests));
        let covered: BTreeSet<&str> = cookies
            .iter()
            .chain(requests.iter())
            .map(|(s, _, _)| SITES[*s])
            .collect();
        let emitted: BTreeSet<&str> = ds.profiles.keys().map(|d| d.as_str()).collect();
        prop_assert_eq!(emitted, covered);
    }
}
