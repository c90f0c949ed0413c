//! End-to-end compliance scenarios across the library crates.
//!
//! Each test feeds JSON Lines through the enricher, the master dataset
//! builder, the claim aggregator and the compliance engine, the same path
//! a CLI run takes, and checks the verdicts and metrics that come out.

use std::collections::BTreeMap;
use std::sync::Arc;

use privcheck_claims::{aggregate_claims, DomainClaimRecord, PolicyClaim};
use privcheck_compliance::{ComplianceEngine, Evaluation, Outcome, NO_POLICY_FOUND};
use privcheck_core::{HostName, Observation, Timestamp};
use privcheck_dataset::{
    parse_jsonl, CookieRecord, DatasetInputs, Enricher, MasterDatasetBuilder, RequestRecord, Source,
    TechnicalProfile,
};
use privcheck_metrics::{aggregate_metrics, CountryResolver, MetricsInputs};
use privcheck_taxonomy::{parse_taxonomy, Resolver, TrackerCategory};

const TAXONOMY: &str = "\
version: scenarios
trackers:
  ads.example-cdn.com:
    owner: AdCo
    category: advertising
    owner_country: US
  google-analytics.com:
    owner: Google LLC
    category: analytics
    owner_country: US
";

fn host(s: &str) -> HostName {
    HostName::parse(s).unwrap()
}

fn as_of() -> Timestamp {
    Timestamp::parse("2025-03-01T00:00:00Z").unwrap()
}

fn enricher() -> Enricher {
    let taxonomy = parse_taxonomy(TAXONOMY, "<scenarios>").unwrap();
    Enricher::new(Resolver::new(Arc::new(taxonomy)))
}

struct Run {
    profiles: BTreeMap<HostName, TechnicalProfile>,
    claims: BTreeMap<HostName, DomainClaimRecord>,
    evaluation: Evaluation,
}

fn run(cookies: Option<&str>, requests: Option<&str>, policies: &str) -> Run {
    let enricher = enricher();
    let inputs = DatasetInputs {
        cookies: cookies.map(|text| {
            let batch = parse_jsonl::<CookieRecord, _>(text.as_bytes(), Source::Cookies).unwrap();
            enricher.enrich_cookies(batch.records).records
        }),
        requests: requests.map(|text| {
            let batch = parse_jsonl::<RequestRecord, _>(text.as_bytes(), Source::Requests).unwrap();
            enricher.enrich_requests(batch.records).records
        }),
        ..DatasetInputs::default()
    };
    let profiles = MasterDatasetBuilder::new(as_of()).build(&inputs).profiles;
    let batch = parse_jsonl::<PolicyClaim, _>(policies.as_bytes(), Source::Policies).unwrap();
    let claims = aggregate_claims(&batch.records).records;
    let evaluation = ComplianceEngine::default().evaluate(&profiles, &claims, &CountryResolver::new());
    Run {
        profiles,
        claims,
        evaluation,
    }
}

fn outcome(run: &Run, domain: &str, rule: &str) -> (Outcome, &'static str) {
    let d = host(domain);
    let v = run
        .evaluation
        .for_domain(&d)
        .find(|v| v.rule_id == rule)
        .unwrap_or_else(|| panic!("no verdict for {domain}/{rule}"));
    (v.outcome, v.reason)
}

// ---------------------------------------------------------------------------
// Missing policy
// ---------------------------------------------------------------------------

#[test]
fn cookies_without_any_policy_are_indeterminate() {
    let cookies: String = (1..=5)
        .map(|i| format!("{{\"domain\":\"example.gov\",\"hostname\":\"example.gov\",\"name\":\"c{i}\"}}\n"))
        .collect();
    let run = run(Some(&cookies), None, "");

    assert_eq!(
        run.profiles[&host("example.gov")].cookie_count,
        Observation::Observed(5)
    );
    assert_eq!(
        outcome(&run, "example.gov", "undeclared_cookie_use"),
        (Outcome::Indeterminate, NO_POLICY_FOUND)
    );
    assert!(!run.evaluation.scores[&host("example.gov")].is_scored());
}

// ---------------------------------------------------------------------------
// Undeclared third-party sharing
// ---------------------------------------------------------------------------

#[test]
fn advertising_request_contradicts_no_sharing_claim() {
    let requests = r#"{"domain":"tracker.example.gov","hostname":"ads.example-cdn.com","url":"https://ads.example-cdn.com/pixel.gif"}
{"domain":"tracker.example.gov","hostname":"tracker.example.gov","url":"https://tracker.example.gov/app.js"}
"#;
    let policies = r#"{"domain":"tracker.example.gov","doc_type":"PRIVACY_POLICY","url":"https://tracker.example.gov/privacidad","declares_third_party_sharing":false}
"#;
    let run = run(None, Some(requests), policies);

    let profile = &run.profiles[&host("tracker.example.gov")];
    assert_eq!(profile.third_party_request_count, Observation::Observed(1));
    assert_eq!(
        profile.tracker_categories_present,
        Observation::Observed([TrackerCategory::Advertising].into())
    );

    let (o, _) = outcome(&run, "tracker.example.gov", "third_party_sharing");
    assert_eq!(o, Outcome::Violation);
    let score = &run.evaluation.scores[&host("tracker.example.gov")];
    assert!(score.violations >= 1);
    assert_eq!(score.score, Some(0.0));
}

// ---------------------------------------------------------------------------
// Conflicting claims
// ---------------------------------------------------------------------------

#[test]
fn conflicting_cookie_claims_resolve_to_declared() {
    let cookies = "{\"domain\":\"sede.example.gov\",\"hostname\":\"sede.example.gov\"}\n";
    let policies = r#"{"domain":"sede.example.gov","doc_type":"PRIVACY_POLICY","url":"https://sede.example.gov/p","declares_cookie_use":false}
{"domain":"sede.example.gov","doc_type":"COOKIE_POLICY","url":"https://sede.example.gov/c","declares_cookie_use":true}
"#;
    let run = run(Some(cookies), None, policies);

    let record = &run.claims[&host("sede.example.gov")];
    assert_eq!(record.declares_cookie_use, Some(true));
    assert_eq!(record.conflicts.len(), 1);
    assert_eq!(
        outcome(&run, "sede.example.gov", "undeclared_cookie_use").0,
        Outcome::Compliant
    );
}

// ---------------------------------------------------------------------------
// Unmatched third-party cookie
// ---------------------------------------------------------------------------

#[test]
fn unmatched_third_party_cookie_is_other() {
    let cookies = r#"{"domain":"portal.example.gov","hostname":"www.portal.example.gov","name":"sid","is_session":true}
{"domain":"portal.example.gov","hostname":"unknown-widgets.net","name":"w"}
"#;
    let run = run(Some(cookies), None, "");
    let profile = &run.profiles[&host("portal.example.gov")];
    assert_eq!(profile.cookie_count, Observation::Observed(2));
    assert_eq!(profile.third_party_cookie_count, Observation::Observed(1));
    assert_eq!(
        profile.tracker_categories_present,
        Observation::Observed([TrackerCategory::Other].into())
    );
}

// ---------------------------------------------------------------------------
// Scores and metrics
// ---------------------------------------------------------------------------

#[test]
fn unscored_domains_are_excluded_not_zero() {
    let cookies = r#"{"domain":"scored.example.gov","hostname":"scored.example.gov"}
{"domain":"unscored.example.gov","hostname":"unscored.example.gov"}
"#;
    let policies = r#"{"domain":"scored.example.gov","doc_type":"COOKIE_POLICY","url":"https://scored.example.gov/cookies","declares_cookie_use":true}
"#;
    let run = run(Some(cookies), None, policies);

    let rules: Vec<&'static str> = ComplianceEngine::default().registry().ids();
    let report = aggregate_metrics(
        MetricsInputs {
            profiles: &run.profiles,
            claims: &run.claims,
            evaluation: &run.evaluation,
            rules: &rules,
        },
        &CountryResolver::new(),
    );

    assert_eq!(report.global.domains, 2);
    assert_eq!(report.global.scored, 1);
    assert_eq!(report.global.excluded, 1);
    assert_eq!(report.global.mean_score, Some(1.0));
}

#[test]
fn domain_in_no_source_is_not_evaluated() {
    let run = run(None, None, "");
    assert!(run.profiles.is_empty());
    assert!(run.evaluation.verdicts.is_empty());
}
