//! # Built-in Rules
//!
//! Each rule is a row of data: which claim it reads, which fact it reads,
//! and a pure predicate over the two. The engine owns the shared
//! semantics (no policy, unknown fact); a predicate only ever sees a
//! claim record that exists and a fact that is known.
//!
//! Predicates return an [`Outcome`] and a short reason code. Reason codes
//! are stable output strings.

use std::collections::BTreeSet;
use std::fmt;

use privcheck_claims::{ConsentMechanism, CookieDuration, CookieOwnership, DomainClaimRecord, TransferScope};
use privcheck_core::{CountryCode, Observation};
use privcheck_dataset::TechnicalProfile;
use serde::Serialize;

use crate::outcome::Outcome;

/// Highest third-party cookie ratio compatible with consent-gated tracking.
pub const CONSENT_RATIO_THRESHOLD: f64 = 0.05;

/// Longest cookie lifetime, in days, compatible with a session-only claim.
pub const SESSION_MAX_DAYS: i64 = 1;

/// The claim side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ClaimValue {
    /// A declared boolean.
    Declared(Option<bool>),
    /// Effective transfer scope.
    Scope(Option<TransferScope>),
    /// Declared cookie ownership.
    Ownership(Option<CookieOwnership>),
    /// Declared cookie lifetime.
    Duration(Option<CookieDuration>),
    /// Declared consent mechanism.
    Consent(Option<ConsentMechanism>),
    /// Third parties a cookie policy lists.
    ThirdParties(Option<BTreeSet<String>>),
}

/// The fact side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    /// A count.
    Count(u64),
    /// A ratio in `[0, 1]`.
    Ratio(f64),
    /// A duration in whole days.
    Days(i64),
    /// The site's country against its tracker owners' countries.
    #[serde(rename_all = "camelCase")]
    Owners {
        /// Country of the site.
        domain_country: CountryCode,
        /// Countries of the observed tracker owners.
        owner_countries: BTreeSet<CountryCode>,
    },
}

/// What a fact extractor may read about a domain.
#[derive(Debug, Clone, Copy)]
pub struct FactContext<'a> {
    /// The domain's profile, all-unknown when nothing was measured.
    pub profile: &'a TechnicalProfile,
    /// The domain's country, when one could be assigned.
    pub country: Option<&'a CountryCode>,
}

/// Outcome plus reason code.
pub type Decision = (Outcome, &'static str);

/// One compliance rule.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable identifier, used as an output key.
    pub id: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Name of the claim field compared.
    pub claim_field: &'static str,
    /// Name of the fact field compared.
    pub fact_field: &'static str,
    /// Read the claim; the context supplies the domain's country.
    pub claim: fn(&DomainClaimRecord, &FactContext<'_>) -> ClaimValue,
    /// Read the fact; `Unknown` makes the verdict indeterminate.
    pub fact: fn(&FactContext<'_>) -> Observation<FactValue>,
    /// Compare them.
    pub predicate: fn(&ClaimValue, &FactValue) -> Decision,
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("claim_field", &self.claim_field)
            .field("fact_field", &self.fact_field)
            .finish()
    }
}

/// Every built-in rule, in output order.
pub static BUILTIN_RULES: [Rule; 8] = [
    Rule {
        id: "third_party_sharing",
        description: "Declared third-party sharing matches observed third-party requests and cookies",
        claim_field: "declaresThirdPartySharing",
        fact_field: "thirdPartyRequestCount+thirdPartyCookieCount",
        claim: claim_sharing,
        fact: fact_third_party_presence,
        predicate: third_party_sharing,
    },
    Rule {
        id: "undeclared_cookie_use",
        description: "Cookies are only set when cookie use is declared",
        claim_field: "declaresCookieUse",
        fact_field: "cookieCount",
        claim: claim_cookie_use,
        fact: fact_cookie_count,
        predicate: undeclared_cookie_use,
    },
    Rule {
        id: "cookie_policy_section",
        description: "Sites that set cookies have a cookie policy or cookie section",
        claim_field: "hasCookiePolicySection",
        fact_field: "cookieCount",
        claim: claim_cookie_section,
        fact: fact_cookie_count,
        predicate: cookie_policy_section,
    },
    Rule {
        id: "international_transfer",
        description: "Declared transfer scope matches the countries of observed tracker owners",
        claim_field: "transferScope",
        fact_field: "trackerOwnerCountries",
        claim: claim_transfer_scope,
        fact: fact_owner_countries,
        predicate: international_transfer,
    },
    Rule {
        id: "first_party_cookies_only",
        description: "A first-party-only cookie policy sets no third-party cookies",
        claim_field: "cookieOwnership",
        fact_field: "thirdPartyCookieCount",
        claim: claim_ownership,
        fact: fact_third_party_cookies,
        predicate: first_party_cookies_only,
    },
    Rule {
        id: "session_cookies_only",
        description: "A session-only cookie policy sets no long-lived cookies",
        claim_field: "cookieDuration",
        fact_field: "cookies.expiryMaxDays",
        claim: claim_duration,
        fact: fact_max_expiry_days,
        predicate: session_cookies_only,
    },
    Rule {
        id: "consent_before_tracking",
        description: "A consent banner or CMP keeps third-party cookies out of the first load",
        claim_field: "consentMechanism",
        fact_field: "cookies.thirdPartyRatio",
        claim: claim_consent,
        fact: fact_third_party_cookie_ratio,
        predicate: consent_before_tracking,
    },
    Rule {
        id: "no_tracking_claim",
        description: "A cookie policy listing no third parties comes with no tracker requests",
        claim_field: "declaredThirdParties",
        fact_field: "requests.trackerHitRatio",
        claim: claim_third_parties,
        fact: fact_tracker_hit_ratio,
        predicate: no_tracking_claim,
    },
];

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

fn claim_sharing(r: &DomainClaimRecord, _: &FactContext<'_>) -> ClaimValue {
    ClaimValue::Declared(r.declares_third_party_sharing)
}

fn claim_cookie_use(r: &DomainClaimRecord, _: &FactContext<'_>) -> ClaimValue {
    ClaimValue::Declared(r.declares_cookie_use)
}

fn claim_cookie_section(r: &DomainClaimRecord, _: &FactContext<'_>) -> ClaimValue {
    ClaimValue::Declared(r.has_cookie_policy_section)
}

fn claim_transfer_scope(r: &DomainClaimRecord, ctx: &FactContext<'_>) -> ClaimValue {
    let in_eu_eea = ctx.country.is_some_and(CountryCode::is_eu_eea);
    ClaimValue::Scope(r.effective_transfer_scope(in_eu_eea))
}

fn claim_ownership(r: &DomainClaimRecord, _: &FactContext<'_>) -> ClaimValue {
    ClaimValue::Ownership(r.cookie_ownership)
}

fn claim_duration(r: &DomainClaimRecord, _: &FactContext<'_>) -> ClaimValue {
    ClaimValue::Duration(r.cookie_duration)
}

fn claim_consent(r: &DomainClaimRecord, _: &FactContext<'_>) -> ClaimValue {
    ClaimValue::Consent(r.consent_mechanism)
}

fn claim_third_parties(r: &DomainClaimRecord, _: &FactContext<'_>) -> ClaimValue {
    ClaimValue::ThirdParties(r.declared_third_parties.clone())
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

fn fact_third_party_presence(ctx: &FactContext<'_>) -> Observation<FactValue> {
    ctx.profile.third_party_presence().map(FactValue::Count)
}

fn fact_cookie_count(ctx: &FactContext<'_>) -> Observation<FactValue> {
    ctx.profile.cookie_count.map(FactValue::Count)
}

fn fact_third_party_cookies(ctx: &FactContext<'_>) -> Observation<FactValue> {
    ctx.profile.third_party_cookie_count.map(FactValue::Count)
}

fn fact_owner_countries(ctx: &FactContext<'_>) -> Observation<FactValue> {
    let Some(country) = ctx.country else {
        return Observation::Unknown;
    };
    ctx.profile
        .tracker_owner_countries
        .as_ref()
        .map(|owners| FactValue::Owners {
            domain_country: country.clone(),
            owner_countries: owners.clone(),
        })
}

fn fact_max_expiry_days(ctx: &FactContext<'_>) -> Observation<FactValue> {
    ctx.profile.max_cookie_expiry_days().map(FactValue::Days)
}

fn fact_third_party_cookie_ratio(ctx: &FactContext<'_>) -> Observation<FactValue> {
    ctx.profile.third_party_cookie_ratio().map(FactValue::Ratio)
}

fn fact_tracker_hit_ratio(ctx: &FactContext<'_>) -> Observation<FactValue> {
    ctx.profile.tracker_hit_ratio().map(FactValue::Ratio)
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

const MISMATCH: Decision = (Outcome::Indeterminate, "evidence_mismatch");

fn third_party_sharing(claim: &ClaimValue, fact: &FactValue) -> Decision {
    let (ClaimValue::Declared(declared), FactValue::Count(n)) = (claim, fact) else {
        return MISMATCH;
    };
    match (*declared, *n) {
        (Some(true), 0) => (Outcome::Violation, "sharing_declared_not_observed"),
        (Some(true), _) => (Outcome::Compliant, "sharing_declared_and_observed"),
        (_, n) if n > 0 => (Outcome::Violation, "undeclared_third_parties"),
        (Some(false), _) => (Outcome::Compliant, "no_sharing_declared_or_observed"),
        (None, _) => (Outcome::NotApplicable, "silent_no_third_parties"),
    }
}

fn undeclared_cookie_use(claim: &ClaimValue, fact: &FactValue) -> Decision {
    let (ClaimValue::Declared(declared), FactValue::Count(n)) = (claim, fact) else {
        return MISMATCH;
    };
    match (*declared, *n) {
        (Some(true), _) => (Outcome::Compliant, "cookie_use_declared"),
        (_, 0) => (Outcome::Compliant, "no_cookies_observed"),
        _ => (Outcome::Violation, "undeclared_cookies"),
    }
}

fn cookie_policy_section(claim: &ClaimValue, fact: &FactValue) -> Decision {
    let (ClaimValue::Declared(section), FactValue::Count(n)) = (claim, fact) else {
        return MISMATCH;
    };
    match (*section, *n) {
        (_, 0) => (Outcome::NotApplicable, "no_cookies_observed"),
        (Some(true), _) => (Outcome::Compliant, "cookie_section_present"),
        _ => (Outcome::Violation, "cookies_without_cookie_section"),
    }
}

fn international_transfer(claim: &ClaimValue, fact: &FactValue) -> Decision {
    let (
        ClaimValue::Scope(scope),
        FactValue::Owners {
            domain_country,
            owner_countries,
        },
    ) = (claim, fact)
    else {
        return MISMATCH;
    };
    let mut foreign = owner_countries.iter().filter(|c| *c != domain_country);
    match scope {
        None => (Outcome::NotApplicable, "transfer_scope_silent"),
        Some(TransferScope::International) => {
            if foreign.next().is_some() {
                (Outcome::Compliant, "foreign_owner_observed")
            } else {
                (Outcome::Violation, "international_declared_no_foreign_owner")
            }
        }
        Some(TransferScope::IntraEu) => {
            if foreign.any(|c| !c.is_eu_eea()) {
                (Outcome::Violation, "owner_outside_eu_eea")
            } else {
                (Outcome::Compliant, "owners_within_eu_eea")
            }
        }
        Some(TransferScope::None) => {
            if foreign.next().is_some() {
                (Outcome::Violation, "foreign_owner_observed")
            } else {
                (Outcome::Compliant, "no_foreign_owner")
            }
        }
    }
}

fn first_party_cookies_only(claim: &ClaimValue, fact: &FactValue) -> Decision {
    let (ClaimValue::Ownership(ownership), FactValue::Count(n)) = (claim, fact) else {
        return MISMATCH;
    };
    match (ownership, *n) {
        (Some(CookieOwnership::First), 0) => (Outcome::Compliant, "first_party_only"),
        (Some(CookieOwnership::First), _) => (Outcome::Violation, "third_party_cookies_observed"),
        _ => (Outcome::NotApplicable, "first_party_only_not_claimed"),
    }
}

fn session_cookies_only(claim: &ClaimValue, fact: &FactValue) -> Decision {
    let (ClaimValue::Duration(duration), FactValue::Days(days)) = (claim, fact) else {
        return MISMATCH;
    };
    match duration {
        Some(CookieDuration::Session) if *days <= SESSION_MAX_DAYS => (Outcome::Compliant, "session_cookies_only"),
        Some(CookieDuration::Session) => (Outcome::Violation, "persistent_cookies_observed"),
        _ => (Outcome::NotApplicable, "session_only_not_claimed"),
    }
}

fn consent_before_tracking(claim: &ClaimValue, fact: &FactValue) -> Decision {
    let (ClaimValue::Consent(mechanism), FactValue::Ratio(ratio)) = (claim, fact) else {
        return MISMATCH;
    };
    match mechanism {
        Some(m) if m.gates_tracking() => {
            if *ratio <= CONSENT_RATIO_THRESHOLD {
                (Outcome::Compliant, "tracking_gated_by_consent")
            } else {
                (Outcome::Violation, "third_party_cookies_before_consent")
            }
        }
        _ => (Outcome::NotApplicable, "no_consent_gate_claimed"),
    }
}

fn no_tracking_claim(claim: &ClaimValue, fact: &FactValue) -> Decision {
    let (ClaimValue::ThirdParties(parties), FactValue::Ratio(ratio)) = (claim, fact) else {
        return MISMATCH;
    };
    match parties {
        Some(p) if p.is_empty() => {
            if *ratio == 0.0 {
                (Outcome::Compliant, "no_tracker_requests")
            } else {
                (Outcome::Violation, "tracker_requests_observed")
            }
        }
        _ => (Outcome::NotApplicable, "third_parties_listed_or_silent"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str) -> &'static Rule {
        BUILTIN_RULES.iter().find(|r| r.id == id).unwrap()
    }

    fn decide(id: &str, claim: ClaimValue, fact: FactValue) -> Decision {
        (rule(id).predicate)(&claim, &fact)
    }

    fn cc(s: &str) -> CountryCode {
        CountryCode::new(s).unwrap()
    }

    #[test]
    fn ids_are_unique() {
        let ids: BTreeSet<&str> = BUILTIN_RULES.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), BUILTIN_RULES.len());
    }

    #[test]
    fn third_party_sharing_table() {
        let d = |v, n| decide("third_party_sharing", ClaimValue::Declared(v), FactValue::Count(n)).0;
        assert_eq!(d(Some(true), 0), Outcome::Violation);
        assert_eq!(d(Some(true), 3), Outcome::Compliant);
        assert_eq!(d(Some(false), 3), Outcome::Violation);
        assert_eq!(d(None, 3), Outcome::Violation);
        assert_eq!(d(Some(false), 0), Outcome::Compliant);
        assert_eq!(d(None, 0), Outcome::NotApplicable);
    }

    #[test]
    fn cookie_rules() {
        let use_ = |v, n| decide("undeclared_cookie_use", ClaimValue::Declared(v), FactValue::Count(n)).0;
        assert_eq!(use_(None, 5), Outcome::Violation);
        assert_eq!(use_(Some(false), 5), Outcome::Violation);
        assert_eq!(use_(Some(true), 5), Outcome::Compliant);
        assert_eq!(use_(None, 0), Outcome::Compliant);

        let section = |v, n| decide("cookie_policy_section", ClaimValue::Declared(v), FactValue::Count(n)).0;
        assert_eq!(section(Some(true), 2), Outcome::Compliant);
        assert_eq!(section(None, 2), Outcome::Violation);
        assert_eq!(section(Some(true), 0), Outcome::NotApplicable);
    }

    #[test]
    fn international_transfer_table() {
        let owners = |list: &[&str]| FactValue::Owners {
            domain_country: cc("ES"),
            owner_countries: list.iter().map(|c| cc(c)).collect(),
        };
        let d = |s, f| decide("international_transfer", ClaimValue::Scope(s), f).0;
        assert_eq!(d(Some(TransferScope::International), owners(&["US"])), Outcome::Compliant);
        assert_eq!(d(Some(TransferScope::International), owners(&["ES"])), Outcome::Violation);
        assert_eq!(d(Some(TransferScope::IntraEu), owners(&["DE", "NO"])), Outcome::Compliant);
        assert_eq!(d(Some(TransferScope::IntraEu), owners(&["US"])), Outcome::Violation);
        assert_eq!(d(Some(TransferScope::None), owners(&["DE"])), Outcome::Violation);
        assert_eq!(d(Some(TransferScope::None), owners(&[])), Outcome::Compliant);
        assert_eq!(d(None, owners(&["US"])), Outcome::NotApplicable);
    }

    fn transfer_verdict(domain: &str, country: &str, owners: &[&str]) -> Decision {
        let d = privcheck_core::HostName::parse(domain).unwrap();
        let mut profile = TechnicalProfile::unknown(d.clone());
        profile.tracker_owner_countries = Observation::Observed(owners.iter().map(|c| cc(c)).collect());
        let mut record = DomainClaimRecord::new(d);
        record.declares_international_transfer = Some(false);
        let country = cc(country);
        let ctx = FactContext {
            profile: &profile,
            country: Some(&country),
        };
        let rule = rule("international_transfer");
        let Observation::Observed(fact) = (rule.fact)(&ctx) else {
            panic!("owner countries should be known");
        };
        (rule.predicate)(&(rule.claim)(&record, &ctx), &fact)
    }

    #[test]
    fn denied_transfer_outside_eu_means_domestic_only() {
        assert_eq!(transfer_verdict("sat.gob.mx", "MX", &["ES"]).0, Outcome::Violation);
        assert_eq!(transfer_verdict("sat.gob.mx", "MX", &["MX"]).0, Outcome::Compliant);
        assert_eq!(transfer_verdict("www.gov.uk", "GB", &["DE"]).0, Outcome::Violation);
        assert_eq!(transfer_verdict("www.gov.uk", "GB", &[]).0, Outcome::Compliant);
    }

    #[test]
    fn denied_transfer_inside_eu_allows_eu_owners() {
        assert_eq!(transfer_verdict("sede.gob.es", "ES", &["DE"]).0, Outcome::Compliant);
        assert_eq!(transfer_verdict("sede.gob.es", "ES", &["US"]).0, Outcome::Violation);
    }

    #[test]
    fn cookie_policy_detail_rules() {
        let own = |o, n| decide("first_party_cookies_only", ClaimValue::Ownership(o), FactValue::Count(n)).0;
        assert_eq!(own(Some(CookieOwnership::First), 0), Outcome::Compliant);
        assert_eq!(own(Some(CookieOwnership::First), 1), Outcome::Violation);
        assert_eq!(own(Some(CookieOwnership::Mixed), 1), Outcome::NotApplicable);

        let dur = |d, days| decide("session_cookies_only", ClaimValue::Duration(d), FactValue::Days(days)).0;
        assert_eq!(dur(Some(CookieDuration::Session), 0), Outcome::Compliant);
        assert_eq!(dur(Some(CookieDuration::Session), 1), Outcome::Compliant);
        assert_eq!(dur(Some(CookieDuration::Session), 365), Outcome::Violation);
        assert_eq!(dur(None, 365), Outcome::NotApplicable);

        let consent = |m, r| decide("consent_before_tracking", ClaimValue::Consent(m), FactValue::Ratio(r)).0;
        assert_eq!(consent(Some(ConsentMechanism::Cmp), 0.05), Outcome::Compliant);
        assert_eq!(consent(Some(ConsentMechanism::Banner), 0.5), Outcome::Violation);
        assert_eq!(consent(Some(ConsentMechanism::None), 0.5), Outcome::NotApplicable);

        let none = || ClaimValue::ThirdParties(Some(BTreeSet::new()));
        assert_eq!(decide("no_tracking_claim", none(), FactValue::Ratio(0.0)).0, Outcome::Compliant);
        assert_eq!(decide("no_tracking_claim", none(), FactValue::Ratio(0.2)).0, Outcome::Violation);
        assert_eq!(
            decide("no_tracking_claim", ClaimValue::ThirdParties(None), FactValue::Ratio(0.2)).0,
            Outcome::NotApplicable
        );
    }

    #[test]
    fn mismatched_evidence_is_indeterminate() {
        let d = decide("third_party_sharing", ClaimValue::Scope(None), FactValue::Count(1));
        assert_eq!(d, MISMATCH);
    }

    #[test]
    fn evidence_serializes_plainly() {
        let f = FactValue::Owners {
            domain_country: cc("es"),
            owner_countries: [cc("US")].into(),
        };
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["domainCountry"], "ES");
        assert_eq!(v["ownerCountries"][0], "US");
        assert_eq!(serde_json::to_value(ClaimValue::Declared(None)).unwrap(), serde_json::Value::Null);
        assert_eq!(serde_json::to_value(FactValue::Count(4)).unwrap(), 4);
    }
}
