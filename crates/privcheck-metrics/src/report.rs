//! # Metrics Aggregator
//!
//! Rolls profiles, claim records and verdicts up into one [`GroupMetrics`]
//! per country plus a global one.
//!
//! Every domain that has a profile, a claim record or a score counts in
//! its group's `domains`. Presence statistics (trackers, headers, TLS,
//! fingerprinting) count known facts and report the unknown remainder.
//! Score statistics use scored domains only; domains whose score is
//! undefined are reported as `excluded`, never as zero.

use std::collections::{BTreeMap, BTreeSet};

use privcheck_claims::DomainClaimRecord;
use privcheck_compliance::{Evaluation, Outcome};
use privcheck_core::{HostName, Observation};
use privcheck_dataset::{SecurityHeader, TechnicalProfile, TlsGrade};
use privcheck_taxonomy::TrackerCategory;
use serde::Serialize;

use crate::country::CountryResolver;
use crate::stats::{mean, percent, robust_stats, RobustStats};

/// Key for unknown values in distributions.
pub const UNKNOWN_KEY: &str = "unknown";

/// Everything the aggregator reads.
#[derive(Debug, Clone, Copy)]
pub struct MetricsInputs<'a> {
    pub profiles: &'a BTreeMap<HostName, TechnicalProfile>,
    pub claims: &'a BTreeMap<HostName, DomainClaimRecord>,
    pub evaluation: &'a Evaluation,
    /// Rule ids evaluated this run, in registry order.
    pub rules: &'a [&'static str],
}

/// Domains with trackers among those whose categories are known.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerPresence {
    pub known: u64,
    pub unknown: u64,
    /// At least one category.
    pub with_any: u64,
    pub pct_with_any: Option<f64>,
    /// At least one category other than `other`.
    pub with_classified: u64,
    pub pct_with_classified: Option<f64>,
}

/// One security header across a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderPresence {
    pub present: u64,
    pub absent: u64,
    pub unknown: u64,
    /// Over domains where headers are known.
    pub pct_present: Option<f64>,
}

/// Verdict counts for one rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeCounts {
    pub compliant: u64,
    pub violation: u64,
    pub not_applicable: u64,
    pub indeterminate: u64,
}

impl OutcomeCounts {
    fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Compliant => self.compliant += 1,
            Outcome::Violation => self.violation += 1,
            Outcome::NotApplicable => self.not_applicable += 1,
            Outcome::Indeterminate => self.indeterminate += 1,
        }
    }
}

/// How many domains published which kind of policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCoverage {
    pub with_claims: u64,
    pub pct_with_claims: Option<f64>,
    pub with_privacy_policy: u64,
    pub pct_with_privacy_policy: Option<f64>,
    pub with_cookie_policy: u64,
    pub pct_with_cookie_policy: Option<f64>,
}

/// Fingerprinting detection across a group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintPrevalence {
    pub known: u64,
    pub unknown: u64,
    pub detected: u64,
    pub pct_detected: Option<f64>,
}

/// Dispersion of the headline measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobustMetrics {
    pub cookie_count: Option<RobustStats>,
    pub tracker_hit_ratio: Option<RobustStats>,
    pub total_security_headers: Option<RobustStats>,
}

/// Metrics for one country, or globally.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMetrics {
    pub domains: u64,
    pub scored: u64,
    /// Domains with an undefined score.
    pub excluded: u64,
    /// Over scored domains only.
    pub mean_score: Option<f64>,
    pub trackers: TrackerPresence,
    pub security_headers: BTreeMap<&'static str, HeaderPresence>,
    pub rule_outcomes: BTreeMap<&'static str, OutcomeCounts>,
    pub policy_coverage: PolicyCoverage,
    /// Over domains with a claim record; `unknown` when none was stated.
    pub consent_mechanisms: BTreeMap<String, u64>,
    pub robust: RobustMetrics,
    /// Letter grade counts plus `unknown`.
    pub tls_grades: BTreeMap<String, u64>,
    pub fingerprinting: FingerprintPrevalence,
}

/// The full metrics artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub global: GroupMetrics,
    /// Keyed by ISO country code or `unassigned`.
    pub countries: BTreeMap<String, GroupMetrics>,
}

#[derive(Default)]
struct Accumulator {
    domains: u64,
    scores: Vec<f64>,
    excluded: u64,
    trackers: TrackerPresence,
    headers: BTreeMap<&'static str, HeaderPresence>,
    outcomes: BTreeMap<&'static str, OutcomeCounts>,
    coverage: PolicyCoverage,
    consent: BTreeMap<String, u64>,
    cookie_counts: Vec<f64>,
    hit_ratios: Vec<f64>,
    header_totals: Vec<f64>,
    tls: BTreeMap<String, u64>,
    fingerprinting: FingerprintPrevalence,
}

impl Accumulator {
    fn new(rules: &[&'static str]) -> Self {
        let mut acc = Self::default();
        for header in SecurityHeader::ALL {
            acc.headers.insert(header.as_str(), HeaderPresence::default());
        }
        for rule in rules {
            acc.outcomes.insert(*rule, OutcomeCounts::default());
        }
        for grade in TlsGrade::ALL {
            acc.tls.insert(grade.as_str().to_string(), 0);
        }
        acc.tls.insert(UNKNOWN_KEY.to_string(), 0);
        acc
    }

    fn add_domain(&mut self, profile: Option<&TechnicalProfile>, claims: Option<&DomainClaimRecord>, score: Option<f64>) {
        self.domains += 1;
        match score {
            Some(s) => self.scores.push(s),
            None => self.excluded += 1,
        }

        let unknown = Observation::Unknown;
        let categories = profile.map_or(&unknown, |p| &p.tracker_categories_present);
        match categories.known() {
            Some(set) => {
                self.trackers.known += 1;
                if !set.is_empty() {
                    self.trackers.with_any += 1;
                }
                if set.iter().any(|c| *c != TrackerCategory::Other) {
                    self.trackers.with_classified += 1;
                }
            }
            None => self.trackers.unknown += 1,
        }

        let headers = profile.and_then(|p| p.security_headers_present.known());
        for header in SecurityHeader::ALL {
            let slot = self.headers.entry(header.as_str()).or_default();
            match headers {
                Some(set) if set.contains(&header) => slot.present += 1,
                Some(_) => slot.absent += 1,
                None => slot.unknown += 1,
            }
        }

        if let Some(c) = claims {
            self.coverage.with_claims += 1;
            if c.has_policy() {
                self.coverage.with_privacy_policy += 1;
            }
            if c.has_cookie_policy {
                self.coverage.with_cookie_policy += 1;
            }
            let key = c
                .consent_mechanism
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| UNKNOWN_KEY.to_string());
            *self.consent.entry(key).or_insert(0) += 1;
        }

        if let Some(p) = profile {
            if let Some(n) = p.cookie_count.known() {
                self.cookie_counts.push(*n as f64);
            }
            if let Some(r) = p.tracker_hit_ratio().known() {
                self.hit_ratios.push(*r);
            }
            if let Some(t) = p.total_security_headers().known() {
                self.header_totals.push(*t as f64);
            }
        }

        let grade = profile
            .and_then(|p| p.tls_grade.known().copied())
            .map_or(UNKNOWN_KEY, |g| g.as_str());
        *self.tls.entry(grade.to_string()).or_insert(0) += 1;

        match profile.and_then(|p| p.fingerprinting_techniques_detected.known()) {
            Some(techniques) => {
                self.fingerprinting.known += 1;
                if !techniques.is_empty() {
                    self.fingerprinting.detected += 1;
                }
            }
            None => self.fingerprinting.unknown += 1,
        }
    }

    fn add_outcome(&mut self, rule: &'static str, outcome: Outcome) {
        self.outcomes.entry(rule).or_default().add(outcome);
    }

    fn finish(mut self) -> GroupMetrics {
        let mean_score = mean(&self.scores).map(|m| (m * 1000.0).round() / 1000.0);

        self.trackers.pct_with_any = percent(self.trackers.with_any, self.trackers.known);
        self.trackers.pct_with_classified = percent(self.trackers.with_classified, self.trackers.known);
        for slot in self.headers.values_mut() {
            slot.pct_present = percent(slot.present, slot.present + slot.absent);
        }
        self.coverage.pct_with_claims = percent(self.coverage.with_claims, self.domains);
        self.coverage.pct_with_privacy_policy = percent(self.coverage.with_privacy_policy, self.domains);
        self.coverage.pct_with_cookie_policy = percent(self.coverage.with_cookie_policy, self.domains);
        self.fingerprinting.pct_detected = percent(self.fingerprinting.detected, self.fingerprinting.known);

        GroupMetrics {
            domains: self.domains,
            scored: self.scores.len() as u64,
            excluded: self.excluded,
            mean_score,
            trackers: self.trackers,
            security_headers: self.headers,
            rule_outcomes: self.outcomes,
            policy_coverage: self.coverage,
            consent_mechanisms: self.consent,
            robust: RobustMetrics {
                cookie_count: robust_stats(&self.cookie_counts),
                tracker_hit_ratio: robust_stats(&self.hit_ratios),
                total_security_headers: robust_stats(&self.header_totals),
            },
            tls_grades: self.tls,
            fingerprinting: self.fingerprinting,
        }
    }
}

/// Aggregate one run into per-country and global metrics.
pub fn aggregate_metrics(inputs: MetricsInputs<'_>, countries: &CountryResolver) -> MetricsReport {
    let domains: BTreeSet<&HostName> = inputs
        .profiles
        .keys()
        .chain(inputs.claims.keys())
        .chain(inputs.evaluation.scores.keys())
        .collect();

    let mut global = Accumulator::new(inputs.rules);
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut group_of: BTreeMap<&HostName, String> = BTreeMap::new();

    for domain in domains {
        let group = countries.group_of(domain);
        let profile = inputs.profiles.get(domain);
        let claims = inputs.claims.get(domain);
        let score = inputs.evaluation.scores.get(domain).and_then(|s| s.score);
        global.add_domain(profile, claims, score);
        groups
            .entry(group.clone())
            .or_insert_with(|| Accumulator::new(inputs.rules))
            .add_domain(profile, claims, score);
        group_of.insert(domain, group);
    }

    for verdict in &inputs.evaluation.verdicts {
        global.add_outcome(verdict.rule_id, verdict.outcome);
        if let Some(acc) = group_of.get(&verdict.domain).and_then(|g| groups.get_mut(g)) {
            acc.add_outcome(verdict.rule_id, verdict.outcome);
        }
    }

    let report = MetricsReport {
        global: global.finish(),
        countries: groups.into_iter().map(|(k, acc)| (k, acc.finish())).collect(),
    };
    tracing::info!(
        domains = report.global.domains,
        countries = report.countries.len(),
        scored = report.global.scored,
        excluded = report.global.excluded,
        "aggregated metrics"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use privcheck_compliance::{ComplianceEngine, RuleRegistry};

    fn host(s: &str) -> HostName {
        HostName::parse(s).unwrap()
    }

    fn run(
        profiles: &BTreeMap<HostName, TechnicalProfile>,
        claims: &BTreeMap<HostName, DomainClaimRecord>,
    ) -> MetricsReport {
        let resolver = CountryResolver::new();
        let registry = RuleRegistry::builtin();
        let evaluation = ComplianceEngine::new(registry.clone()).evaluate(profiles, claims, &resolver);
        let rules = registry.ids();
        aggregate_metrics(
            MetricsInputs {
                profiles,
                claims,
                evaluation: &evaluation,
                rules: &rules,
            },
            &resolver,
        )
    }

    fn measured(domain: &str, cookies: u64, categories: &[TrackerCategory]) -> (HostName, TechnicalProfile) {
        let d = host(domain);
        let mut p = TechnicalProfile::unknown(d.clone());
        p.cookie_count = Observation::Observed(cookies);
        p.third_party_cookie_count = Observation::Observed(0);
        p.tracker_categories_present = Observation::Observed(categories.iter().copied().collect());
        p.security_headers_present = Observation::Observed([SecurityHeader::StrictTransportSecurity].into());
        (d, p)
    }

    #[test]
    fn groups_by_country_and_excludes_unscored() {
        let profiles: BTreeMap<_, _> = [
            measured("a.gob.es", 3, &[TrackerCategory::Analytics]),
            measured("b.gob.es", 0, &[]),
            measured("c.gov.uk", 1, &[TrackerCategory::Other]),
        ]
        .into_iter()
        .collect();
        let mut claim = DomainClaimRecord::new(host("a.gob.es"));
        claim.declares_cookie_use = Some(true);
        claim.has_privacy_policy = true;
        let claims = BTreeMap::from([(host("a.gob.es"), claim)]);

        let report = run(&profiles, &claims);
        assert_eq!(report.global.domains, 3);
        assert_eq!(report.global.scored, 1);
        assert_eq!(report.global.excluded, 2);
        assert_eq!(report.countries.keys().collect::<Vec<_>>(), ["ES", "GB"]);

        let es = &report.countries["ES"];
        assert_eq!(es.domains, 2);
        assert_eq!(es.trackers.with_any, 1);
        assert_eq!(es.trackers.pct_with_any, Some(50.0));
        assert_eq!(es.policy_coverage.with_privacy_policy, 1);
        assert_eq!(es.consent_mechanisms[UNKNOWN_KEY], 1);

        let gb = &report.countries["GB"];
        assert_eq!(gb.trackers.with_any, 1);
        assert_eq!(gb.trackers.with_classified, 0);
    }

    #[test]
    fn unknown_facts_are_reported_not_zeroed() {
        let d = host("dark.gob.es");
        let profiles = BTreeMap::from([(d.clone(), TechnicalProfile::unknown(d))]);
        let report = run(&profiles, &BTreeMap::new());
        let g = &report.global;
        assert_eq!(g.trackers.unknown, 1);
        assert_eq!(g.trackers.pct_with_any, None);
        assert_eq!(g.security_headers["strict-transport-security"].unknown, 1);
        assert_eq!(g.security_headers["strict-transport-security"].pct_present, None);
        assert_eq!(g.tls_grades[UNKNOWN_KEY], 1);
        assert_eq!(g.mean_score, None);
        assert_eq!(g.rule_outcomes["undeclared_cookie_use"].indeterminate, 1);
    }

    #[test]
    fn header_presence_over_known_only() {
        let profiles: BTreeMap<_, _> = [measured("a.gob.es", 0, &[]), measured("b.gob.es", 0, &[])]
            .into_iter()
            .chain([(host("c.gob.es"), TechnicalProfile::unknown(host("c.gob.es")))])
            .collect();
        let report = run(&profiles, &BTreeMap::new());
        let hsts = &report.global.security_headers["strict-transport-security"];
        assert_eq!((hsts.present, hsts.absent, hsts.unknown), (2, 0, 1));
        assert_eq!(hsts.pct_present, Some(100.0));
        let csp = &report.global.security_headers["content-security-policy"];
        assert_eq!(csp.pct_present, Some(0.0));
    }

    #[test]
    fn outcome_counts_cover_every_rule() {
        let (d, p) = measured("a.gob.es", 2, &[]);
        let report = run(&BTreeMap::from([(d, p)]), &BTreeMap::new());
        assert_eq!(report.global.rule_outcomes.len(), 8);
        let total: u64 = report
            .global
            .rule_outcomes
            .values()
            .map(|c| c.compliant + c.violation + c.not_applicable + c.indeterminate)
            .sum();
        assert_eq!(total, 8);
    }
}
