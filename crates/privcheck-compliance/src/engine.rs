//! # Compliance Engine
//!
//! Evaluates every rule of a [`RuleRegistry`] against every domain that has
//! a technical profile, a claim record, or both.
//!
//! ## Semantics
//!
//! For each (domain, rule):
//!
//! 1. No claim record for the domain: `INDETERMINATE`, `no_policy_found`.
//! 2. The rule's fact is unknown: `INDETERMINATE`, `fact_unknown`.
//! 3. Otherwise the rule's predicate decides.
//!
//! A domain with claims but no profile is evaluated against an all-unknown
//! profile. Domains are evaluated in parallel; verdicts come back ordered
//! by domain, then registry order.

use std::collections::{BTreeMap, BTreeSet};

use privcheck_claims::DomainClaimRecord;
use privcheck_core::{CountryCode, HostName, Observation};
use privcheck_dataset::TechnicalProfile;
use rayon::prelude::*;
use serde::Serialize;

use crate::outcome::Outcome;
use crate::registry::RuleRegistry;
use crate::rules::{ClaimValue, FactContext, FactValue, Rule};
use crate::score::DomainScore;

/// Reason code when the domain has no policy documents.
pub const NO_POLICY_FOUND: &str = "no_policy_found";

/// Reason code when the rule's fact was not measured.
pub const FACT_UNKNOWN: &str = "fact_unknown";

// ---------------------------------------------------------------------------
// Country lookup
// ---------------------------------------------------------------------------

/// Assigns a country to a domain, for rules that compare jurisdictions.
pub trait CountryLookup: Sync {
    /// The domain's country, if one can be assigned.
    fn country_of(&self, domain: &HostName) -> Option<CountryCode>;
}

impl CountryLookup for BTreeMap<HostName, CountryCode> {
    fn country_of(&self, domain: &HostName) -> Option<CountryCode> {
        self.get(domain).cloned()
    }
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// The claim/fact pair a verdict compared.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    /// Name of the claim field read.
    pub claim_field: &'static str,
    /// `None` when the domain has no claim record.
    pub claim: Option<ClaimValue>,
    /// Name of the fact field read.
    pub fact_field: &'static str,
    /// The measured fact, `null` when unknown.
    pub fact: Observation<FactValue>,
}

/// One rule's outcome on one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Evaluated domain.
    pub domain: HostName,
    /// Registry id of the rule.
    pub rule_id: &'static str,
    /// What the rule concluded.
    pub outcome: Outcome,
    /// Stable reason code.
    pub reason: &'static str,
    /// The values compared.
    pub evidence: Evidence,
}

/// Everything one engine run produced.
#[derive(Debug, Clone, Default)]
pub struct Evaluation {
    /// Verdicts ordered by domain, then registry order.
    pub verdicts: Vec<Verdict>,
    /// One score per evaluated domain.
    pub scores: BTreeMap<HostName, DomainScore>,
}

impl Evaluation {
    /// Verdicts for one domain.
    pub fn for_domain<'a>(&'a self, domain: &'a HostName) -> impl Iterator<Item = &'a Verdict> + 'a {
        self.verdicts.iter().filter(move |v| &v.domain == domain)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Runs a rule registry over profiles and claim records.
#[derive(Debug, Clone, Default)]
pub struct ComplianceEngine {
    registry: RuleRegistry,
}

impl ComplianceEngine {
    /// Engine over the given rules.
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    /// The rules this engine evaluates.
    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Evaluate every rule on one domain.
    pub fn evaluate_domain(
        &self,
        domain: &HostName,
        profile: &TechnicalProfile,
        claims: Option<&DomainClaimRecord>,
        country: Option<&CountryCode>,
    ) -> Vec<Verdict> {
        let ctx = FactContext { profile, country };
        self.registry
            .iter()
            .map(|rule| evaluate_rule(rule, domain, &ctx, claims))
            .collect()
    }

    /// Evaluate every domain present in `profiles` or `claims`.
    pub fn evaluate(
        &self,
        profiles: &BTreeMap<HostName, TechnicalProfile>,
        claims: &BTreeMap<HostName, DomainClaimRecord>,
        countries: &dyn CountryLookup,
    ) -> Evaluation {
        let domains: Vec<&HostName> = profiles
            .keys()
            .chain(claims.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let per_domain: Vec<(Vec<Verdict>, DomainScore)> = domains
            .par_iter()
            .map(|domain| {
                let fallback;
                let profile = match profiles.get(*domain) {
                    Some(p) => p,
                    None => {
                        fallback = TechnicalProfile::unknown((*domain).clone());
                        &fallback
                    }
                };
                let country = countries.country_of(domain);
                let verdicts = self.evaluate_domain(domain, profile, claims.get(*domain), country.as_ref());
                let score = DomainScore::from_verdicts((*domain).clone(), &verdicts);
                tracing::debug!(
                    domain = %domain,
                    compliant = score.compliant,
                    violations = score.violations,
                    score = ?score.score,
                    "evaluated domain"
                );
                (verdicts, score)
            })
            .collect();

        let mut evaluation = Evaluation::default();
        for (verdicts, score) in per_domain {
            evaluation.verdicts.extend(verdicts);
            evaluation.scores.insert(score.domain.clone(), score);
        }
        let unscored = evaluation.scores.values().filter(|s| !s.is_scored()).count();
        tracing::info!(
            domains = evaluation.scores.len(),
            rules = self.registry.len(),
            verdicts = evaluation.verdicts.len(),
            unscored,
            "compliance evaluation complete"
        );
        evaluation
    }
}

fn evaluate_rule(
    rule: &'static Rule,
    domain: &HostName,
    ctx: &FactContext<'_>,
    claims: Option<&DomainClaimRecord>,
) -> Verdict {
    let fact = (rule.fact)(ctx);
    let claim = claims.map(|c| (rule.claim)(c, ctx));
    let (outcome, reason) = match (&claim, &fact) {
        (None, _) => (Outcome::Indeterminate, NO_POLICY_FOUND),
        (_, Observation::Unknown) => (Outcome::Indeterminate, FACT_UNKNOWN),
        (Some(c), Observation::Observed(f)) => (rule.predicate)(c, f),
    };
    Verdict {
        domain: domain.clone(),
        rule_id: rule.id,
        outcome,
        reason,
        evidence: Evidence {
            claim_field: rule.claim_field,
            claim,
            fact_field: rule.fact_field,
            fact,
        },
    }
}
