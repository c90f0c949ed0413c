//! Per-domain compliance scores.

use privcheck_core::HostName;
use privcheck_dataset::builder::ratio;
use serde::Serialize;

use crate::engine::Verdict;
use crate::outcome::Outcome;

/// Outcome tally and score for one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainScore {
    pub domain: HostName,
    pub compliant: u32,
    pub violations: u32,
    pub not_applicable: u32,
    pub indeterminate: u32,
    /// `compliant / (compliant + violations)`, three decimals; `None` when
    /// no rule reached a decisive outcome.
    pub score: Option<f64>,
}

impl DomainScore {
    /// Tally one domain's verdicts.
    pub fn from_verdicts(domain: HostName, verdicts: &[Verdict]) -> Self {
        let count = |o: Outcome| verdicts.iter().filter(|v| v.outcome == o).count() as u32;
        let compliant = count(Outcome::Compliant);
        let violations = count(Outcome::Violation);
        Self {
            domain,
            compliant,
            violations,
            not_applicable: count(Outcome::NotApplicable),
            indeterminate: count(Outcome::Indeterminate),
            score: compliance_score(compliant, violations),
        }
    }

    /// Whether the score is defined.
    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }
}

/// `compliant / (compliant + violations)`; `None` when both are zero.
pub fn compliance_score(compliant: u32, violations: u32) -> Option<f64> {
    let decisive = u64::from(compliant) + u64::from(violations);
    (decisive > 0).then(|| ratio(u64::from(compliant), decisive))
}
