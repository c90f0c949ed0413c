//! Verdict outcomes.

use std::fmt;

use serde::Serialize;

/// Outcome of one rule on one domain.
///
/// Only `Compliant` and `Violation` enter the compliance score.
/// `NotApplicable` means the claim makes no statement the fact could
/// contradict; `Indeterminate` means the comparison could not be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Claim and fact agree.
    Compliant,
    /// Claim and fact disagree.
    Violation,
    /// The rule does not apply to what the site claims or does.
    NotApplicable,
    /// No policy, or the fact is unknown.
    Indeterminate,
}

impl Outcome {
    /// All outcomes in output order.
    pub const ALL: [Outcome; 4] = [
        Self::Compliant,
        Self::Violation,
        Self::NotApplicable,
        Self::Indeterminate,
    ];

    /// Upper snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "COMPLIANT",
            Self::Violation => "VIOLATION",
            Self::NotApplicable => "NOT_APPLICABLE",
            Self::Indeterminate => "INDETERMINATE",
        }
    }

    /// Whether the outcome counts toward the score.
    pub fn is_scored(&self) -> bool {
        matches!(self, Self::Compliant | Self::Violation)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
