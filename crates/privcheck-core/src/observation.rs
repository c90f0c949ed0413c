//! # Observation Tri-State
//!
//! Every measured fact in a technical profile is an [`Observation<T>`]:
//!
//! - `Unknown`: the source that would report this fact had no data for the
//!   domain (the TLS scan never reached it, no cookie crawl covered it).
//! - `Observed(value)`: the source covered the domain, and `value` is what it
//!   saw. An empty set or a zero count here means "looked, found nothing".
//!
//! The distinction drives the compliance engine: an unknown fact yields an
//! INDETERMINATE verdict, while an observed zero can yield COMPLIANT.
//!
//! Serializes as `null` for `Unknown` and as the bare value otherwise.

use serde::{Deserialize, Serialize};

/// A fact that is either unknown or observed with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation<T> {
    /// The source for this fact did not cover the domain.
    Unknown,
    /// The source covered the domain and reported this value.
    Observed(T),
}

impl<T> Default for Observation<T> {
    fn default() -> Self {
        Self::Unknown
    }
}

impl<T> Observation<T> {
    /// Whether the fact was observed.
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Observed(_))
    }

    /// Borrow the observed value, if any.
    pub fn known(&self) -> Option<&T> {
        match self {
            Self::Observed(v) => Some(v),
            Self::Unknown => None,
        }
    }

    /// Consume into an `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Observed(v) => Some(v),
            Self::Unknown => None,
        }
    }

    /// Borrow the inner value.
    pub fn as_ref(&self) -> Observation<&T> {
        match self {
            Self::Observed(v) => Observation::Observed(v),
            Self::Unknown => Observation::Unknown,
        }
    }

    /// Transform an observed value; `Unknown` stays `Unknown`.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Observation<U> {
        match self {
            Self::Observed(v) => Observation::Observed(f(v)),
            Self::Unknown => Observation::Unknown,
        }
    }

    /// Chain a derivation that may itself be unknown.
    pub fn and_then<U, F: FnOnce(T) -> Observation<U>>(self, f: F) -> Observation<U> {
        match self {
            Self::Observed(v) => f(v),
            Self::Unknown => Observation::Unknown,
        }
    }

    /// Pair two observations; known only when both are known.
    pub fn zip<U>(self, other: Observation<U>) -> Observation<(T, U)> {
        match (self, other) {
            (Self::Observed(a), Observation::Observed(b)) => Observation::Observed((a, b)),
            _ => Observation::Unknown,
        }
    }
}

impl<T> From<Option<T>> for Observation<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Observed(v),
            None => Self::Unknown,
        }
    }
}
