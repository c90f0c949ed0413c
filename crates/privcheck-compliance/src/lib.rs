//! # privcheck-compliance: Claims Against Facts
//!
//! Compares what each site says in its policies ([`DomainClaimRecord`]
//! from `privcheck-claims`) with what the crawl observed
//! ([`TechnicalProfile`] from `privcheck-dataset`).
//!
//! - **Rules** (`rules.rs`): the built-in rule table. Every rule is data:
//!   id, claim field, fact field, and a pure predicate.
//! - **Registry** (`registry.rs`): the rules a run evaluates, optionally
//!   narrowed by configuration.
//! - **Engine** (`engine.rs`): one [`Verdict`] per (domain, rule), with
//!   the shared `no_policy_found` and `fact_unknown` handling.
//! - **Score** (`score.rs`): `COMPLIANT / (COMPLIANT + VIOLATION)` per
//!   domain, undefined when nothing was decisive.
//!
//! [`DomainClaimRecord`]: privcheck_claims::DomainClaimRecord
//! [`TechnicalProfile`]: privcheck_dataset::TechnicalProfile

pub mod engine;
pub mod outcome;
pub mod registry;
pub mod rules;
pub mod score;

pub use engine::{ComplianceEngine, CountryLookup, Evaluation, Evidence, Verdict, FACT_UNKNOWN, NO_POLICY_FOUND};
pub use outcome::Outcome;
pub use registry::{RegistryError, RuleRegistry};
pub use rules::{ClaimValue, Decision, FactContext, FactValue, Rule, BUILTIN_RULES};
pub use score::{compliance_score, DomainScore};
