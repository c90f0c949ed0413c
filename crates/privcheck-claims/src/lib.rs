//! # privcheck-claims: Policy Claims
//!
//! What sites say about themselves, as opposed to what the crawl saw.
//!
//! - **Documents** (`document.rs`): [`PolicyClaim`], one extracted policy
//!   document, with lenient normalization of free-text fields.
//! - **Aggregator** (`aggregate.rs`): [`aggregate_claims`] folds a domain's
//!   documents into one disjunctive [`DomainClaimRecord`].
//!
//! A domain with no documents has no record at all. Downstream, that is
//! "no policy found", which is different from a record whose claims are
//! all silent.

pub mod aggregate;
pub mod document;

pub use aggregate::{aggregate_claims, ClaimAggregation, ClaimConflict, DomainClaimRecord, RightsSummary};
pub use document::{
    is_silent, ConsentMechanism, CookieDuration, CookieOwnership, DocType, DurationField, PolicyClaim, PolicyDetails, Rights,
    TransferScope,
};
