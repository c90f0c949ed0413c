#![deny(missing_docs)]

//! # privcheck-core: Foundational Types
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **Hosts are parsed, never compared as raw strings.** [`HostName`]
//!    normalizes and validates at construction, and the registrable-domain
//!    boundary comes from the public suffix list, so `a.gob.mx` and
//!    `b.gob.mx` are correctly different sites.
//!
//! 2. **Unknown is not zero.** [`Observation`] separates "the source had no
//!    data for this domain" from "the source had data and the feature was
//!    absent". No profile field is ever a bare numeric default.
//!
//! 3. **[`CanonicalBytes`] is the sole path to digest computation.** Run
//!    artifacts are digested over sorted-key compact JSON so that identical
//!    inputs produce identical manifests.
//!
//! 4. **[`PrivcheckError`] hierarchy.** Structured errors with `thiserror`,
//!    no `.unwrap()` outside tests.

pub mod canonical;
pub mod country;
pub mod digest;
pub mod error;
pub mod host;
pub mod observation;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use country::CountryCode;
pub use digest::{sha256_digest, sha256_hex, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, PrivcheckError, ValidationError};
pub use host::HostName;
pub use observation::Observation;
pub use temporal::{parse_instant, Timestamp};
