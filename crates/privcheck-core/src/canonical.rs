//! # Canonical Serialization
//!
//! `CanonicalBytes` is the sole construction path for bytes used in digest
//! computation. Run artifacts are digested through it so that the manifest of
//! two runs over identical inputs is byte-identical.
//!
//! ## Invariant
//!
//! The inner field is private. The only constructor serializes through
//! `serde_jcs` (RFC 8785): sorted object keys, compact separators, and a
//! fixed number formatting. Profile ratios are floats, so unlike a
//! strict-integer scheme the canonical form accepts finite floats; non-finite
//! values never reach it because `serde_json` maps them to `null`.

use serde::Serialize;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is [`CanonicalBytes::new()`].
/// - Object keys are sorted, separators are compact.
/// - Equal values always produce equal bytes, independent of map insertion
///   order in the source structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError::SerializationFailed`] if the value
    /// cannot be represented as JSON.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
