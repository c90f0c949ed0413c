//! # Error Ledger
//!
//! Per-domain record of everything that went wrong without stopping the
//! run: malformed lines, sources that did not cover a domain, conflicting
//! policy claims, failed TLS scans.
//!
//! Keys are normalized domain strings. Lines that cannot be attributed to
//! any domain are filed under [`UNATTRIBUTED`]. Entries for one domain keep
//! the order in which they were recorded; callers record sequentially after
//! parallel stages so that the ledger is deterministic.

use std::collections::BTreeMap;

use serde::Serialize;

/// Ledger key for entries with no parseable domain.
pub const UNATTRIBUTED: &str = "unattributed";

/// Input source an entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Cookie crawl.
    Cookies,
    /// Request crawl.
    Requests,
    /// Security-header summaries.
    Headers,
    /// Flattened TLS scans.
    Tls,
    /// Flattened fingerprinting scans.
    Fingerprinting,
    /// Policy claim documents.
    Policies,
}

impl Source {
    /// All measurement sources feeding the master dataset.
    pub const MEASUREMENTS: [Source; 5] = [
        Self::Cookies,
        Self::Requests,
        Self::Headers,
        Self::Tls,
        Self::Fingerprinting,
    ];

    /// Snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cookies => "cookies",
            Self::Requests => "requests",
            Self::Headers => "headers",
            Self::Tls => "tls",
            Self::Fingerprinting => "fingerprinting",
            Self::Policies => "policies",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// A line or field that could not be parsed; excluded from counts.
    MalformedRecord,
    /// A configured source had no data for a domain other sources cover.
    MissingSource,
    /// Policy documents disagree on a claim; resolved by disjunction.
    ConflictingClaim,
    /// The TLS scanner reported an error for the domain.
    TlsScanError,
}

/// One ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    /// What happened.
    pub kind: LedgerKind,
    /// Which source it concerns.
    pub source: Source,
    /// Field or rule involved, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// 1-based input line, when the entry came from a line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Human-readable detail.
    pub detail: String,
}

impl LedgerEntry {
    /// A malformed-record entry.
    pub fn malformed(source: Source, line: Option<usize>, field: Option<&str>, detail: impl Into<String>) -> Self {
        Self {
            kind: LedgerKind::MalformedRecord,
            source,
            field: field.map(str::to_string),
            line,
            detail: detail.into(),
        }
    }

    /// A missing-source entry.
    pub fn missing_source(source: Source) -> Self {
        Self {
            kind: LedgerKind::MissingSource,
            source,
            field: None,
            line: None,
            detail: format!("no {source} data for this domain"),
        }
    }

    /// A conflicting-claim entry for one policy field.
    pub fn conflicting_claim(field: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: LedgerKind::ConflictingClaim,
            source: Source::Policies,
            field: Some(field.to_string()),
            line: None,
            detail: detail.into(),
        }
    }
}

/// The per-domain error ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorLedger {
    entries: BTreeMap<String, Vec<LedgerEntry>>,
}

impl ErrorLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry under `domain` (or [`UNATTRIBUTED`] when blank).
    pub fn record(&mut self, domain: &str, entry: LedgerEntry) {
        let key = domain.trim().to_ascii_lowercase();
        let key = if key.is_empty() { UNATTRIBUTED.to_string() } else { key };
        tracing::debug!(
            domain = %key,
            source = %entry.source,
            kind = ?entry.kind,
            detail = %entry.detail,
            "ledger entry"
        );
        self.entries.entry(key).or_default().push(entry);
    }

    /// Append every entry of `other`, keeping `other`'s per-domain order.
    pub fn merge(&mut self, other: ErrorLedger) {
        for (domain, entries) in other.entries {
            self.entries.entry(domain).or_default().extend(entries);
        }
    }

    /// Entries for one domain.
    pub fn for_domain(&self, domain: &str) -> &[LedgerEntry] {
        self.entries.get(domain).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterate domains and their entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[LedgerEntry])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether no entry was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries of one kind.
    pub fn count_kind(&self, kind: LedgerKind) -> usize {
        self.entries
            .values()
            .flatten()
            .filter(|e| e.kind == kind)
            .count()
    }
}
