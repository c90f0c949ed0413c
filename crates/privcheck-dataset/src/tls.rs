//! # TLS Classification
//!
//! Protocol version parsing, cipher suite classification, and the letter
//! grade summarizing a domain's TLS posture.
//!
//! ## Suite classes
//!
//! - Forward secret: key exchange is `ECDHE`/`DHE`, or the suite is a TLS
//!   1.3 suite (`TLS_AES_*`, `TLS_CHACHA20_*`), which is always ephemeral.
//! - Weak: names containing `RC4`, `3DES`, `DES`, `NULL`, `EXPORT`, `MD5`,
//!   `PSK`, `ADH` or `ANON`, plus any pre-1.3 suite without an ephemeral
//!   key exchange.
//!
//! ## Grades
//!
//! | Grade | Condition |
//! |-------|-----------|
//! | `F` | highest version is TLS 1.0 or older |
//! | `C` | any weak suite, or highest version is TLS 1.1 |
//! | `A` | TLS 1.3 supported, no weak suites, every suite forward secret, HSTS |
//! | `B` | everything else (TLS 1.2+, no weak suites) |

use std::collections::BTreeSet;

use serde::Serialize;

/// SSL/TLS protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TlsVersion {
    /// SSL 2.0.
    #[serde(rename = "SSLv2")]
    Ssl2,
    /// SSL 3.0.
    #[serde(rename = "SSLv3")]
    Ssl3,
    /// TLS 1.0.
    #[serde(rename = "TLSv1.0")]
    Tls10,
    /// TLS 1.1.
    #[serde(rename = "TLSv1.1")]
    Tls11,
    /// TLS 1.2.
    #[serde(rename = "TLSv1.2")]
    Tls12,
    /// TLS 1.3.
    #[serde(rename = "TLSv1.3")]
    Tls13,
}

impl TlsVersion {
    /// Parse the spellings scanners use: `TLS_1_3`, `TLSv1.3`, `tls1.3`,
    /// `TLS 1.2`, `SSL_3_0`, `1.2`.
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        let (is_ssl, digits) = if let Some(rest) = compact.strip_prefix("ssl") {
            (true, rest.trim_start_matches('v'))
        } else if let Some(rest) = compact.strip_prefix("tls") {
            (false, rest.trim_start_matches('v'))
        } else {
            (false, compact.as_str())
        };
        match (is_ssl, digits) {
            (true, "2" | "20") => Some(Self::Ssl2),
            (true, "3" | "30") => Some(Self::Ssl3),
            (false, "1" | "10") => Some(Self::Tls10),
            (false, "11") => Some(Self::Tls11),
            (false, "12") => Some(Self::Tls12),
            (false, "13") => Some(Self::Tls13),
            _ => None,
        }
    }
}

/// Letter grade of a domain's TLS configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TlsGrade {
    /// Modern and strict.
    A,
    /// Sound.
    B,
    /// Weak suites or TLS 1.1.
    C,
    /// TLS 1.0 or SSL.
    F,
}

impl TlsGrade {
    /// All grades, best first.
    pub const ALL: [TlsGrade; 4] = [Self::A, Self::B, Self::C, Self::F];

    /// Single-letter name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::F => "F",
        }
    }
}

const WEAK_MARKERS: [&str; 9] = ["RC4", "3DES", "DES", "NULL", "EXPORT", "MD5", "PSK", "ADH", "ANON"];
const TLS13_PREFIXES: [&str; 2] = ["TLS_AES_", "TLS_CHACHA20_"];

/// Whether the suite is a TLS 1.3 suite.
pub fn is_tls13_suite(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    TLS13_PREFIXES.iter().any(|p| upper.starts_with(p))
}

/// Whether the suite provides forward secrecy.
pub fn is_forward_secret(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    is_tls13_suite(&upper) || upper.contains("ECDHE") || upper.contains("DHE")
}

/// Whether the suite is weak.
pub fn is_weak(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    WEAK_MARKERS.iter().any(|m| upper.contains(m)) || !is_forward_secret(&upper)
}

/// Derive supported versions from the highest version and suite names.
pub fn derive_protocols(max: Option<TlsVersion>, suites: &[String]) -> BTreeSet<TlsVersion> {
    let mut out = BTreeSet::new();
    out.extend(max);
    for s in suites {
        if is_tls13_suite(s) {
            out.insert(TlsVersion::Tls13);
        } else {
            out.insert(TlsVersion::Tls12);
        }
    }
    if let Some(max) = max {
        out.retain(|v| *v <= max);
    }
    out
}

/// Inputs to the grade, all measured on one domain.
#[derive(Debug, Clone, Copy)]
pub struct GradeInputs<'a> {
    /// Highest accepted version.
    pub max_version: Option<TlsVersion>,
    /// All accepted versions.
    pub protocols: &'a BTreeSet<TlsVersion>,
    /// Accepted suite count.
    pub suites_total: u32,
    /// Forward-secret suite count.
    pub suites_fs: u32,
    /// Weak suite count.
    pub suites_weak: u32,
    /// HSTS seen.
    pub hsts: bool,
}

/// Grade a TLS configuration; `None` when no version is known.
pub fn grade(inputs: GradeInputs<'_>) -> Option<TlsGrade> {
    let max = inputs.max_version.or_else(|| inputs.protocols.iter().next_back().copied())?;
    let grade = if max <= TlsVersion::Tls10 {
        TlsGrade::F
    } else if inputs.suites_weak > 0 || max == TlsVersion::Tls11 {
        TlsGrade::C
    } else if inputs.protocols.contains(&TlsVersion::Tls13)
        && inputs.suites_total > 0
        && inputs.suites_fs == inputs.suites_total
        && inputs.hsts
    {
        TlsGrade::A
    } else {
        TlsGrade::B
    };
    Some(grade)
}
