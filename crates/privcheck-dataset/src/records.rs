//! # Raw Measurement Records
//!
//! One struct per JSON Lines source. Fields mirror what the collectors
//! emit; hosts stay raw strings here and are parsed during enrichment or
//! building, so a bad host becomes a ledger entry instead of a failed line.
//!
//! Collector flags arrive as booleans, `0`/`1` integers, or strings
//! (`"true"`, `"1"`); [`Flag`] accepts all of them.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// Tolerant boolean as written by measurement collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flag(pub bool);

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Flag(truthy(&value)))
    }
}

/// Interpret a JSON value as a collector flag.
pub(crate) fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y")
        }
        _ => false,
    }
}

/// An instant as written by collectors: Unix seconds or a date string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawInstant {
    /// Unix epoch seconds, possibly fractional.
    Seconds(f64),
    /// RFC 3339 or a numeric string.
    Text(String),
}

/// Cipher suites as a `;`-separated string or a JSON array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SuiteList {
    /// `TLS_AES_128_GCM_SHA256;ECDHE-RSA-AES128-GCM-SHA256`
    Joined(String),
    /// `["TLS_AES_128_GCM_SHA256", ...]`
    List(Vec<String>),
}

impl SuiteList {
    /// The non-empty suite names.
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Joined(s) => s
                .split(';')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect(),
            Self::List(v) => v
                .iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }
}

/// A cookie observed while crawling `domain`.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieRecord {
    /// Site under test.
    pub domain: String,
    /// Host that set the cookie (`host` in browser cookie stores).
    #[serde(alias = "host")]
    pub hostname: String,
    /// When the cookie was observed.
    #[serde(default)]
    pub timestamp: Option<RawInstant>,
    /// Cookie name.
    #[serde(default)]
    pub name: Option<String>,
    /// Hash of the cookie value.
    #[serde(default)]
    pub value_hash: Option<String>,
    /// Cookie path.
    #[serde(default)]
    pub path: Option<String>,
    /// Session cookie flag.
    #[serde(default)]
    pub is_session: Flag,
    /// `Secure` attribute.
    #[serde(default)]
    pub is_secure: Flag,
    /// `HttpOnly` attribute.
    #[serde(default)]
    pub is_http_only: Flag,
    /// `SameSite` attribute (`none`, `lax`, `strict`, or absent).
    #[serde(default)]
    pub same_site: Option<String>,
    /// Expiry instant.
    #[serde(default)]
    pub expiry: Option<RawInstant>,
}

/// An HTTP request issued while crawling `domain`.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestRecord {
    /// Site under test.
    pub domain: String,
    /// Requested host; derived from `url` when absent.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Full request URL.
    #[serde(default)]
    pub url: Option<String>,
    /// HTTP method.
    #[serde(default)]
    pub method: Option<String>,
    /// Browser resource type (`script`, `image`, `main_frame`, ...).
    #[serde(default)]
    pub resource_type: Option<String>,
    /// When the request was observed.
    #[serde(default)]
    pub timestamp: Option<RawInstant>,
}

/// Security-header summary for the main document of `domain`.
///
/// Accepts either one column per header (`"strict-transport-security": 1`)
/// or a `headers` array of present header names.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderRecord {
    /// Site under test.
    pub domain: String,
    /// Names of present headers.
    #[serde(default)]
    pub headers: Option<Vec<String>>,
    /// Per-header flag columns and anything else on the line.
    #[serde(flatten)]
    pub columns: BTreeMap<String, serde_json::Value>,
}

/// One flattened TLS scan result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsRecord {
    /// Scanned domain.
    pub domain: String,
    /// Non-empty when the scan failed.
    #[serde(default)]
    pub tls_error: Option<String>,
    /// Highest protocol version accepted (`TLS_1_3`, `TLSv1.2`, ...).
    #[serde(default)]
    pub tls_version_max: Option<String>,
    /// Explicit list of supported protocol versions.
    #[serde(default)]
    pub tls_protocols: Option<Vec<String>>,
    /// Leaf public-key algorithm.
    #[serde(default)]
    pub tls_key_alg: Option<String>,
    /// Leaf public-key size in bits.
    #[serde(default)]
    pub tls_key_size: Option<u32>,
    /// Elliptic curve of the leaf key.
    #[serde(default)]
    pub tls_curve: Option<String>,
    /// Root issuer distinguished name.
    #[serde(default)]
    pub tls_cert_issuer: Option<String>,
    /// Certificate `notAfter`; preferred over the precomputed day count.
    #[serde(default)]
    pub tls_not_valid_after: Option<RawInstant>,
    /// Precomputed days until certificate expiry.
    #[serde(default)]
    pub tls_days_until_expiry: Option<i64>,
    /// Accepted cipher suite names.
    #[serde(default)]
    pub tls_cipher_suites_list: Option<SuiteList>,
    /// Accepted cipher suite count, used when no list is given.
    #[serde(default)]
    pub tls_cipher_suites_total: Option<u32>,
    /// Forward-secret suite count, used when no list is given.
    #[serde(default)]
    pub tls_cipher_suites_fs: Option<u32>,
    /// Weak suite count, used when no list is given.
    #[serde(default)]
    pub tls_cipher_suites_weak: Option<u32>,
    /// `Strict-Transport-Security` seen by the scanner.
    #[serde(default)]
    pub tls_hsts: Flag,
}

/// One flattened fingerprinting scan result.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FingerprintRecord {
    /// Scanned domain.
    pub domain: String,
    /// Canvas readback detected.
    #[serde(default, alias = "fp_canvas")]
    pub canvas: Flag,
    /// AudioContext fingerprinting detected.
    #[serde(default, alias = "audioCtx", alias = "fp_audioCtx")]
    pub audio_ctx: Flag,
    /// WebRTC local-address probing detected.
    #[serde(default, alias = "fp_rtc")]
    pub rtc: Flag,
    /// Storage enumeration detected.
    #[serde(default, alias = "fp_storage")]
    pub storage: Flag,
}
