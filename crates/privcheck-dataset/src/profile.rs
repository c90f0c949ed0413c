//! # Technical Profile
//!
//! One [`TechnicalProfile`] per domain: the headline facts the compliance
//! engine reads, plus per-source detail blocks. Every field is an
//! [`Observation`]; a source that did not cover the domain leaves its
//! fields `Unknown` (`null` in JSON), never zero.

use std::collections::{BTreeMap, BTreeSet};

use privcheck_core::{CountryCode, HostName, Observation};
use privcheck_taxonomy::TrackerCategory;
use serde::Serialize;

use crate::tls::{TlsGrade, TlsVersion};

/// Security headers tracked per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SecurityHeader {
    /// `Strict-Transport-Security`.
    #[serde(rename = "strict-transport-security")]
    StrictTransportSecurity,
    /// `Content-Security-Policy`.
    #[serde(rename = "content-security-policy")]
    ContentSecurityPolicy,
    /// `Permissions-Policy` (or legacy `Feature-Policy`).
    #[serde(rename = "permissions-policy")]
    PermissionsPolicy,
    /// `Referrer-Policy`.
    #[serde(rename = "referrer-policy")]
    ReferrerPolicy,
    /// `X-Frame-Options`.
    #[serde(rename = "x-frame-options")]
    XFrameOptions,
    /// `X-Content-Type-Options`.
    #[serde(rename = "x-content-type-options")]
    XContentTypeOptions,
}

impl SecurityHeader {
    /// All tracked headers.
    pub const ALL: [SecurityHeader; 6] = [
        Self::StrictTransportSecurity,
        Self::ContentSecurityPolicy,
        Self::PermissionsPolicy,
        Self::ReferrerPolicy,
        Self::XFrameOptions,
        Self::XContentTypeOptions,
    ];

    /// Lowercase header name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrictTransportSecurity => "strict-transport-security",
            Self::ContentSecurityPolicy => "content-security-policy",
            Self::PermissionsPolicy => "permissions-policy",
            Self::ReferrerPolicy => "referrer-policy",
            Self::XFrameOptions => "x-frame-options",
            Self::XContentTypeOptions => "x-content-type-options",
        }
    }

    /// Match a header name case-insensitively; `feature-policy` counts as
    /// `permissions-policy`.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if lower == "feature-policy" {
            return Some(Self::PermissionsPolicy);
        }
        Self::ALL.into_iter().find(|h| h.as_str() == lower)
    }
}

/// Browser fingerprinting technique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintTechnique {
    /// Canvas readback.
    Canvas,
    /// AudioContext oscillator fingerprinting.
    AudioContext,
    /// WebRTC local-address probing.
    WebRtc,
    /// Storage enumeration.
    Storage,
}

/// Cookie detail block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieDetails {
    /// Cookies with `Secure`.
    pub secure: u64,
    /// `secure / total`.
    pub secure_ratio: f64,
    /// Cookies with `HttpOnly`.
    pub http_only: u64,
    /// `http_only / total`.
    pub http_only_ratio: f64,
    /// Session cookies.
    pub session: u64,
    /// `session / total`.
    pub session_ratio: f64,
    /// `SameSite=None` cookies.
    pub same_site_none: u64,
    /// `SameSite=Lax` cookies.
    pub same_site_lax: u64,
    /// `SameSite=Strict` cookies.
    pub same_site_strict: u64,
    /// `same_site_none / total`.
    pub same_site_none_ratio: f64,
    /// `same_site_lax / total`.
    pub same_site_lax_ratio: f64,
    /// `same_site_strict / total`.
    pub same_site_strict_ratio: f64,
    /// Shortest remaining lifetime in whole days (may be negative).
    pub expiry_min_days: Option<i64>,
    /// Median remaining lifetime, clipped at 0, one decimal.
    pub expiry_median_days: Option<f64>,
    /// Longest remaining lifetime, clipped at 0.
    pub expiry_max_days: Option<i64>,
    /// `third_party / total`.
    pub third_party_ratio: f64,
    /// Distinct registrable domains setting third-party cookies.
    pub third_party_domains: u64,
    /// Most frequent third-party cookie domains (at most 5).
    pub top_third_party_domains: Vec<String>,
    /// Cookies set by known trackers.
    pub tracker_cookies: u64,
    /// `tracker_cookies / total`.
    pub tracker_cookie_ratio: f64,
}

/// Request detail block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    /// `third_party / total`.
    pub third_party_ratio: f64,
    /// Distinct registrable domains receiving third-party requests.
    pub third_party_domains: u64,
    /// Most frequent third-party request domains (at most 5).
    pub top_third_party_domains: Vec<String>,
    /// Requests to known trackers.
    pub tracker_hits: u64,
    /// `tracker_hits / total`.
    pub tracker_hit_ratio: f64,
    /// Request count per resource type.
    pub resource_types: BTreeMap<String, u64>,
}

/// Security header detail block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderDetails {
    /// Number of tracked security headers present.
    pub total_security_headers: u64,
}

/// TLS detail block.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TlsDetails {
    /// Scanner error; when set, every other field is empty.
    pub scan_error: Option<String>,
    /// Highest accepted version.
    pub version_max: Option<TlsVersion>,
    /// Leaf key algorithm.
    pub key_algorithm: Option<String>,
    /// Leaf key size in bits.
    pub key_size: Option<u32>,
    /// Leaf key curve.
    pub curve: Option<String>,
    /// Root issuer.
    pub cert_issuer: Option<String>,
    /// Days until the certificate expires, relative to the run's `as_of`.
    pub days_until_expiry: Option<i64>,
    /// Accepted cipher suites.
    pub cipher_suites_total: Option<u32>,
    /// Forward-secret suites.
    pub cipher_suites_fs: Option<u32>,
    /// `fs / total`.
    pub cipher_fs_ratio: Option<f64>,
    /// Weak suites.
    pub cipher_suites_weak: Option<u32>,
    /// `weak / total`.
    pub cipher_weak_ratio: Option<f64>,
    /// Weak suite names.
    pub weak_suites: Vec<String>,
    /// HSTS seen by the scanner.
    pub hsts: Option<bool>,
}

/// Fingerprinting detail block.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintDetails {
    /// Number of techniques detected.
    pub methods_total: u64,
    /// Any technique detected.
    pub detected: bool,
}

/// The joined technical facts for one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalProfile {
    /// The site.
    pub domain: HostName,
    /// Cookies observed.
    pub cookie_count: Observation<u64>,
    /// Cookies whose host is outside the site's registrable domain.
    pub third_party_cookie_count: Observation<u64>,
    /// Categories of tracker or third-party hosts among cookies and requests.
    pub tracker_categories_present: Observation<BTreeSet<TrackerCategory>>,
    /// Countries of matched tracker owners.
    pub tracker_owner_countries: Observation<BTreeSet<CountryCode>>,
    /// Requests observed.
    pub request_count: Observation<u64>,
    /// Requests to hosts outside the site's registrable domain.
    pub third_party_request_count: Observation<u64>,
    /// Security headers present on the main document.
    pub security_headers_present: Observation<BTreeSet<SecurityHeader>>,
    /// TLS letter grade.
    pub tls_grade: Observation<TlsGrade>,
    /// Supported protocol versions.
    pub tls_protocols_supported: Observation<BTreeSet<TlsVersion>>,
    /// Fingerprinting techniques detected.
    pub fingerprinting_techniques_detected: Observation<BTreeSet<FingerprintTechnique>>,
    /// Cookie details.
    pub cookies: Observation<CookieDetails>,
    /// Request details.
    pub requests: Observation<RequestDetails>,
    /// Header details.
    pub headers: Observation<HeaderDetails>,
    /// TLS details.
    pub tls: Observation<TlsDetails>,
    /// Fingerprinting details.
    pub fingerprinting: Observation<FingerprintDetails>,
}

impl TechnicalProfile {
    /// A profile with every field unknown.
    pub fn unknown(domain: HostName) -> Self {
        Self {
            domain,
            cookie_count: Observation::Unknown,
            third_party_cookie_count: Observation::Unknown,
            tracker_categories_present: Observation::Unknown,
            tracker_owner_countries: Observation::Unknown,
            request_count: Observation::Unknown,
            third_party_request_count: Observation::Unknown,
            security_headers_present: Observation::Unknown,
            tls_grade: Observation::Unknown,
            tls_protocols_supported: Observation::Unknown,
            fingerprinting_techniques_detected: Observation::Unknown,
            cookies: Observation::Unknown,
            requests: Observation::Unknown,
            headers: Observation::Unknown,
            tls: Observation::Unknown,
            fingerprinting: Observation::Unknown,
        }
    }

    /// Third-party requests plus third-party cookies.
    ///
    /// Known and positive as soon as any known source is positive; known
    /// zero only when both sources are known; otherwise unknown.
    pub fn third_party_presence(&self) -> Observation<u64> {
        match (self.third_party_request_count, self.third_party_cookie_count) {
            (Observation::Observed(r), Observation::Observed(c)) => Observation::Observed(r + c),
            (Observation::Observed(n), Observation::Unknown)
            | (Observation::Unknown, Observation::Observed(n))
                if n > 0 =>
            {
                Observation::Observed(n)
            }
            _ => Observation::Unknown,
        }
    }

    /// Maximum persistent-cookie lifetime in days; `0` when every cookie
    /// is a session cookie.
    pub fn max_cookie_expiry_days(&self) -> Observation<i64> {
        self.cookies
            .as_ref()
            .map(|c| c.expiry_max_days.unwrap_or(0))
    }

    /// Third-party cookie ratio.
    pub fn third_party_cookie_ratio(&self) -> Observation<f64> {
        self.cookies.as_ref().map(|c| c.third_party_ratio)
    }

    /// Tracker hit ratio over requests.
    pub fn tracker_hit_ratio(&self) -> Observation<f64> {
        self.requests.as_ref().map(|r| r.tracker_hit_ratio)
    }

    /// Number of security headers present.
    pub fn total_security_headers(&self) -> Observation<u64> {
        self.headers.as_ref().map(|h| h.total_security_headers)
    }
}
