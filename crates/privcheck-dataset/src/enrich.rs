//! # Record Enricher
//!
//! Resolves each cookie and request host against the tracker taxonomy and
//! tags it as first- or third-party.
//!
//! A record is third-party when the observed host's registrable domain
//! differs from the site's registrable domain. Records whose site or host
//! does not parse are excluded and filed in the ledger as malformed.
//! A cookie with an unparseable expiry is kept with no expiry and a ledger
//! entry for the `expiry` field.
//!
//! Enrichment is per record and runs on the rayon pool; results are
//! collected in input order, then the ledger is written sequentially.

use privcheck_core::{parse_instant, CountryCode, HostName, Timestamp};
use privcheck_taxonomy::{Resolver, TrackerCategory};
use rayon::prelude::*;
use serde::Serialize;

use crate::jsonl::SourceLine;
use crate::ledger::{ErrorLedger, LedgerEntry, Source};
use crate::records::{CookieRecord, RawInstant, RequestRecord};

/// Tracker identity and party relation of one observed host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    /// Owner of the matched tracker.
    pub owner_name: Option<String>,
    /// Category; `other` when unmatched.
    pub category: TrackerCategory,
    /// Country of the matched tracker's owner.
    pub owner_country: Option<CountryCode>,
    /// Whether the host matched a taxonomy entry.
    pub is_tracker: bool,
    /// Whether the host is outside the site's registrable domain.
    pub is_third_party: bool,
}

impl Enrichment {
    /// Whether this record feeds the domain's tracker categories: it
    /// resolved to a tracker, or it is third-party (unmatched third-party
    /// hosts contribute `other`).
    pub fn contributes_category(&self) -> bool {
        self.is_tracker || self.is_third_party
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    /// `SameSite=None` (Firefox: `no_restriction`).
    None,
    /// `SameSite=Lax`.
    Lax,
    /// `SameSite=Strict`.
    Strict,
}

impl SameSite {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" | "no_restriction" => Some(Self::None),
            "lax" => Some(Self::Lax),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

/// A cookie with its tracker annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCookie {
    /// Site under test.
    pub domain: HostName,
    /// Host that set the cookie.
    pub hostname: HostName,
    /// Tracker annotation.
    #[serde(flatten)]
    pub enrichment: Enrichment,
    /// Cookie name.
    pub name: Option<String>,
    /// Session cookie.
    pub is_session: bool,
    /// `Secure` attribute.
    pub is_secure: bool,
    /// `HttpOnly` attribute.
    pub is_http_only: bool,
    /// `SameSite` attribute.
    pub same_site: Option<SameSite>,
    /// Expiry of a persistent cookie.
    pub expiry: Option<Timestamp>,
}

/// A request with its tracker annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRequest {
    /// Site under test.
    pub domain: HostName,
    /// Requested host.
    pub hostname: HostName,
    /// Tracker annotation.
    #[serde(flatten)]
    pub enrichment: Enrichment,
    /// Request URL.
    pub url: Option<String>,
    /// HTTP method.
    pub method: Option<String>,
    /// Lowercased resource type.
    pub resource_type: Option<String>,
}

/// Enriched records from one source plus the ledger of excluded ones.
#[derive(Debug, Clone)]
pub struct Enriched<T> {
    /// Records kept, in input order.
    pub records: Vec<T>,
    /// Malformed records and fields.
    pub ledger: ErrorLedger,
}

struct LineOutcome<T> {
    ledger_key: String,
    record: Option<T>,
    issues: Vec<LedgerEntry>,
}

/// Applies the tracker resolver to raw records.
#[derive(Debug, Clone)]
pub struct Enricher {
    resolver: Resolver,
}

impl Enricher {
    /// Create an enricher over a shared resolver.
    pub fn new(resolver: Resolver) -> Self {
        Self { resolver }
    }

    /// Annotate one observed host seen while crawling `site`.
    pub fn annotate(&self, site: &HostName, host: &HostName) -> Enrichment {
        let resolution = self.resolver.resolve(host);
        Enrichment {
            is_tracker: resolution.is_match(),
            owner_name: resolution.owner_name,
            category: resolution.category,
            owner_country: resolution.owner_country,
            is_third_party: !site.same_site(host),
        }
    }

    /// Enrich cookie records.
    pub fn enrich_cookies(&self, lines: Vec<SourceLine<CookieRecord>>) -> Enriched<EnrichedCookie> {
        let outcomes: Vec<_> = lines.into_par_iter().map(|l| self.enrich_cookie(l)).collect();
        collect(outcomes, Source::Cookies)
    }

    /// Enrich request records.
    pub fn enrich_requests(&self, lines: Vec<SourceLine<RequestRecord>>) -> Enriched<EnrichedRequest> {
        let outcomes: Vec<_> = lines.into_par_iter().map(|l| self.enrich_request(l)).collect();
        collect(outcomes, Source::Requests)
    }

    fn enrich_cookie(&self, line: SourceLine<CookieRecord>) -> LineOutcome<EnrichedCookie> {
        let SourceLine { line, record } = line;
        let source = Source::Cookies;
        let site = match parse_host(&record.domain, "domain", source, line) {
            Ok(h) => h,
            Err(entry) => return rejected(&record.domain, entry),
        };
        let hostname = match parse_host(&record.hostname, "hostname", source, line) {
            Ok(h) => h,
            Err(entry) => return rejected(site.as_str(), entry),
        };

        let mut issues = Vec::new();
        let is_session = record.is_session.0;
        let expiry = if is_session {
            None
        } else {
            match record.expiry.as_ref().map(parse_expiry).transpose() {
                Ok(expiry) => expiry.flatten(),
                Err(detail) => {
                    issues.push(LedgerEntry::malformed(source, Some(line), Some("expiry"), detail));
                    None
                }
            }
        };

        let enrichment = self.annotate(&site, &hostname);
        LineOutcome {
            ledger_key: site.as_str().to_string(),
            record: Some(EnrichedCookie {
                domain: site,
                hostname,
                enrichment,
                name: record.name,
                is_session,
                is_secure: record.is_secure.0,
                is_http_only: record.is_http_only.0,
                same_site: record.same_site.as_deref().and_then(SameSite::parse),
                expiry,
            }),
            issues,
        }
    }

    fn enrich_request(&self, line: SourceLine<RequestRecord>) -> LineOutcome<EnrichedRequest> {
        let SourceLine { line, record } = line;
        let source = Source::Requests;
        let site = match parse_host(&record.domain, "domain", source, line) {
            Ok(h) => h,
            Err(entry) => return rejected(&record.domain, entry),
        };
        let raw_host = record
            .hostname
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .or(record.url.as_deref())
            .unwrap_or_default();
        let hostname = match parse_host(raw_host, "hostname", source, line) {
            Ok(h) => h,
            Err(entry) => return rejected(site.as_str(), entry),
        };

        let enrichment = self.annotate(&site, &hostname);
        LineOutcome {
            ledger_key: site.as_str().to_string(),
            record: Some(EnrichedRequest {
                domain: site,
                hostname,
                enrichment,
                url: record.url,
                method: record.method,
                resource_type: record
                    .resource_type
                    .map(|t| t.trim().to_ascii_lowercase())
                    .filter(|t| !t.is_empty()),
            }),
            issues: Vec::new(),
        }
    }
}

fn parse_host(raw: &str, field: &str, source: Source, line: usize) -> Result<HostName, LedgerEntry> {
    HostName::parse(raw).map_err(|e| LedgerEntry::malformed(source, Some(line), Some(field), e.to_string()))
}

fn rejected<T>(key: &str, entry: LedgerEntry) -> LineOutcome<T> {
    LineOutcome {
        ledger_key: key.to_string(),
        record: None,
        issues: vec![entry],
    }
}

/// `Ok(None)` for the "no expiry" markers collectors write (`""`, `0`,
/// negative seconds).
fn parse_expiry(raw: &RawInstant) -> Result<Option<Timestamp>, String> {
    match raw {
        RawInstant::Seconds(secs) if *secs <= 0.0 => Ok(None),
        RawInstant::Seconds(secs) => Timestamp::from_epoch_secs(secs.trunc() as i64)
            .map(Some)
            .map_err(|e| e.to_string()),
        RawInstant::Text(s) if s.trim().is_empty() => Ok(None),
        RawInstant::Text(s) => match s.trim().parse::<f64>() {
            Ok(secs) if secs <= 0.0 => Ok(None),
            _ => parse_instant(s).map(Some).map_err(|e| e.to_string()),
        },
    }
}

fn collect<T>(outcomes: Vec<LineOutcome<T>>, source: Source) -> Enriched<T> {
    let mut records = Vec::with_capacity(outcomes.len());
    let mut ledger = ErrorLedger::new();
    let mut excluded = 0usize;
    for outcome in outcomes {
        for issue in outcome.issues {
            ledger.record(&outcome.ledger_key, issue);
        }
        match outcome.record {
            Some(r) => records.push(r),
            None => excluded += 1,
        }
    }
    if excluded > 0 {
        tracing::warn!(source = %source, excluded, "records excluded as malformed");
    }
    Enriched { records, ledger }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use privcheck_taxonomy::{Taxonomy, TrackerEntry};

    use super::*;
    use crate::records::Flag;

    fn host(s: &str) -> HostName {
        HostName::parse(s).unwrap()
    }

    fn enricher() -> Enricher {
        let taxonomy = Taxonomy::new(vec![
            TrackerEntry::new(host("ads.example-cdn.com"), "AdCo", TrackerCategory::Advertising),
            TrackerEntry::new(host("analytics.agency.gov.uk"), "Agency", TrackerCategory::Analytics),
        ])
        .unwrap();
        Enricher::new(Resolver::new(Arc::new(taxonomy)))
    }

    fn cookie(domain: &str, hostname: &str) -> SourceLine<CookieRecord> {
        SourceLine {
            line: 1,
            record: CookieRecord {
                domain: domain.to_string(),
                hostname: hostname.to_string(),
                timestamp: None,
                name: Some("c".to_string()),
                value_hash: None,
                path: None,
                is_session: Flag(false),
                is_secure: Flag(true),
                is_http_only: Flag(false),
                same_site: Some("Lax".to_string()),
                expiry: Some(RawInstant::Text("2025-02-01T00:00:00Z".to_string())),
            },
        }
    }

    fn request(domain: &str, hostname: Option<&str>, url: Option<&str>) -> SourceLine<RequestRecord> {
        SourceLine {
            line: 7,
            record: RequestRecord {
                domain: domain.to_string(),
                hostname: hostname.map(str::to_string),
                url: url.map(str::to_string),
                method: Some("GET".to_string()),
                resource_type: Some("Script".to_string()),
                timestamp: None,
            },
        }
    }

    #[test]
    fn third_party_uses_registrable_domains() {
        let e = enricher();
        let a = e.annotate(&host("sub.gov.uk"), &host("other.gov.uk"));
        assert!(a.is_third_party);
        let b = e.annotate(&host("www.agency.gov.uk"), &host("analytics.agency.gov.uk"));
        assert!(!b.is_third_party);
        assert!(b.is_tracker);
        assert!(b.contributes_category());
    }

    #[test]
    fn cookie_fields_are_carried() {
        let out = enricher().enrich_cookies(vec![cookie("https://example.gov/", ".ads.example-cdn.com")]);
        assert!(out.ledger.is_empty());
        let c = &out.records[0];
        assert_eq!(c.domain.as_str(), "example.gov");
        assert_eq!(c.enrichment.owner_name.as_deref(), Some("AdCo"));
        assert!(c.enrichment.is_third_party);
        assert_eq!(c.same_site, Some(SameSite::Lax));
        assert!(c.expiry.is_some());
    }

    #[test]
    fn malformed_host_is_excluded_and_ledgered() {
        let out = enricher().enrich_cookies(vec![cookie("example.gov", "bad host!"), cookie("", "x.com")]);
        assert!(out.records.is_empty());
        assert_eq!(out.ledger.for_domain("example.gov")[0].field.as_deref(), Some("hostname"));
        assert_eq!(out.ledger.for_domain(crate::ledger::UNATTRIBUTED).len(), 1);
    }

    #[test]
    fn bad_expiry_keeps_cookie() {
        let mut line = cookie("example.gov", "example.gov");
        line.record.expiry = Some(RawInstant::Text("someday".to_string()));
        let out = enricher().enrich_cookies(vec![line]);
        assert_eq!(out.records.len(), 1);
        assert!(out.records[0].expiry.is_none());
        assert_eq!(out.ledger.for_domain("example.gov")[0].field.as_deref(), Some("expiry"));
    }

    #[test]
    fn zero_expiry_means_none() {
        assert_eq!(parse_expiry(&RawInstant::Seconds(0.0)), Ok(None));
        assert_eq!(parse_expiry(&RawInstant::Text("-1".to_string())), Ok(None));
    }

    #[test]
    fn request_host_falls_back_to_url() {
        let out = enricher().enrich_requests(vec![request(
            "tracker.example.gov",
            None,
            Some("https://ads.example-cdn.com/pixel.gif?x=1"),
        )]);
        let r = &out.records[0];
        assert_eq!(r.hostname.as_str(), "ads.example-cdn.com");
        assert_eq!(r.enrichment.category, TrackerCategory::Advertising);
        assert_eq!(r.resource_type.as_deref(), Some("script"));
    }

    #[test]
    fn request_without_any_host_is_malformed() {
        let out = enricher().enrich_requests(vec![request("a.gov", Some(" "), None)]);
        assert!(out.records.is_empty());
        assert_eq!(out.ledger.for_domain("a.gov")[0].line, Some(7));
    }
}
