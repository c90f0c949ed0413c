//! # Master Dataset Builder
//!
//! Full outer join of every measurement source on the site domain. A
//! domain appears in the output when at least one source mentions it; a
//! source that does not mention it leaves that source's fields unknown.
//!
//! ## Determinism
//!
//! Sources are grouped into `BTreeMap`s, profiles are built in parallel
//! over the sorted domain set and collected in order, and every relative
//! time is measured against the builder's `as_of` instant. Two builds over
//! the same inputs produce identical datasets.
//!
//! ## Per-source rules
//!
//! - Cookies and requests: counts, third-party counts, ratios rounded to 3
//!   decimals (a zero denominator gives 0), top-5 third-party domains by
//!   frequency then name.
//! - Headers: rows for the same domain are OR-merged.
//! - TLS: one row per domain, the one with the most cipher suites, then
//!   HSTS set, then earliest in the file. A row with a scan error yields
//!   unknown TLS facts and a ledger entry.
//! - Fingerprinting: rows for the same domain are OR-merged.

use std::collections::{BTreeMap, BTreeSet};

use privcheck_core::{parse_instant, HostName, Observation, Timestamp};
use rayon::prelude::*;
use serde::Serialize;

use crate::enrich::{EnrichedCookie, EnrichedRequest, SameSite};
use crate::jsonl::SourceLine;
use crate::ledger::{ErrorLedger, LedgerEntry, LedgerKind, Source};
use crate::profile::{
    CookieDetails, FingerprintDetails, FingerprintTechnique, HeaderDetails, RequestDetails,
    SecurityHeader, TechnicalProfile, TlsDetails,
};
use crate::records::{truthy, FingerprintRecord, HeaderRecord, RawInstant, TlsRecord};
use crate::tls::{self, GradeInputs, TlsGrade, TlsVersion};

const TOP_N: usize = 5;

/// Every source the builder joins. `None` means the source was not
/// configured for this run.
#[derive(Debug, Clone, Default)]
pub struct DatasetInputs {
    /// Enriched cookies.
    pub cookies: Option<Vec<EnrichedCookie>>,
    /// Enriched requests.
    pub requests: Option<Vec<EnrichedRequest>>,
    /// Security-header summaries.
    pub headers: Option<Vec<SourceLine<HeaderRecord>>>,
    /// Flattened TLS scans.
    pub tls: Option<Vec<SourceLine<TlsRecord>>>,
    /// Flattened fingerprinting scans.
    pub fingerprinting: Option<Vec<SourceLine<FingerprintRecord>>>,
}

impl DatasetInputs {
    fn configured(&self, source: Source) -> bool {
        match source {
            Source::Cookies => self.cookies.is_some(),
            Source::Requests => self.requests.is_some(),
            Source::Headers => self.headers.is_some(),
            Source::Tls => self.tls.is_some(),
            Source::Fingerprinting => self.fingerprinting.is_some(),
            Source::Policies => false,
        }
    }
}

/// One profile per domain plus the builder's ledger.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MasterDataset {
    /// Profiles keyed by domain.
    pub profiles: BTreeMap<HostName, TechnicalProfile>,
    /// Malformed rows, missing sources, TLS scan errors.
    #[serde(skip)]
    pub ledger: ErrorLedger,
}

impl MasterDataset {
    /// Add an all-unknown profile for every listed domain not already
    /// present. Returns how many were added.
    pub fn pad_with_official<I: IntoIterator<Item = HostName>>(&mut self, domains: I) -> usize {
        let mut added = 0;
        for domain in domains {
            if !self.profiles.contains_key(&domain) {
                self.profiles
                    .insert(domain.clone(), TechnicalProfile::unknown(domain));
                added += 1;
            }
        }
        if added > 0 {
            tracing::info!(added, "padded dataset with unobserved official domains");
        }
        added
    }

    /// Profile for one domain.
    pub fn get(&self, domain: &HostName) -> Option<&TechnicalProfile> {
        self.profiles.get(domain)
    }

    /// Number of profiles.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the dataset has no profiles.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

struct Grouped<'a> {
    cookies: Option<BTreeMap<HostName, Vec<&'a EnrichedCookie>>>,
    requests: Option<BTreeMap<HostName, Vec<&'a EnrichedRequest>>>,
    headers: Option<BTreeMap<HostName, BTreeSet<SecurityHeader>>>,
    tls: Option<BTreeMap<HostName, &'a SourceLine<TlsRecord>>>,
    fingerprinting: Option<BTreeMap<HostName, BTreeSet<FingerprintTechnique>>>,
}

impl Grouped<'_> {
    fn covers(&self, source: Source, domain: &HostName) -> bool {
        match source {
            Source::Cookies => self.cookies.as_ref().is_some_and(|m| m.contains_key(domain)),
            Source::Requests => self.requests.as_ref().is_some_and(|m| m.contains_key(domain)),
            Source::Headers => self.headers.as_ref().is_some_and(|m| m.contains_key(domain)),
            Source::Tls => self.tls.as_ref().is_some_and(|m| m.contains_key(domain)),
            Source::Fingerprinting => {
                self.fingerprinting.as_ref().is_some_and(|m| m.contains_key(domain))
            }
            Source::Policies => false,
        }
    }

    fn domains(&self) -> BTreeSet<HostName> {
        let mut out = BTreeSet::new();
        if let Some(m) = &self.cookies {
            out.extend(m.keys().cloned());
        }
        if let Some(m) = &self.requests {
            out.extend(m.keys().cloned());
        }
        if let Some(m) = &self.headers {
            out.extend(m.keys().cloned());
        }
        if let Some(m) = &self.tls {
            out.extend(m.keys().cloned());
        }
        if let Some(m) = &self.fingerprinting {
            out.extend(m.keys().cloned());
        }
        out
    }
}

/// Joins measurement sources into technical profiles.
#[derive(Debug, Clone, Copy)]
pub struct MasterDatasetBuilder {
    as_of: Timestamp,
}

impl MasterDatasetBuilder {
    /// Builder measuring relative times against `as_of`.
    pub fn new(as_of: Timestamp) -> Self {
        Self { as_of }
    }

    /// Build the dataset.
    pub fn build(&self, inputs: &DatasetInputs) -> MasterDataset {
        let mut ledger = ErrorLedger::new();
        let grouped = Grouped {
            cookies: inputs.cookies.as_deref().map(|v| group_by_domain(v, |c| &c.domain)),
            requests: inputs.requests.as_deref().map(|v| group_by_domain(v, |r| &r.domain)),
            headers: inputs.headers.as_deref().map(|v| merge_headers(v, &mut ledger)),
            tls: inputs.tls.as_deref().map(|v| pick_tls_rows(v, &mut ledger)),
            fingerprinting: inputs
                .fingerprinting
                .as_deref()
                .map(|v| merge_fingerprints(v, &mut ledger)),
        };

        let domains = grouped.domains();
        let built: Vec<(TechnicalProfile, Vec<LedgerEntry>)> = domains
            .par_iter()
            .map(|domain| self.build_profile(domain, &grouped, inputs))
            .collect();

        let mut profiles = BTreeMap::new();
        for (profile, issues) in built {
            for issue in issues {
                ledger.record(profile.domain.as_str(), issue);
            }
            profiles.insert(profile.domain.clone(), profile);
        }

        tracing::info!(
            domains = profiles.len(),
            tls_errors = ledger.count_kind(LedgerKind::TlsScanError),
            missing = ledger.count_kind(LedgerKind::MissingSource),
            "built master dataset"
        );
        MasterDataset { profiles, ledger }
    }

    fn build_profile(
        &self,
        domain: &HostName,
        grouped: &Grouped<'_>,
        inputs: &DatasetInputs,
    ) -> (TechnicalProfile, Vec<LedgerEntry>) {
        let mut profile = TechnicalProfile::unknown(domain.clone());
        let mut issues = Vec::new();

        for source in Source::MEASUREMENTS {
            if inputs.configured(source) && !grouped.covers(source, domain) {
                issues.push(LedgerEntry::missing_source(source));
            }
        }

        let cookies = grouped.cookies.as_ref().and_then(|m| m.get(domain));
        let requests = grouped.requests.as_ref().and_then(|m| m.get(domain));

        if let Some(cookies) = cookies {
            let third_party = cookies.iter().filter(|c| c.enrichment.is_third_party).count() as u64;
            profile.cookie_count = Observation::Observed(cookies.len() as u64);
            profile.third_party_cookie_count = Observation::Observed(third_party);
            profile.cookies = Observation::Observed(self.cookie_details(cookies, third_party));
        }
        if let Some(requests) = requests {
            let third_party = requests.iter().filter(|r| r.enrichment.is_third_party).count() as u64;
            profile.request_count = Observation::Observed(requests.len() as u64);
            profile.third_party_request_count = Observation::Observed(third_party);
            profile.requests = Observation::Observed(request_details(requests, third_party));
        }
        if cookies.is_some() || requests.is_some() {
            let enrichments = cookies
                .into_iter()
                .flatten()
                .map(|c| &c.enrichment)
                .chain(requests.into_iter().flatten().map(|r| &r.enrichment));
            let mut categories = BTreeSet::new();
            let mut countries = BTreeSet::new();
            for e in enrichments {
                if e.contributes_category() {
                    categories.insert(e.category);
                }
                if let Some(c) = &e.owner_country {
                    countries.insert(c.clone());
                }
            }
            profile.tracker_categories_present = Observation::Observed(categories);
            profile.tracker_owner_countries = Observation::Observed(countries);
        }

        if let Some(present) = grouped.headers.as_ref().and_then(|m| m.get(domain)) {
            profile.headers = Observation::Observed(HeaderDetails {
                total_security_headers: present.len() as u64,
            });
            profile.security_headers_present = Observation::Observed(present.clone());
        }

        if let Some(row) = grouped.tls.as_ref().and_then(|m| m.get(domain)) {
            let (details, grade, protocols) = self.tls_facts(row, &mut issues);
            profile.tls = Observation::Observed(details);
            profile.tls_grade = grade.into();
            profile.tls_protocols_supported = protocols.into();
        }

        if let Some(techniques) = grouped.fingerprinting.as_ref().and_then(|m| m.get(domain)) {
            profile.fingerprinting = Observation::Observed(FingerprintDetails {
                methods_total: techniques.len() as u64,
                detected: !techniques.is_empty(),
            });
            profile.fingerprinting_techniques_detected = Observation::Observed(techniques.clone());
        }

        (profile, issues)
    }

    fn cookie_details(&self, cookies: &[&EnrichedCookie], third_party: u64) -> CookieDetails {
        let total = cookies.len() as u64;
        let count = |f: fn(&EnrichedCookie) -> bool| cookies.iter().filter(|c| f(c)).count() as u64;
        let secure = count(|c| c.is_secure);
        let http_only = count(|c| c.is_http_only);
        let session = count(|c| c.is_session);
        let ss_none = count(|c| c.same_site == Some(SameSite::None));
        let ss_lax = count(|c| c.same_site == Some(SameSite::Lax));
        let ss_strict = count(|c| c.same_site == Some(SameSite::Strict));
        let tracker_cookies = count(|c| c.enrichment.is_tracker);

        let days: Vec<i64> = cookies
            .iter()
            .filter_map(|c| c.expiry.as_ref())
            .map(|e| self.as_of.days_until(e).floor() as i64)
            .collect();
        let clipped: Vec<f64> = days.iter().map(|d| (*d).max(0) as f64).collect();

        let third_party_hosts = cookies
            .iter()
            .filter(|c| c.enrichment.is_third_party)
            .map(|c| c.hostname.registrable_domain());
        let (distinct, top) = top_domains(third_party_hosts);

        CookieDetails {
            secure,
            secure_ratio: ratio(secure, total),
            http_only,
            http_only_ratio: ratio(http_only, total),
            session,
            session_ratio: ratio(session, total),
            same_site_none: ss_none,
            same_site_lax: ss_lax,
            same_site_strict: ss_strict,
            same_site_none_ratio: ratio(ss_none, total),
            same_site_lax_ratio: ratio(ss_lax, total),
            same_site_strict_ratio: ratio(ss_strict, total),
            expiry_min_days: days.iter().min().copied(),
            expiry_median_days: median(&clipped).map(|m| round_to(m, 1)),
            expiry_max_days: days.iter().max().map(|d| (*d).max(0)),
            third_party_ratio: ratio(third_party, total),
            third_party_domains: distinct,
            top_third_party_domains: top,
            tracker_cookies,
            tracker_cookie_ratio: ratio(tracker_cookies, total),
        }
    }

    fn tls_facts(
        &self,
        row: &SourceLine<TlsRecord>,
        issues: &mut Vec<LedgerEntry>,
    ) -> (TlsDetails, Option<TlsGrade>, Option<BTreeSet<TlsVersion>>) {
        let SourceLine { line, record } = row;
        if let Some(err) = record.tls_error.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            issues.push(LedgerEntry {
                kind: LedgerKind::TlsScanError,
                source: Source::Tls,
                field: Some("tls_error".to_string()),
                line: Some(*line),
                detail: err.to_string(),
            });
            let details = TlsDetails {
                scan_error: Some(err.to_string()),
                ..TlsDetails::default()
            };
            return (details, None, None);
        }

        let suites = record
            .tls_cipher_suites_list
            .as_ref()
            .map(|l| l.names())
            .unwrap_or_default();
        let (total, fs, weak, weak_suites) = if suites.is_empty() {
            (
                record.tls_cipher_suites_total.unwrap_or(0),
                record.tls_cipher_suites_fs.unwrap_or(0),
                record.tls_cipher_suites_weak.unwrap_or(0),
                Vec::new(),
            )
        } else {
            let weak_suites: Vec<String> = suites.iter().filter(|s| tls::is_weak(s)).cloned().collect();
            (
                suites.len() as u32,
                suites.iter().filter(|s| tls::is_forward_secret(s)).count() as u32,
                weak_suites.len() as u32,
                weak_suites,
            )
        };

        let raw_max = record
            .tls_version_max
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let max_version = raw_max.and_then(TlsVersion::parse);
        if let (Some(raw), None) = (raw_max, max_version) {
            issues.push(LedgerEntry::malformed(
                Source::Tls,
                Some(*line),
                Some("tls_version_max"),
                format!("unrecognized protocol version {raw:?}"),
            ));
        }

        let protocols: BTreeSet<TlsVersion> = match &record.tls_protocols {
            Some(list) if !list.is_empty() => list.iter().filter_map(|p| TlsVersion::parse(p)).collect(),
            _ => tls::derive_protocols(max_version, &suites),
        };

        let days_until_expiry = match &record.tls_not_valid_after {
            Some(raw) => match instant(raw) {
                Some(not_after) => Some(self.as_of.days_until(&not_after).floor() as i64),
                None => {
                    issues.push(LedgerEntry::malformed(
                        Source::Tls,
                        Some(*line),
                        Some("tls_not_valid_after"),
                        "unparseable certificate expiry",
                    ));
                    record.tls_days_until_expiry
                }
            },
            None => record.tls_days_until_expiry,
        };

        let hsts = record.tls_hsts.0;
        let grade = tls::grade(GradeInputs {
            max_version,
            protocols: &protocols,
            suites_total: total,
            suites_fs: fs,
            suites_weak: weak,
            hsts,
        });

        let details = TlsDetails {
            scan_error: None,
            version_max: max_version.or_else(|| protocols.iter().next_back().copied()),
            key_algorithm: non_empty(record.tls_key_alg.as_deref()),
            key_size: record.tls_key_size.filter(|s| *s > 0),
            curve: non_empty(record.tls_curve.as_deref()),
            cert_issuer: non_empty(record.tls_cert_issuer.as_deref()),
            days_until_expiry,
            cipher_suites_total: Some(total),
            cipher_suites_fs: Some(fs),
            cipher_fs_ratio: Some(ratio(fs.into(), total.into())),
            cipher_suites_weak: Some(weak),
            cipher_weak_ratio: Some(ratio(weak.into(), total.into())),
            weak_suites,
            hsts: Some(hsts),
        };
        let protocols = if protocols.is_empty() { None } else { Some(protocols) };
        (details, grade, protocols)
    }
}

fn request_details(requests: &[&EnrichedRequest], third_party: u64) -> RequestDetails {
    let total = requests.len() as u64;
    let tracker_hits = requests.iter().filter(|r| r.enrichment.is_tracker).count() as u64;
    let (distinct, top) = top_domains(
        requests
            .iter()
            .filter(|r| r.enrichment.is_third_party)
            .map(|r| r.hostname.registrable_domain()),
    );
    let mut resource_types = BTreeMap::new();
    for t in requests.iter().filter_map(|r| r.resource_type.as_deref()) {
        *resource_types.entry(t.to_string()).or_insert(0u64) += 1;
    }
    RequestDetails {
        third_party_ratio: ratio(third_party, total),
        third_party_domains: distinct,
        top_third_party_domains: top,
        tracker_hits,
        tracker_hit_ratio: ratio(tracker_hits, total),
        resource_types,
    }
}

fn group_by_domain<'a, T, F>(records: &'a [T], key: F) -> BTreeMap<HostName, Vec<&'a T>>
where
    F: Fn(&'a T) -> &'a HostName,
{
    let mut out: BTreeMap<HostName, Vec<&'a T>> = BTreeMap::new();
    for r in records {
        out.entry(key(r).clone()).or_default().push(r);
    }
    out
}

fn parse_row_domain(raw: &str, source: Source, line: usize, ledger: &mut ErrorLedger) -> Option<HostName> {
    match HostName::parse(raw) {
        Ok(h) => Some(h),
        Err(e) => {
            ledger.record(raw, LedgerEntry::malformed(source, Some(line), Some("domain"), e.to_string()));
            None
        }
    }
}

fn merge_headers(
    rows: &[SourceLine<HeaderRecord>],
    ledger: &mut ErrorLedger,
) -> BTreeMap<HostName, BTreeSet<SecurityHeader>> {
    let mut out: BTreeMap<HostName, BTreeSet<SecurityHeader>> = BTreeMap::new();
    for SourceLine { line, record } in rows {
        let Some(domain) = parse_row_domain(&record.domain, Source::Headers, *line, ledger) else {
            continue;
        };
        let present = out.entry(domain).or_default();
        for name in record.headers.iter().flatten() {
            present.extend(SecurityHeader::from_name(name));
        }
        for (column, value) in &record.columns {
            if let Some(header) = SecurityHeader::from_name(column) {
                if truthy(value) {
                    present.insert(header);
                }
            }
        }
    }
    out
}

fn suite_count(record: &TlsRecord) -> u32 {
    let listed = record
        .tls_cipher_suites_list
        .as_ref()
        .map(|l| l.names().len() as u32)
        .unwrap_or(0);
    if listed > 0 {
        listed
    } else {
        record.tls_cipher_suites_total.unwrap_or(0)
    }
}

fn pick_tls_rows<'a>(
    rows: &'a [SourceLine<TlsRecord>],
    ledger: &mut ErrorLedger,
) -> BTreeMap<HostName, &'a SourceLine<TlsRecord>> {
    let mut out: BTreeMap<HostName, &'a SourceLine<TlsRecord>> = BTreeMap::new();
    for row in rows {
        let Some(domain) = parse_row_domain(&row.record.domain, Source::Tls, row.line, ledger) else {
            continue;
        };
        let rank = |r: &SourceLine<TlsRecord>| (suite_count(&r.record), r.record.tls_hsts.0);
        let replace = out
            .get(&domain)
            .map_or(true, |current| rank(*current) < rank(row));
        if replace {
            out.insert(domain, row);
        }
    }
    out
}

fn merge_fingerprints(
    rows: &[SourceLine<FingerprintRecord>],
    ledger: &mut ErrorLedger,
) -> BTreeMap<HostName, BTreeSet<FingerprintTechnique>> {
    let mut out: BTreeMap<HostName, BTreeSet<FingerprintTechnique>> = BTreeMap::new();
    for SourceLine { line, record } in rows {
        let Some(domain) = parse_row_domain(&record.domain, Source::Fingerprinting, *line, ledger) else {
            continue;
        };
        let techniques = out.entry(domain).or_default();
        let flags = [
            (record.canvas.0, FingerprintTechnique::Canvas),
            (record.audio_ctx.0, FingerprintTechnique::AudioContext),
            (record.rtc.0, FingerprintTechnique::WebRtc),
            (record.storage.0, FingerprintTechnique::Storage),
        ];
        techniques.extend(flags.into_iter().filter(|(on, _)| *on).map(|(_, t)| t));
    }
    out
}

fn instant(raw: &RawInstant) -> Option<Timestamp> {
    match raw {
        RawInstant::Seconds(s) if s.is_finite() => Timestamp::from_epoch_secs(s.trunc() as i64).ok(),
        RawInstant::Seconds(_) => None,
        RawInstant::Text(s) => parse_instant(s).ok(),
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Distinct count and the top entries by frequency, then name.
fn top_domains<'a, I: Iterator<Item = &'a str>>(domains: I) -> (u64, Vec<String>) {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for d in domains {
        *counts.entry(d).or_insert(0) += 1;
    }
    let distinct = counts.len() as u64;
    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top = ranked.into_iter().take(TOP_N).map(|(d, _)| d.to_string()).collect();
    (distinct, top)
}

/// `num / den` rounded to 3 decimals; 0 when `den` is 0.
pub fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        round_to(num as f64 / den as f64, 3)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use privcheck_taxonomy::{Resolver, Taxonomy, TrackerCategory, TrackerEntry};

    use super::*;
    use crate::enrich::Enricher;
    use crate::records::{CookieRecord, Flag, RequestRecord, SuiteList};

    fn host(s: &str) -> HostName {
        HostName::parse(s).unwrap()
    }

    fn as_of() -> Timestamp {
        Timestamp::parse("2025-01-01T00:00:00Z").unwrap()
    }

    fn enricher() -> Enricher {
        let taxonomy = Taxonomy::new(vec![TrackerEntry::new(
            host("ads.example-cdn.com"),
            "AdCo",
            TrackerCategory::Advertising,
        )])
        .unwrap();
        Enricher::new(Resolver::new(Arc::new(taxonomy)))
    }

    fn cookie_line(line: usize, domain: &str, hostname: &str, expiry: Option<&str>) -> SourceLine<CookieRecord> {
        SourceLine {
            line,
            record: CookieRecord {
                domain: domain.to_string(),
                hostname: hostname.to_string(),
                timestamp: None,
                name: None,
                value_hash: None,
                path: None,
                is_session: Flag(expiry.is_none()),
                is_secure: Flag(true),
                is_http_only: Flag(false),
                same_site: None,
                expiry: expiry.map(|e| RawInstant::Text(e.to_string())),
            },
        }
    }

    fn request_line(line: usize, domain: &str, url: &str) -> SourceLine<RequestRecord> {
        SourceLine {
            line,
            record: RequestRecord {
                domain: domain.to_string(),
                hostname: None,
                url: Some(url.to_string()),
                method: None,
                resource_type: Some("image".to_string()),
                timestamp: None,
            },
        }
    }

    fn tls_line(line: usize, domain: &str, suites: &[&str], hsts: bool) -> SourceLine<TlsRecord> {
        SourceLine {
            line,
            record: TlsRecord {
                domain: domain.to_string(),
                tls_version_max: Some("TLS_1_3".to_string()),
                tls_cipher_suites_list: Some(SuiteList::List(suites.iter().map(|s| s.to_string()).collect())),
                tls_hsts: Flag(hsts),
                tls_not_valid_after: Some(RawInstant::Text("2025-03-02T00:00:00Z".to_string())),
                ..TlsRecord::default()
            },
        }
    }

    #[test]
    fn first_party_and_unmatched_third_party_cookie() {
        let enriched = enricher().enrich_cookies(vec![
            cookie_line(1, "example.gov", "www.example.gov", None),
            cookie_line(2, "example.gov", "unknown-widgets.net", Some("2025-01-31T00:00:00Z")),
        ]);
        let inputs = DatasetInputs {
            cookies: Some(enriched.records),
            ..DatasetInputs::default()
        };
        let ds = MasterDatasetBuilder::new(as_of()).build(&inputs);
        let p = ds.get(&host("example.gov")).unwrap();
        assert_eq!(p.cookie_count, Observation::Observed(2));
        assert_eq!(p.third_party_cookie_count, Observation::Observed(1));
        assert_eq!(
            p.tracker_categories_present,
            Observation::Observed([TrackerCategory::Other].into())
        );
        assert_eq!(p.request_count, Observation::Unknown);
        let details = p.cookies.known().unwrap();
        assert_eq!(details.third_party_ratio, 0.5);
        assert_eq!(details.expiry_max_days, Some(30));
        assert_eq!(details.top_third_party_domains, ["unknown-widgets.net"]);
    }

    #[test]
    fn domain_in_no_source_is_absent() {
        let ds = MasterDatasetBuilder::new(as_of()).build(&DatasetInputs::default());
        assert!(ds.is_empty());
    }

    #[test]
    fn outer_join_marks_missing_sources() {
        let requests = enricher()
            .enrich_requests(vec![request_line(1, "tracker.example.gov", "https://ads.example-cdn.com/p.gif")]);
        let inputs = DatasetInputs {
            cookies: Some(Vec::new()),
            requests: Some(requests.records),
            tls: Some(vec![tls_line(1, "other.gov", &["TLS_AES_128_GCM_SHA256"], true)]),
            ..DatasetInputs::default()
        };
        let ds = MasterDatasetBuilder::new(as_of()).build(&inputs);
        assert_eq!(ds.len(), 2);

        let p = ds.get(&host("tracker.example.gov")).unwrap();
        assert_eq!(p.third_party_request_count, Observation::Observed(1));
        assert_eq!(p.cookie_count, Observation::Unknown);
        assert_eq!(p.tls_grade, Observation::Unknown);
        let missing: Vec<Source> = ds
            .ledger
            .for_domain("tracker.example.gov")
            .iter()
            .map(|e| e.source)
            .collect();
        assert_eq!(missing, [Source::Cookies, Source::Tls]);

        let other = ds.get(&host("other.gov")).unwrap();
        assert_eq!(other.tls_grade, Observation::Observed(TlsGrade::A));
        assert_eq!(other.tls.known().unwrap().days_until_expiry, Some(60));
    }

    #[test]
    fn tls_rows_dedupe_by_suite_count_then_hsts() {
        let rows = vec![
            tls_line(1, "a.gov", &["TLS_AES_128_GCM_SHA256"], true),
            tls_line(2, "a.gov", &["TLS_AES_128_GCM_SHA256", "TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256"], false),
            tls_line(3, "a.gov", &["TLS_AES_128_GCM_SHA256", "TLS_RSA_WITH_AES_128_CBC_SHA"], true),
        ];
        let mut ledger = ErrorLedger::new();
        let picked = pick_tls_rows(&rows, &mut ledger);
        assert_eq!(picked[&host("a.gov")].line, 3);
    }

    #[test]
    fn tls_scan_error_is_unknown_and_ledgered() {
        let row = SourceLine {
            line: 4,
            record: TlsRecord {
                domain: "broken.gov".to_string(),
                tls_error: Some("certinfo_error (timeout)".to_string()),
                ..TlsRecord::default()
            },
        };
        let inputs = DatasetInputs {
            tls: Some(vec![row]),
            ..DatasetInputs::default()
        };
        let ds = MasterDatasetBuilder::new(as_of()).build(&inputs);
        let p = ds.get(&host("broken.gov")).unwrap();
        assert_eq!(p.tls_grade, Observation::Unknown);
        assert_eq!(p.tls_protocols_supported, Observation::Unknown);
        assert_eq!(ds.ledger.for_domain("broken.gov")[0].kind, LedgerKind::TlsScanError);
    }

    #[test]
    fn header_rows_or_merge_with_feature_policy_alias() {
        let rows: Vec<SourceLine<HeaderRecord>> = [
            r#"{"domain":"a.gov","x-frame-options":1,"feature-policy":"1"}"#,
            r#"{"domain":"www.a.gov","headers":["Content-Security-Policy"],"x-frame-options":0}"#,
            r#"{"domain":"bad host","x-frame-options":1}"#,
        ]
        .iter()
        .enumerate()
        .map(|(i, s)| SourceLine {
            line: i + 1,
            record: serde_json::from_str(s).unwrap(),
        })
        .collect();
        let inputs = DatasetInputs {
            headers: Some(rows),
            ..DatasetInputs::default()
        };
        let ds = MasterDatasetBuilder::new(as_of()).build(&inputs);
        let p = ds.get(&host("a.gov")).unwrap();
        assert_eq!(p.total_security_headers(), Observation::Observed(3));
        assert_eq!(ds.ledger.for_domain("bad host").len(), 1);
    }

    #[test]
    fn fingerprint_flags_become_techniques() {
        let inputs = DatasetInputs {
            fingerprinting: Some(vec![SourceLine {
                line: 1,
                record: FingerprintRecord {
                    domain: "a.gov".to_string(),
                    canvas: Flag(true),
                    rtc: Flag(true),
                    ..FingerprintRecord::default()
                },
            }]),
            ..DatasetInputs::default()
        };
        let ds = MasterDatasetBuilder::new(as_of()).build(&inputs);
        let p = ds.get(&host("a.gov")).unwrap();
        assert_eq!(p.fingerprinting.known().unwrap().methods_total, 2);
    }

    #[test]
    fn padding_adds_only_missing_domains() {
        let mut ds = MasterDataset::default();
        ds.profiles.insert(host("a.gov"), TechnicalProfile::unknown(host("a.gov")));
        assert_eq!(ds.pad_with_official([host("a.gov"), host("b.gov")]), 1);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn ratio_and_top_domains() {
        assert_eq!(ratio(1, 3), 0.333);
        assert_eq!(ratio(5, 0), 0.0);
        let (distinct, top) = top_domains(["b", "a", "b", "c", "a", "b"].into_iter());
        assert_eq!(distinct, 3);
        assert_eq!(top, ["b", "a", "c"]);
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }
}
