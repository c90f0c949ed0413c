//! # Pipeline
//!
//! Wires the library crates together for one run. [`prepare`] loads and
//! validates everything a run depends on and fails with a
//! [`ConfigError`] before any domain is touched. [`execute`] then reads
//! the inputs, builds the master dataset, aggregates claims, evaluates
//! the rules and computes metrics. Nothing is written to disk here; see
//! [`RunOutput::write`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use privcheck_claims::{aggregate_claims, ClaimAggregation, DomainClaimRecord, PolicyClaim};
use privcheck_compliance::{ComplianceEngine, Evaluation, RuleRegistry};
use privcheck_core::{CountryCode, HostName, Timestamp};
use privcheck_dataset::{
    read_jsonl, CookieRecord, DatasetInputs, Enricher, ErrorLedger, FingerprintRecord, HeaderRecord,
    MasterDatasetBuilder, RequestRecord, Source, SourceLine, TechnicalProfile, TlsRecord,
};
use privcheck_metrics::{aggregate_metrics, CountryResolver, MetricsInputs, MetricsReport};
use privcheck_taxonomy::{load_taxonomy, Resolver, Taxonomy};

use crate::config::{ConfigError, RunConfig};
use crate::domains::OfficialDomains;
use crate::output::{ArtifactWriter, RunManifest};

/// Everything a run needs, validated.
#[derive(Debug)]
pub struct Prepared {
    pub config: RunConfig,
    pub as_of: Timestamp,
    pub taxonomy: Arc<Taxonomy>,
    pub registry: RuleRegistry,
    pub official: OfficialDomains,
    pub countries: CountryResolver,
}

/// Load the taxonomy, rule selection, domain lists and country mapping.
pub fn prepare(config: RunConfig) -> Result<Prepared, ConfigError> {
    let as_of = config.as_of()?;
    config.workers()?;

    let taxonomy = Arc::new(load_taxonomy(&config.taxonomy)?);
    let registry = match &config.rules {
        Some(ids) => RuleRegistry::select(ids)?,
        None => RuleRegistry::builtin(),
    };

    let official = OfficialDomains::load(&config.official_domains)?;
    let mut countries = CountryResolver::new();
    official.assign_countries(&mut countries);
    for (raw_domain, raw_country) in &config.country_overrides {
        let domain = HostName::parse(raw_domain).map_err(|e| ConfigError::InvalidDomain {
            value: raw_domain.clone(),
            context: "country_overrides".to_string(),
            source: e,
        })?;
        let country = CountryCode::new(raw_country).map_err(|e| ConfigError::InvalidCountry {
            value: raw_country.clone(),
            context: format!("country_overrides.{raw_domain}"),
            source: e,
        })?;
        countries.assign(domain, country);
    }

    tracing::info!(
        as_of = %as_of,
        trackers = taxonomy.len(),
        rules = registry.len(),
        official_domains = official.len(),
        country_mappings = countries.explicit_len(),
        "prepared run"
    );
    Ok(Prepared {
        config,
        as_of,
        taxonomy,
        registry,
        official,
        countries,
    })
}

/// Results of one run, held in memory until written.
#[derive(Debug)]
pub struct RunOutput {
    pub as_of: Timestamp,
    pub taxonomy_version: Option<String>,
    pub rules: Vec<&'static str>,
    pub profiles: BTreeMap<HostName, TechnicalProfile>,
    pub claims: BTreeMap<HostName, DomainClaimRecord>,
    pub evaluation: Evaluation,
    pub metrics: MetricsReport,
    pub ledger: ErrorLedger,
}

/// Artifact file names.
pub const TECHNICAL_PROFILES: &str = "technical_profiles.json";
pub const DOMAIN_CLAIMS: &str = "domain_claims.json";
pub const VERDICTS: &str = "verdicts.json";
pub const DOMAIN_SCORES: &str = "domain_scores.json";
pub const METRICS: &str = "metrics.json";
pub const ERROR_LEDGER: &str = "error_ledger.json";

/// Run the pipeline in memory.
pub fn execute(prepared: &Prepared) -> Result<RunOutput> {
    let inputs = &prepared.config.inputs;
    let mut ledger = ErrorLedger::new();

    let enricher = Enricher::new(Resolver::new(Arc::clone(&prepared.taxonomy)));

    let cookies = read_source::<CookieRecord>(inputs.cookies.as_deref(), Source::Cookies, &mut ledger)?
        .map(|lines| {
            let enriched = enricher.enrich_cookies(lines);
            ledger.merge(enriched.ledger);
            enriched.records
        });
    let requests = read_source::<RequestRecord>(inputs.requests.as_deref(), Source::Requests, &mut ledger)?
        .map(|lines| {
            let enriched = enricher.enrich_requests(lines);
            ledger.merge(enriched.ledger);
            enriched.records
        });
    let dataset_inputs = DatasetInputs {
        cookies,
        requests,
        headers: read_source::<HeaderRecord>(inputs.headers.as_deref(), Source::Headers, &mut ledger)?,
        tls: read_source::<TlsRecord>(inputs.tls.as_deref(), Source::Tls, &mut ledger)?,
        fingerprinting: read_source::<FingerprintRecord>(
            inputs.fingerprinting.as_deref(),
            Source::Fingerprinting,
            &mut ledger,
        )?,
    };

    let mut dataset = MasterDatasetBuilder::new(prepared.as_of).build(&dataset_inputs);
    dataset.pad_with_official(prepared.official.domains());
    ledger.merge(dataset.ledger);
    let profiles = dataset.profiles;

    let claims = match read_source::<PolicyClaim>(inputs.policies.as_deref(), Source::Policies, &mut ledger)? {
        Some(lines) => aggregate_claims(&lines),
        None => ClaimAggregation::default(),
    };
    ledger.merge(claims.ledger);
    let claims = claims.records;

    let engine = ComplianceEngine::new(prepared.registry.clone());
    let evaluation = engine.evaluate(&profiles, &claims, &prepared.countries);

    let rules = prepared.registry.ids();
    let metrics = aggregate_metrics(
        MetricsInputs {
            profiles: &profiles,
            claims: &claims,
            evaluation: &evaluation,
            rules: &rules,
        },
        &prepared.countries,
    );

    tracing::info!(
        domains = profiles.len(),
        claim_records = claims.len(),
        verdicts = evaluation.verdicts.len(),
        scored = metrics.global.scored,
        ledger_entries = ledger.len(),
        "pipeline complete"
    );
    Ok(RunOutput {
        as_of: prepared.as_of,
        taxonomy_version: prepared.taxonomy.version().map(str::to_string),
        rules,
        profiles,
        claims,
        evaluation,
        metrics,
        ledger,
    })
}

/// Read one configured source. `Ok(None)` when it is not configured.
fn read_source<T: DeserializeOwned>(
    path: Option<&Path>,
    source: Source,
    ledger: &mut ErrorLedger,
) -> Result<Option<Vec<SourceLine<T>>>> {
    let Some(path) = path else {
        tracing::debug!(source = %source, "source not configured");
        return Ok(None);
    };
    let batch = read_jsonl::<T>(path, source).with_context(|| format!("reading {source} input"))?;
    ledger.merge(batch.ledger);
    Ok(Some(batch.records))
}

impl RunOutput {
    /// Write every artifact, then the manifest, into `dir`.
    pub fn write(&self, dir: &Path) -> Result<RunManifest> {
        let mut writer = ArtifactWriter::new(dir)?;

        let profiles: Vec<&TechnicalProfile> = self.profiles.values().collect();
        writer.write(TECHNICAL_PROFILES, &profiles, profiles.len())?;

        let claims: Vec<&DomainClaimRecord> = self.claims.values().collect();
        writer.write(DOMAIN_CLAIMS, &claims, claims.len())?;

        writer.write(VERDICTS, &self.evaluation.verdicts, self.evaluation.verdicts.len())?;

        let scores: Vec<_> = self.evaluation.scores.values().collect();
        writer.write(DOMAIN_SCORES, &scores, scores.len())?;

        writer.write(METRICS, &self.metrics, self.metrics.countries.len() + 1)?;
        writer.write(ERROR_LEDGER, &self.ledger, self.ledger.len())?;

        writer.finish(self.as_of, self.taxonomy_version.clone(), self.rules.clone())
    }
}

/// Output directory: the override when given, else the configured one.
pub fn output_dir(config: &RunConfig, overridden: Option<&Path>) -> PathBuf {
    overridden
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output_dir.clone())
}
