//! # Domain Aggregator
//!
//! Folds every [`PolicyClaim`] of a domain into one [`DomainClaimRecord`].
//!
//! ## Resolution
//!
//! Tri-state claims resolve by disjunction: declared true if any document
//! declares it true, declared false if none does and at least one declares
//! false, silent otherwise. A domain where one document says true and
//! another says false gets a [`ClaimConflict`] in its record and a
//! `conflicting_claim` ledger entry; the claim still resolves to true.
//!
//! Details are read only from the document types that carry them:
//!
//! | Field | Read from |
//! |-------|-----------|
//! | controller | privacy policy |
//! | rights, recipients, transfer scope | privacy policy, data protection |
//! | legal bases | privacy policy |
//! | ownership, duration, consent, third parties | cookie policy |
//! | everything else | any document |
//!
//! Documents are de-duplicated by (domain, doc type, content key) where the
//! content key is the SHA-1 or, failing that, the source URL. Documents
//! with neither are all kept. Domains with no documents get no record.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use privcheck_core::HostName;
use privcheck_dataset::{ErrorLedger, LedgerEntry, Source, SourceLine};
use serde::Serialize;

use crate::document::{
    ConsentMechanism, CookieDuration, CookieOwnership, DocType, PolicyClaim, TransferScope,
};

/// Claim fields resolved by disjunction.
const COOKIE_USE: &str = "declaresCookieUse";
const THIRD_PARTY_SHARING: &str = "declaresThirdPartySharing";
const INTERNATIONAL_TRANSFER: &str = "declaresInternationalTransfer";
const COOKIE_SECTION: &str = "hasCookiePolicySection";

/// Documents disagreeing on one claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimConflict {
    /// Claim field.
    pub field: String,
    /// Documents declaring true, by source URL or doc type.
    pub declared_true: Vec<String>,
    /// Documents declaring false.
    pub declared_false: Vec<String>,
}

/// The seven rights, OR-merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RightsSummary {
    /// Right of access.
    pub access: bool,
    /// Right to rectification.
    pub rectification: bool,
    /// Right to erasure.
    pub erasure: bool,
    /// Right to object.
    pub opposition: bool,
    /// Right to data portability.
    pub portability: bool,
    /// Right to restriction of processing.
    pub restriction: bool,
    /// Right not to be subject to automated individual decisions.
    pub no_individual_decision: bool,
}

impl RightsSummary {
    fn merge(&mut self, rights: [Option<bool>; 7]) {
        let slots = [
            &mut self.access,
            &mut self.rectification,
            &mut self.erasure,
            &mut self.opposition,
            &mut self.portability,
            &mut self.restriction,
            &mut self.no_individual_decision,
        ];
        for (slot, value) in slots.into_iter().zip(rights) {
            *slot |= value == Some(true);
        }
    }

    /// Number of rights stated.
    pub fn count(&self) -> u32 {
        [
            self.access,
            self.rectification,
            self.erasure,
            self.opposition,
            self.portability,
            self.restriction,
            self.no_individual_decision,
        ]
        .into_iter()
        .filter(|b| *b)
        .count() as u32
    }
}

/// Disjunctive view of all policy documents of one domain.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainClaimRecord {
    /// Site domain.
    pub domain: HostName,
    /// Documents after de-duplication.
    pub documents: u64,
    /// A privacy policy was found.
    pub has_privacy_policy: bool,
    /// A cookie policy was found.
    pub has_cookie_policy: bool,
    /// A legal notice was found.
    pub has_legal_notice: bool,
    /// A data protection clause was found.
    pub has_data_protection: bool,
    /// Some document declares that cookies are used.
    pub declares_cookie_use: Option<bool>,
    /// Some document declares sharing with third parties.
    pub declares_third_party_sharing: Option<bool>,
    /// Some document declares an international transfer.
    pub declares_international_transfer: Option<bool>,
    /// A cookie policy or a cookie section exists.
    pub has_cookie_policy_section: Option<bool>,
    /// The data controller is identified.
    pub controller_present: bool,
    /// A data protection officer contact is given.
    pub dpo_contact_present: bool,
    /// Data subject rights stated by any document.
    pub rights: RightsSummary,
    /// Number of distinct rights stated.
    pub rights_count: u32,
    /// Some document refers to data subject rights in general terms.
    pub rights_general_statement: bool,
    /// Legal bases for processing.
    pub legal_bases: BTreeSet<String>,
    /// A retention period is stated.
    pub retention_present: bool,
    /// Named data recipients.
    pub recipients: BTreeSet<String>,
    /// Widest scope any document declares.
    pub transfer_scope: Option<TransferScope>,
    /// Automated decision-making is mentioned.
    pub automated_decisions: bool,
    /// A supervisory authority for complaints is named.
    pub complaint_authority: bool,
    /// Cookie ownership, by cookie-policy precedence.
    pub cookie_ownership: Option<CookieOwnership>,
    /// Cookie lifetime, by cookie-policy precedence.
    pub cookie_duration: Option<CookieDuration>,
    /// From the first cookie policy that names one.
    pub consent_mechanism: Option<ConsentMechanism>,
    /// Union over cookie policies that list third parties; `None` when
    /// none lists anything.
    pub declared_third_parties: Option<BTreeSet<String>>,
    /// Instructions for managing cookies are given.
    pub mgmt_instructions: bool,
    /// Source URLs of the documents, in input order.
    pub source_urls: Vec<String>,
    /// Claims the documents disagree on.
    pub conflicts: Vec<ClaimConflict>,
}

impl DomainClaimRecord {
    /// A record with no documents folded in: every claim silent.
    pub fn new(domain: HostName) -> Self {
        Self {
            domain,
            documents: 0,
            has_privacy_policy: false,
            has_cookie_policy: false,
            has_legal_notice: false,
            has_data_protection: false,
            declares_cookie_use: None,
            declares_third_party_sharing: None,
            declares_international_transfer: None,
            has_cookie_policy_section: None,
            controller_present: false,
            dpo_contact_present: false,
            rights: RightsSummary::default(),
            rights_count: 0,
            rights_general_statement: false,
            legal_bases: BTreeSet::new(),
            retention_present: false,
            recipients: BTreeSet::new(),
            transfer_scope: None,
            automated_decisions: false,
            complaint_authority: false,
            cookie_ownership: None,
            cookie_duration: None,
            consent_mechanism: None,
            declared_third_parties: None,
            mgmt_instructions: false,
            source_urls: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// Transfer scope as the compliance rules read it: the declared scope,
    /// else `International` when an international transfer is declared.
    /// An explicit denial means `IntraEu` for a site inside the EU/EEA and
    /// `None` (domestic only) anywhere else.
    pub fn effective_transfer_scope(&self, in_eu_eea: bool) -> Option<TransferScope> {
        self.transfer_scope
            .or(match self.declares_international_transfer {
                Some(true) => Some(TransferScope::International),
                Some(false) if in_eu_eea => Some(TransferScope::IntraEu),
                Some(false) => Some(TransferScope::None),
                None => None,
            })
    }

    /// Whether a privacy policy or data protection clause was found.
    pub fn has_policy(&self) -> bool {
        self.has_privacy_policy || self.has_data_protection
    }
}

/// Output of [`aggregate_claims`].
#[derive(Debug, Clone, Default)]
pub struct ClaimAggregation {
    /// One record per domain with at least one document.
    pub records: BTreeMap<HostName, DomainClaimRecord>,
    /// Unparseable domains and conflicts.
    pub ledger: ErrorLedger,
}

#[derive(Default)]
struct Votes {
    declared_true: Vec<String>,
    declared_false: Vec<String>,
}

impl Votes {
    fn cast(&mut self, value: Option<bool>, label: &str) {
        match value {
            Some(true) => self.declared_true.push(label.to_string()),
            Some(false) => self.declared_false.push(label.to_string()),
            None => {}
        }
    }

    fn resolve(&self) -> Option<bool> {
        if !self.declared_true.is_empty() {
            Some(true)
        } else if !self.declared_false.is_empty() {
            Some(false)
        } else {
            None
        }
    }

    fn conflict(self, field: &str) -> Option<ClaimConflict> {
        if self.declared_true.is_empty() || self.declared_false.is_empty() {
            return None;
        }
        Some(ClaimConflict {
            field: field.to_string(),
            declared_true: self.declared_true,
            declared_false: self.declared_false,
        })
    }
}

/// Aggregate policy documents into per-domain records.
pub fn aggregate_claims(claims: &[SourceLine<PolicyClaim>]) -> ClaimAggregation {
    let mut ledger = ErrorLedger::new();
    let mut seen: HashSet<(HostName, DocType, String)> = HashSet::new();
    let mut by_domain: BTreeMap<HostName, Vec<&PolicyClaim>> = BTreeMap::new();
    let mut duplicates = 0usize;

    for line in claims {
        let claim = &line.record;
        let domain = match HostName::parse(&claim.domain) {
            Ok(d) => d,
            Err(e) => {
                ledger.record(
                    &claim.domain,
                    LedgerEntry::malformed(Source::Policies, Some(line.line), Some("domain"), e.to_string()),
                );
                continue;
            }
        };
        if let Some(key) = claim.content_key() {
            if !seen.insert((domain.clone(), claim.doc_type, key.to_string())) {
                duplicates += 1;
                continue;
            }
        }
        by_domain.entry(domain).or_default().push(claim);
    }

    let mut records = BTreeMap::new();
    for (domain, docs) in by_domain {
        let record = fold_domain(domain.clone(), &docs);
        for conflict in &record.conflicts {
            tracing::warn!(
                domain = %domain,
                field = %conflict.field,
                declared_true = conflict.declared_true.len(),
                declared_false = conflict.declared_false.len(),
                "conflicting policy claims, resolved as declared"
            );
            ledger.record(
                domain.as_str(),
                LedgerEntry::conflicting_claim(
                    &conflict.field,
                    format!(
                        "true in [{}], false in [{}]",
                        conflict.declared_true.join(", "),
                        conflict.declared_false.join(", ")
                    ),
                ),
            );
        }
        records.insert(domain, record);
    }

    tracing::info!(
        documents = claims.len(),
        duplicates,
        domains = records.len(),
        "aggregated policy claims"
    );
    ClaimAggregation { records, ledger }
}

fn fold_domain(domain: HostName, docs: &[&PolicyClaim]) -> DomainClaimRecord {
    let mut record = DomainClaimRecord::new(domain);
    let mut cookie_use = Votes::default();
    let mut sharing = Votes::default();
    let mut transfer = Votes::default();
    let mut section = Votes::default();

    for doc in docs {
        let label = doc
            .source_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(doc.doc_type.as_str());
        let details = &doc.details;

        record.documents += 1;
        if let Some(url) = doc.source_url.as_deref().filter(|u| !u.trim().is_empty()) {
            record.source_urls.push(url.to_string());
        }
        match doc.doc_type {
            DocType::PrivacyPolicy => record.has_privacy_policy = true,
            DocType::CookiePolicy => record.has_cookie_policy = true,
            DocType::LegalNotice => record.has_legal_notice = true,
            DocType::DataProtection => record.has_data_protection = true,
            DocType::Other => {}
        }

        cookie_use.cast(doc.declares_cookie_use, label);
        sharing.cast(doc.declares_third_party_sharing, label);
        transfer.cast(doc.international_transfer(), label);
        section.cast(doc.cookie_section(), label);

        if doc.doc_type == DocType::PrivacyPolicy {
            record.controller_present |= details.controller().is_some();
            record
                .legal_bases
                .extend(details.legal_bases.iter().map(|b| b.trim()).filter(|b| !b.is_empty()).map(str::to_string));
        }
        record.dpo_contact_present |= details.dpo_contact().is_some();
        record.retention_present |= details.retention().is_some();
        record.rights_general_statement |= details.rights_general_statement == Some(true);
        record.automated_decisions |= details.automated_decisions == Some(true);
        record.complaint_authority |= details.complaint_authority == Some(true);
        record.mgmt_instructions |= details.mgmt_instructions == Some(true);

        if doc.doc_type.covers_processing() {
            record.rights.merge(details.rights.as_array());
            record
                .recipients
                .extend(details.recipients.iter().map(|r| r.trim()).filter(|r| !r.is_empty()).map(str::to_string));
            record.transfer_scope = record.transfer_scope.max(details.transfer_scope());
        }

        if doc.doc_type == DocType::CookiePolicy {
            record.cookie_ownership = record.cookie_ownership.max(details.ownership());
            record.cookie_duration = record.cookie_duration.max(details.duration());
            if record.consent_mechanism.is_none() {
                record.consent_mechanism = details.consent_mechanism();
            }
            if let Some(parties) = details.third_parties() {
                record
                    .declared_third_parties
                    .get_or_insert_with(BTreeSet::new)
                    .extend(parties.into_iter().map(str::to_string));
            }
        }
    }

    record.rights_count = record.rights.count();
    record.declares_cookie_use = cookie_use.resolve();
    record.declares_third_party_sharing = sharing.resolve();
    record.declares_international_transfer = transfer.resolve();
    record.has_cookie_policy_section = section.resolve();
    record.conflicts = [
        cookie_use.conflict(COOKIE_USE),
        sharing.conflict(THIRD_PARTY_SHARING),
        transfer.conflict(INTERNATIONAL_TRANSFER),
        section.conflict(COOKIE_SECTION),
    ]
    .into_iter()
    .flatten()
    .collect();
    record
}
