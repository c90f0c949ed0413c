//! # Policy Documents
//!
//! One [`PolicyClaim`] per discovered policy document, as produced by the
//! extraction stage. Records arrive as JSON Lines in snake_case.
//!
//! Extraction output is loosely typed: booleans may be strings, enum-like
//! fields are free text in several languages, and "not mentioned" is often
//! spelled out instead of omitted. Free-text fields are kept as received
//! and normalized on access, so a value that does not normalize reads as
//! silent rather than failing the line.

use serde::{Deserialize, Deserializer, Serialize};

/// Kind of policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocType {
    /// General privacy policy.
    PrivacyPolicy,
    /// Cookie policy.
    CookiePolicy,
    /// Legal notice.
    LegalNotice,
    /// Data protection clause.
    DataProtection,
    /// Anything the extractor labelled otherwise.
    #[serde(other)]
    Other,
}

impl DocType {
    /// Upper snake-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrivacyPolicy => "PRIVACY_POLICY",
            Self::CookiePolicy => "COOKIE_POLICY",
            Self::LegalNotice => "LEGAL_NOTICE",
            Self::DataProtection => "DATA_PROTECTION",
            Self::Other => "OTHER",
        }
    }

    /// Documents whose rights, recipients and transfer statements count.
    pub fn covers_processing(&self) -> bool {
        matches!(self, Self::PrivacyPolicy | Self::DataProtection)
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared scope of personal-data transfers, ordered by reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferScope {
    /// No transfers to third parties.
    None,
    /// Transfers within the EU/EEA only.
    IntraEu,
    /// Transfers outside the EU/EEA.
    International,
}

impl TransferScope {
    /// Normalize extractor text: anything mentioning `INTERNAC` is
    /// international; `INTRA`, `UE` or `EEE` is intra-EU; `NONE` or
    /// `NINGUNA` is none. Checked in that order.
    pub fn normalize(raw: &str) -> Option<Self> {
        let upper = raw.to_uppercase();
        if upper.contains("INTERNAC") || upper.contains("INTERNATIONAL") {
            Some(Self::International)
        } else if upper.contains("INTRA") || upper.contains("UE") || upper.contains("EEE") {
            Some(Self::IntraEu)
        } else if upper.contains("NONE") || upper.contains("NINGUNA") {
            Some(Self::None)
        } else {
            None
        }
    }
}

/// Who sets the cookies a cookie policy describes. `Mixed` outranks
/// `Third`, which outranks `First`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CookieOwnership {
    /// Only the site's own cookies.
    First,
    /// Third-party cookies.
    Third,
    /// Both.
    Mixed,
}

impl CookieOwnership {
    /// Lenient parse of `FIRST`/`THIRD`/`MIXED` and Spanish equivalents.
    pub fn normalize(raw: &str) -> Option<Self> {
        let upper = raw.to_uppercase();
        if upper.contains("MIX") {
            Some(Self::Mixed)
        } else if upper.contains("THIRD") || upper.contains("TERCER") {
            Some(Self::Third)
        } else if upper.contains("FIRST") || upper.contains("PROPIA") {
            Some(Self::First)
        } else {
            None
        }
    }
}

/// Declared cookie lifetime. `Persistent` outranks `Session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieDuration {
    /// Session cookies only.
    Session,
    /// Some cookies persist beyond the session.
    Persistent,
}

impl CookieDuration {
    /// `session`/`sesión` without any mention of persistence reads as
    /// session-only; any mention of persistence reads as persistent.
    pub fn normalize(raw: &str) -> Option<Self> {
        let lower = raw.to_lowercase();
        if lower.contains("persist") {
            Some(Self::Persistent)
        } else if lower.contains("session") || lower.contains("sesion") || lower.contains("sesión") {
            Some(Self::Session)
        } else {
            None
        }
    }
}

/// How cookie consent is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentMechanism {
    /// A consent banner.
    Banner,
    /// A consent management platform.
    Cmp,
    /// No mechanism.
    None,
    /// Something else (browser settings, a form).
    Other,
}

impl ConsentMechanism {
    /// All mechanisms.
    pub const ALL: [ConsentMechanism; 4] = [Self::Banner, Self::Cmp, Self::None, Self::Other];

    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::Cmp => "cmp",
            Self::None => "none",
            Self::Other => "other",
        }
    }

    /// Lenient parse; any non-silent text that is not recognized is
    /// `Other`.
    pub fn normalize(raw: &str) -> Option<Self> {
        if is_silent(raw) {
            return None;
        }
        let lower = raw.trim().to_lowercase();
        Some(if lower.contains("cmp") || lower.contains("consent management") {
            Self::Cmp
        } else if lower.contains("banner") || lower.contains("aviso") {
            Self::Banner
        } else if matches!(lower.as_str(), "none" | "ninguno" | "ninguna" | "no") {
            Self::None
        } else {
            Self::Other
        })
    }

    /// Whether consent is collected before tracking by design.
    pub fn gates_tracking(&self) -> bool {
        matches!(self, Self::Banner | Self::Cmp)
    }
}

/// Whether extractor text says the document is silent on the topic.
pub fn is_silent(raw: &str) -> bool {
    let t = raw.trim().trim_end_matches('.').trim().to_lowercase();
    let collapsed: String = t.split_whitespace().collect::<Vec<_>>().join(" ");
    matches!(
        collapsed.as_str(),
        "" | "null" | "no se menciona" | "no aplica" | "n/a" | "na" | "not mentioned" | "unspecified"
    )
}

/// The seven data-subject rights. `None` means not mentioned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Rights {
    #[serde(deserialize_with = "tri_state")]
    pub access: Option<bool>,
    #[serde(deserialize_with = "tri_state")]
    pub rectification: Option<bool>,
    #[serde(deserialize_with = "tri_state")]
    pub erasure: Option<bool>,
    #[serde(deserialize_with = "tri_state")]
    pub opposition: Option<bool>,
    #[serde(deserialize_with = "tri_state")]
    pub portability: Option<bool>,
    #[serde(deserialize_with = "tri_state")]
    pub restriction: Option<bool>,
    #[serde(deserialize_with = "tri_state")]
    pub no_individual_decision: Option<bool>,
}

impl Rights {
    /// Rights in a fixed order.
    pub fn as_array(&self) -> [Option<bool>; 7] {
        [
            self.access,
            self.rectification,
            self.erasure,
            self.opposition,
            self.portability,
            self.restriction,
            self.no_individual_decision,
        ]
    }
}

/// Cookie duration as extracted: either a label or the extractor's
/// `{session, persistent}` flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DurationField {
    Label(String),
    Flags {
        #[serde(default)]
        session: Option<bool>,
        #[serde(default)]
        persistent: Option<bool>,
    },
}

/// Extracted details. Which fields are meaningful depends on the
/// document type; the aggregator only reads each field from the document
/// types that carry it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PolicyDetails {
    pub controller: Option<String>,
    #[serde(alias = "dpo")]
    pub dpo_contact: Option<String>,
    pub rights: Rights,
    #[serde(deserialize_with = "tri_state")]
    pub rights_general_statement: Option<bool>,
    pub legal_bases: Vec<String>,
    pub retention: Option<String>,
    pub recipients: Vec<String>,
    pub transfer_scope: Option<String>,
    #[serde(deserialize_with = "tri_state")]
    pub automated_decisions: Option<bool>,
    #[serde(deserialize_with = "tri_state")]
    pub complaint_authority: Option<bool>,
    #[serde(alias = "cookie_ownership")]
    pub ownership: Option<String>,
    #[serde(alias = "cookie_duration")]
    pub duration: Option<DurationField>,
    pub consent_mechanism: Option<String>,
    /// Third parties a cookie policy lists; `None` when it lists nothing
    /// at all, `Some(empty)` when it states there are none.
    pub third_parties: Option<Vec<String>>,
    #[serde(deserialize_with = "tri_state")]
    pub mgmt_instructions: Option<bool>,
}

impl PolicyDetails {
    /// Non-silent controller identity.
    pub fn controller(&self) -> Option<&str> {
        stated(self.controller.as_deref())
    }

    /// Non-silent DPO contact.
    pub fn dpo_contact(&self) -> Option<&str> {
        stated(self.dpo_contact.as_deref())
    }

    /// Non-silent retention statement.
    pub fn retention(&self) -> Option<&str> {
        stated(self.retention.as_deref())
    }

    /// Normalized transfer scope.
    pub fn transfer_scope(&self) -> Option<TransferScope> {
        stated(self.transfer_scope.as_deref()).and_then(TransferScope::normalize)
    }

    /// Normalized cookie ownership.
    pub fn ownership(&self) -> Option<CookieOwnership> {
        stated(self.ownership.as_deref()).and_then(CookieOwnership::normalize)
    }

    /// Normalized cookie duration.
    pub fn duration(&self) -> Option<CookieDuration> {
        match self.duration.as_ref()? {
            DurationField::Label(raw) => stated(Some(raw.as_str())).and_then(CookieDuration::normalize),
            DurationField::Flags { session, persistent } => match (*session, *persistent) {
                (_, Some(true)) => Some(CookieDuration::Persistent),
                (Some(true), _) => Some(CookieDuration::Session),
                _ => None,
            },
        }
    }

    /// Normalized consent mechanism.
    pub fn consent_mechanism(&self) -> Option<ConsentMechanism> {
        self.consent_mechanism
            .as_deref()
            .and_then(ConsentMechanism::normalize)
    }

    /// Listed third parties with silent entries dropped.
    pub fn third_parties(&self) -> Option<Vec<&str>> {
        self.third_parties.as_ref().map(|list| {
            list.iter()
                .map(|s| s.trim())
                .filter(|s| !is_silent(s))
                .collect()
        })
    }
}

fn stated(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !is_silent(s))
}

/// One extracted policy document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PolicyClaim {
    /// Site the document belongs to, as received.
    pub domain: String,
    /// Where the document was found.
    #[serde(default, alias = "url")]
    pub source_url: Option<String>,
    /// Document kind.
    pub doc_type: DocType,
    /// SHA-1 of the document text, used for de-duplication.
    #[serde(default)]
    pub sha1: Option<String>,
    /// The site says it uses cookies.
    #[serde(default, deserialize_with = "tri_state")]
    pub declares_cookie_use: Option<bool>,
    /// The site says it shares data with third parties.
    #[serde(default, deserialize_with = "tri_state")]
    pub declares_third_party_sharing: Option<bool>,
    /// The site says it transfers data internationally.
    #[serde(default, deserialize_with = "tri_state")]
    pub declares_international_transfer: Option<bool>,
    /// The document has a cookie section.
    #[serde(default, deserialize_with = "tri_state")]
    pub has_cookie_policy_section: Option<bool>,
    /// Extracted details.
    #[serde(default)]
    pub details: PolicyDetails,
}

impl PolicyClaim {
    /// Identity for de-duplication: the content hash, else the URL.
    pub fn content_key(&self) -> Option<&str> {
        self.sha1
            .as_deref()
            .or(self.source_url.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Cookie section, implied by the document being a cookie policy.
    pub fn cookie_section(&self) -> Option<bool> {
        if self.doc_type == DocType::CookiePolicy {
            Some(true)
        } else {
            self.has_cookie_policy_section
        }
    }

    /// International transfer, implied by an international transfer scope.
    pub fn international_transfer(&self) -> Option<bool> {
        if self.details.transfer_scope() == Some(TransferScope::International) {
            Some(true)
        } else {
            self.declares_international_transfer
        }
    }
}

/// Booleans as extractors emit them: JSON booleans, `0`/`1`, or strings
/// like `"true"`, `"no"`, `"sí"`. Silent strings and `null` are `None`.
fn tri_state<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(tri_state_value))
}

fn tri_state_value(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" | "si" | "sí" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
