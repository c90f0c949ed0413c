//! # privcheck-dataset: Enrichment and Master Dataset
//!
//! Turns raw measurement records into one technical profile per domain.
//!
//! - **Records** (`records.rs`): JSON Lines record types for cookies,
//!   requests, security headers, TLS and fingerprinting.
//! - **Ingest** (`jsonl.rs`): line-by-line parsing with malformed lines
//!   routed to the ledger.
//! - **Enricher** (`enrich.rs`): tracker resolution and first/third-party
//!   tagging.
//! - **Builder** (`builder.rs`): the full outer join into
//!   [`TechnicalProfile`]s, with TLS grading from `tls.rs`.
//! - **Ledger** (`ledger.rs`): per-domain non-fatal errors.
//!
//! ## Crate Policy
//!
//! - A bad line or a bad domain never fails the run; only an unreadable
//!   configured file does.
//! - Output is a pure function of the inputs and the run's `as_of`.

pub mod builder;
pub mod enrich;
pub mod error;
pub mod jsonl;
pub mod ledger;
pub mod profile;
pub mod records;
pub mod tls;

pub use builder::{DatasetInputs, MasterDataset, MasterDatasetBuilder};
pub use enrich::{EnrichedCookie, EnrichedRequest, Enricher, Enrichment, Enriched, SameSite};
pub use error::{DatasetError, DatasetResult};
pub use jsonl::{parse_jsonl, read_jsonl, JsonlBatch, SourceLine};
pub use ledger::{ErrorLedger, LedgerEntry, LedgerKind, Source, UNATTRIBUTED};
pub use profile::{
    CookieDetails, FingerprintDetails, FingerprintTechnique, HeaderDetails, RequestDetails,
    SecurityHeader, TechnicalProfile, TlsDetails,
};
pub use records::{CookieRecord, FingerprintRecord, HeaderRecord, RequestRecord, TlsRecord};
pub use tls::{TlsGrade, TlsVersion};
