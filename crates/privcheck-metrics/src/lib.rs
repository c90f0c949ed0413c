//! # privcheck-metrics: Aggregate Metrics
//!
//! Per-country and global roll-ups of one run.
//!
//! - **Country** (`country.rs`): [`CountryResolver`] assigns each domain a
//!   country from the official lists or its ccTLD.
//! - **Stats** (`stats.rs`): order-independent robust statistics.
//! - **Report** (`report.rs`): [`aggregate_metrics`] builds the
//!   [`MetricsReport`].

pub mod country;
pub mod report;
pub mod stats;

pub use country::{CountryResolver, UNASSIGNED};
pub use report::{
    aggregate_metrics, FingerprintPrevalence, GroupMetrics, HeaderPresence, MetricsInputs, MetricsReport,
    OutcomeCounts, PolicyCoverage, RobustMetrics, TrackerPresence, UNKNOWN_KEY,
};
pub use stats::{percent, robust_stats, RobustStats, HIGH_CV_THRESHOLD};
