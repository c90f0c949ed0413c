//! # Robust Statistics
//!
//! Summary statistics over a sample of finite values. Input is sorted
//! before anything is computed, so the result never depends on the order
//! domains were processed in.
//!
//! Quantiles interpolate linearly between closest ranks. Standard
//! deviation is the population form (divide by `n`). The coefficient of
//! variation divides by the mean, or by 1 when the mean is 0.

use serde::Serialize;

/// CV above which a metric is flagged as highly dispersed.
pub const HIGH_CV_THRESHOLD: f64 = 1.0;

/// Summary of one metric over a group of domains.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RobustStats {
    /// Sample size (domains where the metric was known).
    pub n: u64,
    pub mean: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    /// `q3 - q1`.
    pub iqr: f64,
    pub std_dev: f64,
    /// Coefficient of variation.
    pub cv: f64,
    /// `cv > 1`.
    pub high_cv: bool,
}

/// Summarize `values`; `None` for an empty sample. Non-finite values are
/// ignored.
pub fn robust_stats(values: &[f64]) -> Option<RobustStats> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();
    let cv = std_dev / if mean == 0.0 { 1.0 } else { mean };
    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);

    Some(RobustStats {
        n: sorted.len() as u64,
        mean: round4(mean),
        median: round4(quantile(&sorted, 0.5)),
        q1: round4(q1),
        q3: round4(q3),
        iqr: round4(q3 - q1),
        std_dev: round4(std_dev),
        cv: round4(cv),
        high_cv: cv > HIGH_CV_THRESHOLD,
    })
}

/// Linear-interpolation quantile of a sorted, non-empty slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Mean of `values`; `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    robust_stats(values).map(|s| s.mean)
}

/// `num / den` as a percentage with two decimals; `None` when `den` is 0.
pub fn percent(num: u64, den: u64) -> Option<f64> {
    (den > 0).then(|| (num as f64 / den as f64 * 10_000.0).round() / 100.0)
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn quartiles_interpolate() {
        let s = robust_stats(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.n, 4);
        assert_eq!(s.median, 2.5);
        assert_eq!(s.q1, 1.75);
        assert_eq!(s.q3, 3.25);
        assert_eq!(s.iqr, 1.5);
        assert_eq!(s.mean, 2.5);
    }

    #[test]
    fn cv_uses_unit_denominator_for_zero_mean() {
        let s = robust_stats(&[0.0, 0.0]).unwrap();
        assert_eq!(s.cv, 0.0);
        assert!(!s.high_cv);
    }

    #[test]
    fn skewed_sample_is_high_cv() {
        let s = robust_stats(&[0.0, 0.0, 0.0, 0.0, 100.0]).unwrap();
        assert!(s.cv > 1.0);
        assert!(s.high_cv);
    }

    #[test]
    fn empty_and_non_finite() {
        assert_eq!(robust_stats(&[]), None);
        assert_eq!(robust_stats(&[f64::NAN]), None);
        assert_eq!(robust_stats(&[f64::INFINITY, 2.0]).unwrap().n, 1);
    }

    #[test]
    fn percent_two_decimals() {
        assert_eq!(percent(1, 3), Some(33.33));
        assert_eq!(percent(0, 0), None);
        assert_eq!(percent(5, 5), Some(100.0));
    }

    proptest! {
        #[test]
        fn order_independent(mut values in proptest::collection::vec(0.0f64..1000.0, 1..50)) {
            let forward = robust_stats(&values);
            values.reverse();
            prop_assert_eq!(forward, robust_stats(&values));
        }

        #[test]
        fn quartiles_are_ordered(values in proptest::collection::vec(-100.0f64..100.0, 1..50)) {
            let s = robust_stats(&values).unwrap();
            prop_assert!(s.q1 <= s.median && s.median <= s.q3);
            prop_assert!(s.iqr >= 0.0);
        }
    }
}
