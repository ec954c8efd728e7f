//! Statistics engine: descriptive statistics, hypothesis tests, effect sizes
//!
//! ## Example
//!
//! ```rust
//! use specbench::stats::StatisticsEngine;
//!
//! let summary = StatisticsEngine::calculate_descriptive_stats(&[1.0, 2.0, 3.0, 4.0, 5.0])?;
//! assert!((summary.mean - 3.0).abs() < 1e-12);
//! assert!((summary.variance - 2.5).abs() < 1e-12);
//!
//! let comparison = StatisticsEngine::compare_datasets(
//!     &[1.0, 2.0, 3.0, 4.0, 5.0],
//!     &[6.0, 7.0, 8.0, 9.0, 10.0],
//!     0.05,
//! )?;
//! assert!(comparison.t_test.is_significant);
//! # Ok::<(), specbench::Error>(())
//! ```

pub mod distributions;
mod normality;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::experiment::{Metadata, StatisticalSummary};
use crate::{Error, Result};

use distributions::{f_cdf, normal_ppf, student_t_ppf, student_t_two_tailed_p};

/// Default alpha for hypothesis tests.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;
/// Confidence level of reported intervals.
pub const CONFIDENCE_LEVEL: f64 = 0.95;
/// Below this many points the interval collapses to the single value.
pub const MIN_SAMPLE_SIZE_FOR_CI: usize = 2;
/// Samples smaller than this use the t distribution for intervals.
pub const SMALL_SAMPLE_THRESHOLD: usize = 30;
/// Minimum points per side for a two-sample comparison.
pub const MIN_COMPARISON_SAMPLES: usize = 2;
/// Minimum points for normality and outlier checks.
pub const MIN_NORMALITY_TEST_SAMPLES: usize = 3;
/// Samples smaller than this use Shapiro–Wilk, larger ones Anderson–Darling.
pub const SHAPIRO_WILK_THRESHOLD: usize = 50;
/// |d| below this is negligible.
pub const COHEN_D_NEGLIGIBLE: f64 = 0.2;
/// |d| below this is small.
pub const COHEN_D_SMALL: f64 = 0.5;
/// |d| below this is medium, otherwise large.
pub const COHEN_D_MEDIUM: f64 = 0.8;
/// Tukey fence multiplier.
pub const IQR_FENCE_MULTIPLIER: f64 = 1.5;

/// Magnitude band of Cohen's d.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectInterpretation {
    /// |d| < 0.2
    Negligible,
    /// 0.2 ≤ |d| < 0.5
    Small,
    /// 0.5 ≤ |d| < 0.8
    Medium,
    /// |d| ≥ 0.8
    Large,
}

impl EffectInterpretation {
    /// Classify a Cohen's d value.
    #[must_use]
    pub fn from_cohens_d(d: f64) -> Self {
        let magnitude = d.abs();
        if magnitude < COHEN_D_NEGLIGIBLE {
            Self::Negligible
        } else if magnitude < COHEN_D_SMALL {
            Self::Small
        } else if magnitude < COHEN_D_MEDIUM {
            Self::Medium
        } else {
            Self::Large
        }
    }
}

impl fmt::Display for EffectInterpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Negligible => "negligible",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        };
        f.write_str(label)
    }
}

/// Pooled-variance independent two-sample t-test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTest {
    /// `(mean_baseline - mean_comparison) / se`.
    pub statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// `n1 + n2 - 2`.
    pub degrees_of_freedom: usize,
    /// `p_value < alpha`.
    pub is_significant: bool,
    /// Significance level used.
    pub alpha: f64,
}

/// Two-tailed F-test of equal variances.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FTest {
    /// `var_comparison / var_baseline`.
    pub statistic: f64,
    /// Two-tailed p-value.
    pub p_value: f64,
    /// `p_value < alpha`.
    pub is_significant: bool,
    /// Significance level used.
    pub alpha: f64,
}

/// Standardized mean difference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectSize {
    /// `(mean_comparison - mean_baseline) / pooled_std`.
    pub cohens_d: f64,
    /// Magnitude band.
    pub interpretation: EffectInterpretation,
}

/// Full two-sample comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetComparison {
    /// Baseline summary.
    pub baseline_stats: StatisticalSummary,
    /// Comparison summary.
    pub comparison_stats: StatisticalSummary,
    /// Mean difference test.
    pub t_test: TTest,
    /// Variance ratio test.
    pub f_test: FTest,
    /// Effect size.
    pub effect_size: EffectSize,
    /// Pooled standard deviation of both samples.
    pub pooled_std: f64,
}

/// Outcome of the normality check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum NormalityTest {
    /// Not enough (or constant) data.
    NotApplicable {
        /// Why the test was skipped.
        reason: String,
    },
    /// Shapiro–Wilk, used below 50 points.
    ShapiroWilk {
        /// W statistic.
        statistic: f64,
        /// p-value.
        p_value: f64,
        /// `p_value > 0.05`.
        is_normal: bool,
    },
    /// Anderson–Darling, used from 50 points.
    AndersonDarling {
        /// A² statistic.
        statistic: f64,
        /// 5% critical value.
        critical_value: f64,
        /// `statistic < critical_value`.
        is_normal: bool,
    },
}

/// Outcome of Tukey-fence outlier detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "method")]
pub enum OutlierDetection {
    /// Not enough data.
    NotApplicable {
        /// Why detection was skipped.
        reason: String,
    },
    /// Interquartile-range fences.
    #[serde(rename = "IQR")]
    Iqr {
        /// `Q1 - 1.5 IQR`.
        lower_bound: f64,
        /// `Q3 + 1.5 IQR`.
        upper_bound: f64,
        /// Points outside the fences, in input order.
        outliers: Vec<f64>,
        /// Number of outliers.
        outlier_count: usize,
        /// Share of outliers in percent.
        outlier_percentage: f64,
    },
}

/// Result of [`StatisticsEngine::validate_statistical_assumptions`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssumptionChecks {
    /// Normality test outcome.
    pub normality_test: NormalityTest,
    /// Outlier detection outcome.
    pub outlier_detection: OutlierDetection,
}

/// Per-metric outcome of an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricAggregate {
    /// Statistics of the metric.
    Summary(StatisticalSummary),
    /// Statistics could not be computed.
    Error {
        /// Error description.
        error: String,
    },
}

/// Data-quality counters of an aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataQuality {
    /// Results carrying every analyzed metric.
    pub complete_experiments: usize,
    /// Metrics whose statistics were computed.
    pub metrics_with_valid_data: usize,
}

/// Result of [`StatisticsEngine::aggregate_experiment_results`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedResults {
    /// Number of input results.
    pub total_experiments: usize,
    /// Numeric fields found, in first-seen order.
    pub metrics_analyzed: Vec<String>,
    /// Outcome per metric.
    pub statistics: BTreeMap<String, MetricAggregate>,
    /// Quality counters.
    pub data_quality: DataQuality,
}

/// Stateless statistics functions.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Descriptive statistics with a 95% confidence interval of the mean.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] for an empty sample and
    /// [`Error::InvalidData`] if any value is NaN or infinite.
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate_descriptive_stats(data: &[f64]) -> Result<StatisticalSummary> {
        if data.is_empty() {
            return Err(Error::InsufficientData(
                "Cannot calculate statistics for empty dataset".to_string(),
            ));
        }
        if let Some(bad) = data.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidData(format!(
                "Dataset contains non-finite value: {bad}"
            )));
        }

        let n = data.len();
        let min_value = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max_value = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Rounding can push the mean of near-constant data just outside [min, max]
        let mean = (data.iter().sum::<f64>() / n as f64).clamp(min_value, max_value);
        let std_dev = if n > 1 {
            (data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        let variance = std_dev * std_dev;

        Ok(StatisticalSummary {
            mean,
            variance,
            std_dev,
            confidence_interval: confidence_interval(mean, std_dev, n),
            sample_size: n,
            min_value,
            max_value,
        })
    }

    /// Convert JSON values to numbers for the statistics functions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidData`] for any value that is not a JSON number.
    pub fn numeric_values(values: &[Value]) -> Result<Vec<f64>> {
        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| Error::InvalidData(format!("Non-numeric value in dataset: {v}")))
            })
            .collect()
    }

    /// Compare two samples with a t-test, an F-test and Cohen's d.
    ///
    /// Zero-variance samples are handled without NaN: equal constant samples
    /// give `t = 0, p = 1`, different ones `t = ±∞, p = 0`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if either sample has fewer than two
    /// points, or the errors of [`Self::calculate_descriptive_stats`].
    #[allow(clippy::cast_precision_loss)]
    pub fn compare_datasets(
        baseline: &[f64],
        comparison: &[f64],
        alpha: f64,
    ) -> Result<DatasetComparison> {
        if baseline.len() < MIN_COMPARISON_SAMPLES || comparison.len() < MIN_COMPARISON_SAMPLES {
            return Err(Error::InsufficientData(format!(
                "At least {MIN_COMPARISON_SAMPLES} data points required in each dataset for comparison"
            )));
        }
        let baseline_stats = Self::calculate_descriptive_stats(baseline)?;
        let comparison_stats = Self::calculate_descriptive_stats(comparison)?;

        let n1 = baseline.len() as f64;
        let n2 = comparison.len() as f64;
        let df = baseline.len() + comparison.len() - 2;
        let pooled_variance = ((n1 - 1.0) * baseline_stats.variance
            + (n2 - 1.0) * comparison_stats.variance)
            / df as f64;
        let pooled_std = pooled_variance.sqrt();

        let mean_difference = baseline_stats.mean - comparison_stats.mean;
        let standard_error = pooled_std * (1.0 / n1 + 1.0 / n2).sqrt();
        let (t_statistic, t_p_value) = if standard_error > 0.0 {
            let t = mean_difference / standard_error;
            (t, student_t_two_tailed_p(t, df as f64))
        } else if mean_difference == 0.0 {
            (0.0, 1.0)
        } else {
            (f64::INFINITY.copysign(mean_difference), 0.0)
        };

        let (f_statistic, f_p_value) = match (baseline_stats.variance, comparison_stats.variance) {
            (b, c) if b == 0.0 && c == 0.0 => (1.0, 1.0),
            (b, _) if b == 0.0 => (f64::INFINITY, 0.0),
            (b, c) => {
                let f = c / b;
                let cdf = f_cdf(f, n2 - 1.0, n1 - 1.0);
                (f, (2.0 * cdf.min(1.0 - cdf)).clamp(0.0, 1.0))
            }
        };

        let cohens_d = if pooled_std > 0.0 {
            (comparison_stats.mean - baseline_stats.mean) / pooled_std
        } else {
            0.0
        };

        Ok(DatasetComparison {
            baseline_stats,
            comparison_stats,
            t_test: TTest {
                statistic: t_statistic,
                p_value: t_p_value,
                degrees_of_freedom: df,
                is_significant: t_p_value < alpha,
                alpha,
            },
            f_test: FTest {
                statistic: f_statistic,
                p_value: f_p_value,
                is_significant: f_p_value < alpha,
                alpha,
            },
            effect_size: EffectSize {
                cohens_d,
                interpretation: EffectInterpretation::from_cohens_d(cohens_d),
            },
            pooled_std,
        })
    }

    /// Normality test and outlier detection.
    ///
    /// Both checks are reported as not applicable below three points; the
    /// normality test is also skipped for constant data.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn validate_statistical_assumptions(data: &[f64]) -> AssumptionChecks {
        if data.len() < MIN_NORMALITY_TEST_SAMPLES {
            let reason = format!("Insufficient data (n < {MIN_NORMALITY_TEST_SAMPLES})");
            return AssumptionChecks {
                normality_test: NormalityTest::NotApplicable {
                    reason: reason.clone(),
                },
                outlier_detection: OutlierDetection::NotApplicable { reason },
            };
        }

        let mut sorted = data.to_vec();
        sorted.sort_by(f64::total_cmp);

        let constant = sorted.first() == sorted.last();
        let normality_test = if constant {
            NormalityTest::NotApplicable {
                reason: "Zero variance".to_string(),
            }
        } else if sorted.len() < SHAPIRO_WILK_THRESHOLD {
            let (statistic, p_value) = normality::shapiro_wilk(&sorted);
            NormalityTest::ShapiroWilk {
                statistic,
                p_value,
                is_normal: p_value > SIGNIFICANCE_LEVEL,
            }
        } else {
            let (statistic, critical_value) = normality::anderson_darling(&sorted);
            NormalityTest::AndersonDarling {
                statistic,
                critical_value,
                is_normal: statistic < critical_value,
            }
        };

        let q1 = percentile(&sorted, 25.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let lower_bound = q1 - IQR_FENCE_MULTIPLIER * iqr;
        let upper_bound = q3 + IQR_FENCE_MULTIPLIER * iqr;
        let outliers: Vec<f64> = data
            .iter()
            .copied()
            .filter(|x| *x < lower_bound || *x > upper_bound)
            .collect();
        let outlier_count = outliers.len();

        AssumptionChecks {
            normality_test,
            outlier_detection: OutlierDetection::Iqr {
                lower_bound,
                upper_bound,
                outliers,
                outlier_count,
                outlier_percentage: outlier_count as f64 / data.len() as f64 * 100.0,
            },
        }
    }

    /// Descriptive statistics of every numeric top-level field across results.
    ///
    /// Booleans and non-finite numbers are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] for an empty input and
    /// [`Error::InvalidData`] when no result carries a numeric field.
    pub fn aggregate_experiment_results(results: &[Metadata]) -> Result<AggregatedResults> {
        if results.is_empty() {
            return Err(Error::InsufficientData(
                "No experiment results provided for aggregation".to_string(),
            ));
        }

        let mut order: Vec<String> = Vec::new();
        let mut values: HashMap<String, Vec<f64>> = HashMap::new();
        for result in results {
            for (key, value) in result {
                let Some(number) = value.as_f64().filter(|v| v.is_finite()) else {
                    continue;
                };
                values
                    .entry(key.clone())
                    .or_insert_with(|| {
                        order.push(key.clone());
                        Vec::new()
                    })
                    .push(number);
            }
        }

        if order.is_empty() {
            return Err(Error::InvalidData(
                "No valid numerical metrics found in experiment results".to_string(),
            ));
        }

        let statistics: BTreeMap<String, MetricAggregate> = order
            .iter()
            .map(|metric| {
                let samples = values.get(metric).map_or(&[][..], Vec::as_slice);
                let outcome = match Self::calculate_descriptive_stats(samples) {
                    Ok(summary) => MetricAggregate::Summary(summary),
                    Err(e) => MetricAggregate::Error {
                        error: e.to_string(),
                    },
                };
                (metric.clone(), outcome)
            })
            .collect();

        let complete_experiments = results
            .iter()
            .filter(|r| {
                order
                    .iter()
                    .all(|m| r.get(m).and_then(Value::as_f64).is_some_and(f64::is_finite))
            })
            .count();
        let metrics_with_valid_data = statistics
            .values()
            .filter(|s| matches!(s, MetricAggregate::Summary(_)))
            .count();

        Ok(AggregatedResults {
            total_experiments: results.len(),
            metrics_analyzed: order,
            statistics,
            data_quality: DataQuality {
                complete_experiments,
                metrics_with_valid_data,
            },
        })
    }

    /// Two-sided critical value of the t distribution for `confidence`.
    #[must_use]
    pub fn t_critical(confidence: f64, degrees_of_freedom: f64) -> f64 {
        student_t_ppf((1.0 + confidence) / 2.0, degrees_of_freedom)
    }
}

#[allow(clippy::cast_precision_loss)]
fn confidence_interval(mean: f64, std_dev: f64, n: usize) -> (f64, f64) {
    if n < MIN_SAMPLE_SIZE_FOR_CI {
        return (mean, mean);
    }
    let standard_error = std_dev / (n as f64).sqrt();
    let critical = if n < SMALL_SAMPLE_THRESHOLD {
        StatisticsEngine::t_critical(CONFIDENCE_LEVEL, (n - 1) as f64)
    } else {
        normal_ppf((1.0 + CONFIDENCE_LEVEL) / 2.0)
    };
    let margin = critical * standard_error;
    (mean - margin, mean + margin)
}

/// Linear-interpolated percentile of an ascending, non-empty slice.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = (sorted.len() - 1) as f64 * pct / 100.0;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_descriptive_stats_reference() {
        let s = StatisticsEngine::calculate_descriptive_stats(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(close(s.mean, 3.0, 1e-12));
        assert!(close(s.variance, 2.5, 1e-12));
        assert!(close(s.std_dev, 1.581_139, 1e-6));
        assert_eq!(s.sample_size, 5);
        assert!(close(s.confidence_interval.0, 1.036_757, 1e-4));
        assert!(close(s.confidence_interval.1, 4.963_243, 1e-4));
        assert!(close(s.min_value, 1.0, f64::EPSILON));
        assert!(close(s.max_value, 5.0, f64::EPSILON));
    }

    #[test]
    fn test_descriptive_stats_errors() {
        assert!(matches!(
            StatisticsEngine::calculate_descriptive_stats(&[]),
            Err(Error::InsufficientData(_))
        ));
        assert!(matches!(
            StatisticsEngine::calculate_descriptive_stats(&[1.0, f64::NAN]),
            Err(Error::InvalidData(_))
        ));
        assert!(matches!(
            StatisticsEngine::calculate_descriptive_stats(&[f64::INFINITY]),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_single_value_interval_collapses() {
        let s = StatisticsEngine::calculate_descriptive_stats(&[42.0]).unwrap();
        assert_eq!(s.confidence_interval, (42.0, 42.0));
        assert!(s.variance.abs() < f64::EPSILON);
        assert!(s.std_dev.abs() < f64::EPSILON);
    }

    #[test]
    fn test_large_sample_uses_normal_critical_value() {
        let data: Vec<f64> = (0..100).map(f64::from).collect();
        let s = StatisticsEngine::calculate_descriptive_stats(&data).unwrap();
        let half_width = s.confidence_interval.1 - s.mean;
        let expected = 1.959_964 * s.std_dev / 10.0;
        assert!(close(half_width, expected, 1e-4));
    }

    #[test]
    fn test_numeric_values_rejects_strings() {
        let ok = StatisticsEngine::numeric_values(&[json!(1), json!(2.5)]).unwrap();
        assert_eq!(ok, vec![1.0, 2.5]);
        assert!(matches!(
            StatisticsEngine::numeric_values(&[json!(1), json!("two")]),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_compare_datasets_reference() {
        let c = StatisticsEngine::compare_datasets(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[6.0, 7.0, 8.0, 9.0, 10.0],
            SIGNIFICANCE_LEVEL,
        )
        .unwrap();
        assert!(close(c.t_test.statistic, -5.0, 1e-9));
        assert_eq!(c.t_test.degrees_of_freedom, 8);
        assert!(close(c.t_test.p_value, 0.001_052_8, 1e-6));
        assert!(c.t_test.is_significant);
        assert!(close(c.f_test.statistic, 1.0, 1e-12));
        assert!(close(c.f_test.p_value, 1.0, 1e-9));
        assert!(close(c.effect_size.cohens_d, 3.162_278, 1e-6));
        assert_eq!(c.effect_size.interpretation, EffectInterpretation::Large);
    }

    #[test]
    fn test_compare_datasets_requires_two_points() {
        assert!(matches!(
            StatisticsEngine::compare_datasets(&[1.0], &[1.0, 2.0], SIGNIFICANCE_LEVEL),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_compare_constant_datasets() {
        let equal =
            StatisticsEngine::compare_datasets(&[3.0, 3.0], &[3.0, 3.0, 3.0], 0.05).unwrap();
        assert!(equal.t_test.statistic.abs() < f64::EPSILON);
        assert!(close(equal.t_test.p_value, 1.0, f64::EPSILON));
        assert!(!equal.t_test.is_significant);
        assert!(equal.effect_size.cohens_d.abs() < f64::EPSILON);

        let different = StatisticsEngine::compare_datasets(&[1.0, 1.0], &[2.0, 2.0], 0.05).unwrap();
        assert!(different.t_test.statistic.is_infinite());
        assert!(different.t_test.statistic < 0.0);
        assert!(different.t_test.is_significant);
    }

    #[test]
    fn test_effect_interpretation_bands() {
        assert_eq!(EffectInterpretation::from_cohens_d(0.1), EffectInterpretation::Negligible);
        assert_eq!(EffectInterpretation::from_cohens_d(-0.3), EffectInterpretation::Small);
        assert_eq!(EffectInterpretation::from_cohens_d(0.5), EffectInterpretation::Medium);
        assert_eq!(EffectInterpretation::from_cohens_d(-0.8), EffectInterpretation::Large);
        assert_eq!(EffectInterpretation::Medium.to_string(), "medium");
    }

    #[test]
    fn test_assumptions_small_sample_not_applicable() {
        let checks = StatisticsEngine::validate_statistical_assumptions(&[1.0, 2.0]);
        assert!(matches!(checks.normality_test, NormalityTest::NotApplicable { .. }));
        assert!(matches!(checks.outlier_detection, OutlierDetection::NotApplicable { .. }));
    }

    #[test]
    fn test_assumptions_detects_outlier() {
        let data = [10.0, 11.0, 12.0, 11.5, 10.5, 11.2, 100.0];
        let checks = StatisticsEngine::validate_statistical_assumptions(&data);
        let OutlierDetection::Iqr {
            outliers,
            outlier_count,
            ..
        } = checks.outlier_detection
        else {
            panic!("expected IQR detection");
        };
        assert_eq!(outliers, vec![100.0]);
        assert_eq!(outlier_count, 1);
        assert!(matches!(checks.normality_test, NormalityTest::ShapiroWilk { .. }));
    }

    #[test]
    fn test_assumptions_large_sample_uses_anderson_darling() {
        let data: Vec<f64> = (0..60).map(|i| f64::from(i % 7)).collect();
        let checks = StatisticsEngine::validate_statistical_assumptions(&data);
        assert!(matches!(
            checks.normality_test,
            NormalityTest::AndersonDarling { .. }
        ));
    }

    #[test]
    fn test_assumptions_serialize_with_tags() {
        let checks = StatisticsEngine::validate_statistical_assumptions(&[1.0, 2.0, 3.0, 4.0]);
        let value = serde_json::to_value(&checks).unwrap();
        assert_eq!(value["normality_test"]["test"], json!("shapiro_wilk"));
        assert_eq!(value["outlier_detection"]["method"], json!("IQR"));
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert!(close(percentile(&sorted, 25.0), 1.75, 1e-12));
        assert!(close(percentile(&sorted, 75.0), 3.25, 1e-12));
    }

    #[test]
    fn test_aggregate_results() {
        let results: Vec<Metadata> = vec![
            json!({"score": 1.0, "count": 3, "name": "a", "ok": true}),
            json!({"score": 3.0, "name": "b"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
        let aggregated = StatisticsEngine::aggregate_experiment_results(&results).unwrap();
        assert_eq!(aggregated.total_experiments, 2);
        assert_eq!(aggregated.metrics_analyzed, vec!["score", "count"]);
        assert_eq!(aggregated.data_quality.complete_experiments, 1);
        assert_eq!(aggregated.data_quality.metrics_with_valid_data, 2);
        let MetricAggregate::Summary(score) = &aggregated.statistics["score"] else {
            panic!("expected summary");
        };
        assert!(close(score.mean, 2.0, 1e-12));
    }

    #[test]
    fn test_aggregate_errors() {
        assert!(matches!(
            StatisticsEngine::aggregate_experiment_results(&[]),
            Err(Error::InsufficientData(_))
        ));
        let no_numbers = vec![json!({"name": "x"}).as_object().cloned().unwrap()];
        let err = StatisticsEngine::aggregate_experiment_results(&no_numbers).unwrap_err();
        assert!(err.to_string().contains("No valid numerical metrics"));
    }
}
