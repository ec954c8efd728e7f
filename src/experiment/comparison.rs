//! Comparative analysis records

use serde::{Deserialize, Serialize};

/// Two-sample comparison of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalComparison {
    /// Baseline mean.
    pub baseline_mean: f64,
    /// Comparison mean.
    pub comparison_mean: f64,
    /// Baseline standard deviation.
    pub baseline_std: f64,
    /// Comparison standard deviation.
    pub comparison_std: f64,
    /// Pooled-variance t statistic.
    pub t_statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// `n1 + n2 - 2`, 0 for degenerate comparisons.
    pub degrees_of_freedom: usize,
    /// Cohen's d.
    pub effect_size: f64,
    /// `p_value < alpha`.
    pub is_significant: bool,
    /// Lower bound of the 95% interval of `comparison - baseline`.
    pub confidence_interval_lower: f64,
    /// Upper bound of the 95% interval of `comparison - baseline`.
    pub confidence_interval_upper: f64,
}

/// Comparison of one metric between the baseline and one other experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Baseline experiment.
    pub baseline_experiment_id: String,
    /// Compared experiment.
    pub comparison_experiment_id: String,
    /// Metric name.
    pub metric_name: String,
    /// Baseline samples.
    pub baseline_values: Vec<f64>,
    /// Comparison samples.
    pub comparison_values: Vec<f64>,
    /// Test results.
    pub statistical_comparison: StatisticalComparison,
    /// `(comparison - baseline) / baseline * 100`.
    pub improvement_percentage: f64,
}

/// Roll-up over every comparison of a report.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComparisonSummary {
    /// Comparisons performed.
    pub total_comparisons: usize,
    /// Significant comparisons with positive improvement.
    pub significant_improvements: usize,
    /// Significant comparisons with negative improvement.
    pub significant_degradations: usize,
    /// Mean improvement percentage.
    pub average_improvement_percentage: f64,
    /// Largest improvement percentage.
    pub maximum_improvement_percentage: f64,
    /// Smallest improvement percentage.
    pub minimum_improvement_percentage: f64,
    /// Distinct metrics, in first-seen order.
    pub metrics_compared: Vec<String>,
}

/// Result of comparing a baseline against one or more experiments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeExperimentReport {
    /// Baseline experiment id.
    pub baseline_experiment: String,
    /// Compared experiment ids.
    pub comparison_experiments: Vec<String>,
    /// Per-metric comparisons.
    pub comparisons: Vec<ComparisonResult>,
    /// Roll-up.
    pub summary_statistics: ComparisonSummary,
    /// Human-readable recommendations.
    pub recommendations: Vec<String>,
}

impl ComparativeExperimentReport {
    /// Number of significant comparisons.
    #[must_use]
    pub fn significant_differences(&self) -> usize {
        self.comparisons
            .iter()
            .filter(|c| c.statistical_comparison.is_significant)
            .count()
    }
}
