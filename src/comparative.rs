//! Comparative analysis of experiment results against a baseline

use std::collections::HashSet;

use tracing::debug;

use crate::experiment::{
    ComparativeExperimentReport, ComparisonResult, ComparisonSummary, ExperimentReport,
    ExperimentResult, ExperimentType, StatisticalComparison,
};
use crate::stats::{StatisticsEngine, CONFIDENCE_LEVEL, MIN_COMPARISON_SAMPLES, SIGNIFICANCE_LEVEL};
use crate::{Error, Result};

/// |d| above this is flagged as a large effect.
pub const LARGE_EFFECT_THRESHOLD: f64 = 0.8;
/// Minimum |improvement| (percent) for a significant change to be reported.
pub const MINIMUM_IMPROVEMENT_THRESHOLD: f64 = 5.0;
/// Baseline std above this fraction of its mean is flagged as high variability.
pub const HIGH_VARIABILITY_THRESHOLD: f64 = 0.3;

const PERFORMANCE_METRICS: [&str; 4] = [
    "average_wall_time_ms",
    "average_cpu_time_ms",
    "average_memory_mb",
    "successful_executions",
];
const EARS_METRICS: [&str; 3] = ["coverage_rate", "total_requirements", "ears_compliant"];
const LANGUAGE_METRICS: [&str; 3] = ["accuracy_rate", "japanese_accuracy", "english_accuracy"];
const DURATION_METRIC: &str = "duration_seconds";

/// Percentage change from `baseline` to `comparison`; 0 when the baseline is 0.
#[must_use]
pub fn improvement_percentage(baseline: f64, comparison: f64) -> f64 {
    if baseline == 0.0 {
        0.0
    } else {
        (comparison - baseline) / baseline * 100.0
    }
}

/// Compares experiments of one type metric by metric.
#[derive(Debug, Clone, Copy)]
pub struct ComparativeAnalyzer {
    alpha: f64,
}

impl Default for ComparativeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparativeAnalyzer {
    /// Create an analyzer testing at the 5% level.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            alpha: SIGNIFICANCE_LEVEL,
        }
    }

    /// Metrics compared by default for an experiment type.
    #[must_use]
    pub fn default_metrics(experiment_type: ExperimentType) -> Vec<String> {
        let metrics: &[&str] = match experiment_type {
            ExperimentType::Performance => &PERFORMANCE_METRICS,
            ExperimentType::EarsCoverage => &EARS_METRICS,
            ExperimentType::LanguageDetection => &LANGUAGE_METRICS,
            ExperimentType::Comparative => &[DURATION_METRIC],
        };
        metrics.iter().map(|m| (*m).to_string()).collect()
    }

    /// Compare every experiment in `comparisons` against `baseline`.
    ///
    /// Metrics that cannot be extracted from both sides are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientData`] if `comparisons` is empty and
    /// [`Error::IncompatibleExperiments`] if any experiment type differs from
    /// the baseline's.
    pub fn compare_experiments(
        &self,
        baseline: &ExperimentResult,
        comparisons: &[ExperimentResult],
        metrics: Option<&[String]>,
    ) -> Result<ComparativeExperimentReport> {
        if comparisons.is_empty() {
            return Err(Error::InsufficientData(
                "At least one comparison experiment is required".to_string(),
            ));
        }
        let baseline_type = baseline.experiment_type();
        if let Some(other) = comparisons
            .iter()
            .find(|c| c.experiment_type() != baseline_type)
        {
            return Err(Error::IncompatibleExperiments(format!(
                "Experiment types don't match: {baseline_type} vs {}",
                other.experiment_type()
            )));
        }

        let metrics = metrics.map_or_else(|| Self::default_metrics(baseline_type), <[String]>::to_vec);
        let results: Vec<ComparisonResult> = comparisons
            .iter()
            .flat_map(|comparison| {
                metrics
                    .iter()
                    .filter_map(move |metric| self.compare_metric(baseline, comparison, metric))
            })
            .collect();

        debug!(
            baseline = baseline.experiment_id(),
            comparisons = comparisons.len(),
            results = results.len(),
            "compared experiments"
        );

        Ok(ComparativeExperimentReport {
            baseline_experiment: baseline.experiment_id().to_string(),
            comparison_experiments: comparisons
                .iter()
                .map(|c| c.experiment_id().to_string())
                .collect(),
            summary_statistics: summarize(&results),
            recommendations: recommendations(&results),
            comparisons: results,
        })
    }

    fn compare_metric(
        &self,
        baseline: &ExperimentResult,
        comparison: &ExperimentResult,
        metric: &str,
    ) -> Option<ComparisonResult> {
        let baseline_values = metric_values(baseline, metric);
        let comparison_values = metric_values(comparison, metric);
        if baseline_values.is_empty() || comparison_values.is_empty() {
            return None;
        }
        let statistical_comparison = self.test(&baseline_values, &comparison_values)?;
        let improvement = improvement_percentage(
            mean(&baseline_values),
            mean(&comparison_values),
        );
        Some(ComparisonResult {
            baseline_experiment_id: baseline.experiment_id().to_string(),
            comparison_experiment_id: comparison.experiment_id().to_string(),
            metric_name: metric.to_string(),
            baseline_values,
            comparison_values,
            statistical_comparison,
            improvement_percentage: improvement,
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn test(&self, baseline: &[f64], comparison: &[f64]) -> Option<StatisticalComparison> {
        if baseline.len() < MIN_COMPARISON_SAMPLES || comparison.len() < MIN_COMPARISON_SAMPLES {
            return Some(point_comparison(baseline[0], comparison[0]));
        }
        let outcome = StatisticsEngine::compare_datasets(baseline, comparison, self.alpha).ok()?;
        let df = outcome.t_test.degrees_of_freedom;
        let difference = outcome.comparison_stats.mean - outcome.baseline_stats.mean;
        let standard_error = outcome.pooled_std
            * (1.0 / baseline.len() as f64 + 1.0 / comparison.len() as f64).sqrt();
        let margin = StatisticsEngine::t_critical(CONFIDENCE_LEVEL, df as f64) * standard_error;

        Some(StatisticalComparison {
            baseline_mean: outcome.baseline_stats.mean,
            comparison_mean: outcome.comparison_stats.mean,
            baseline_std: outcome.baseline_stats.std_dev,
            comparison_std: outcome.comparison_stats.std_dev,
            t_statistic: outcome.t_test.statistic,
            p_value: outcome.t_test.p_value,
            degrees_of_freedom: df,
            effect_size: outcome.effect_size.cohens_d,
            is_significant: outcome.t_test.is_significant,
            confidence_interval_lower: difference - margin,
            confidence_interval_upper: difference + margin,
        })
    }
}

/// Comparison of single observations: nothing can be tested.
fn point_comparison(baseline: f64, comparison: f64) -> StatisticalComparison {
    let difference = comparison - baseline;
    StatisticalComparison {
        baseline_mean: baseline,
        comparison_mean: comparison,
        baseline_std: 0.0,
        comparison_std: 0.0,
        t_statistic: 0.0,
        p_value: 1.0,
        degrees_of_freedom: 0,
        effect_size: 0.0,
        is_significant: false,
        confidence_interval_lower: difference,
        confidence_interval_upper: difference,
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Samples of `metric` in `result`; empty when the metric does not apply.
#[allow(clippy::cast_precision_loss)]
fn metric_values(result: &ExperimentResult, metric: &str) -> Vec<f64> {
    if metric == DURATION_METRIC {
        return vec![result.duration_seconds()];
    }
    match result.report() {
        Some(ExperimentReport::Performance(report)) => {
            let successes = report.successful_details();
            match metric {
                "average_wall_time_ms" => successes.map(|d| d.wall_time_ms).collect(),
                "average_cpu_time_ms" => successes.map(|d| d.cpu_time_ms).collect(),
                "average_memory_mb" => successes.map(|d| d.memory_used_mb).collect(),
                "successful_executions" => vec![report.successful_executions as f64],
                _ => Vec::new(),
            }
        }
        Some(ExperimentReport::EarsCoverage(report)) => match metric {
            "coverage_rate" => vec![report.coverage_rate],
            "total_requirements" => vec![report.total_requirements as f64],
            "ears_compliant" => vec![report.ears_compliant as f64],
            _ => Vec::new(),
        },
        Some(ExperimentReport::LanguageDetection(report)) => match metric {
            "accuracy_rate" => vec![report.accuracy_rate],
            "japanese_accuracy" => vec![report.japanese_accuracy],
            "english_accuracy" => vec![report.english_accuracy],
            _ => Vec::new(),
        },
        None => Vec::new(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn summarize(results: &[ComparisonResult]) -> ComparisonSummary {
    if results.is_empty() {
        return ComparisonSummary::default();
    }
    let significant_with = |pred: fn(f64) -> bool| {
        results
            .iter()
            .filter(|c| c.statistical_comparison.is_significant && pred(c.improvement_percentage))
            .count()
    };
    let improvements = || results.iter().map(|c| c.improvement_percentage);

    let mut seen = HashSet::new();
    let metrics_compared = results
        .iter()
        .filter(|c| seen.insert(c.metric_name.as_str()))
        .map(|c| c.metric_name.clone())
        .collect();

    ComparisonSummary {
        total_comparisons: results.len(),
        significant_improvements: significant_with(|p| p > 0.0),
        significant_degradations: significant_with(|p| p < 0.0),
        average_improvement_percentage: improvements().sum::<f64>() / results.len() as f64,
        maximum_improvement_percentage: improvements().fold(f64::NEG_INFINITY, f64::max),
        minimum_improvement_percentage: improvements().fold(f64::INFINITY, f64::min),
        metrics_compared,
    }
}

fn recommendations(results: &[ComparisonResult]) -> Vec<String> {
    if results.is_empty() {
        return vec!["No valid comparisons could be performed.".to_string()];
    }
    let mut out = Vec::new();
    let significant = || {
        results
            .iter()
            .filter(|c| c.statistical_comparison.is_significant)
    };

    if let Some(best) = significant()
        .filter(|c| c.improvement_percentage > MINIMUM_IMPROVEMENT_THRESHOLD)
        .max_by(|a, b| a.improvement_percentage.total_cmp(&b.improvement_percentage))
    {
        out.push(format!(
            "Significant improvement detected in {}: {:.1}% better than baseline.",
            best.metric_name, best.improvement_percentage
        ));
    }
    if let Some(worst) = significant()
        .filter(|c| c.improvement_percentage < -MINIMUM_IMPROVEMENT_THRESHOLD)
        .min_by(|a, b| a.improvement_percentage.total_cmp(&b.improvement_percentage))
    {
        out.push(format!(
            "Performance degradation detected in {}: {:.1}% worse than baseline.",
            worst.metric_name,
            worst.improvement_percentage.abs()
        ));
    }

    let large_effects = results
        .iter()
        .filter(|c| c.statistical_comparison.effect_size.abs() > LARGE_EFFECT_THRESHOLD)
        .count();
    if large_effects > 0 {
        out.push(format!(
            "Large effect sizes detected in {large_effects} comparisons - consider investigating."
        ));
    }

    if results.iter().any(|c| {
        let s = &c.statistical_comparison;
        s.baseline_std > s.baseline_mean * HIGH_VARIABILITY_THRESHOLD
    }) {
        out.push(
            "High variability detected in some metrics - consider increasing sample size."
                .to_string(),
        );
    }

    if out.is_empty() {
        out.push("No significant differences detected between experiments.".to_string());
    }
    out
}
