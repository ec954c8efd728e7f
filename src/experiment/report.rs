//! Measurement reports produced by the experiment runners

use serde::{Deserialize, Serialize};

use super::Language;

/// Descriptive statistics of a sample.
///
/// `variance == std_dev²`, `min_value <= mean <= max_value` and the
/// confidence interval brackets the mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalSummary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample variance (N−1 denominator).
    pub variance: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// 95% confidence interval of the mean.
    pub confidence_interval: (f64, f64),
    /// Number of observations.
    pub sample_size: usize,
    /// Smallest observation.
    pub min_value: f64,
    /// Largest observation.
    pub max_value: f64,
}

/// A requirement that does not follow an EARS pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageViolation {
    /// 1-based line in the document.
    pub line_number: usize,
    /// Offending requirement text.
    pub requirement_text: String,
    /// Kind of violation.
    pub violation_type: String,
    /// Suggested rewrite.
    pub suggestion: Option<String>,
}

/// EARS coverage of one document (or a combination of documents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarsCoverageReport {
    /// Analyzed document.
    pub document_path: String,
    /// Requirements found.
    pub total_requirements: usize,
    /// Requirements following an EARS pattern.
    pub ears_compliant: usize,
    /// `ears_compliant / total_requirements`, 0 with no requirements.
    pub coverage_rate: f64,
    /// Non-compliant requirements.
    pub violations: Vec<CoverageViolation>,
}

/// One measured execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceDetail {
    /// Wall-clock time.
    pub wall_time_ms: f64,
    /// Process CPU time (user + system).
    pub cpu_time_ms: f64,
    /// Resident set size delta.
    pub memory_used_mb: f64,
    /// Peak tracked allocation during the call.
    pub peak_memory_mb: f64,
    /// Name of the profiled operation.
    pub function_name: String,
    /// Whether the call succeeded within its limits.
    pub success: bool,
    /// Failure description.
    pub error_message: Option<String>,
}

/// Aggregate of repeated executions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Executions attempted.
    pub total_executions: usize,
    /// Successful executions.
    pub successful_executions: usize,
    /// Failed executions.
    pub failed_executions: usize,
    /// Mean wall time over successes.
    pub average_wall_time_ms: f64,
    /// Mean CPU time over successes.
    pub average_cpu_time_ms: f64,
    /// Mean memory delta over successes.
    pub average_memory_mb: f64,
    /// Maximum peak over successes.
    pub peak_memory_mb: f64,
    /// Every execution, in order.
    pub details: Vec<PerformanceDetail>,
    /// Value returned by the last successful execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_data: Option<serde_json::Value>,
}

impl PerformanceReport {
    /// Details of successful executions.
    pub fn successful_details(&self) -> impl Iterator<Item = &PerformanceDetail> {
        self.details.iter().filter(|d| d.success)
    }
}

/// Detection outcome for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetectionResult {
    /// Classified document.
    pub document_path: String,
    /// Ground truth.
    pub expected_language: Language,
    /// Classifier output.
    pub detected_language: Language,
    /// Classifier confidence in `[0, 1]`.
    pub confidence_score: f64,
    /// `expected_language == detected_language`.
    pub is_correct: bool,
}

/// Accuracy over a labelled document set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDetectionReport {
    /// Per-document outcomes.
    pub results: Vec<LanguageDetectionResult>,
    /// Correct / total.
    pub accuracy_rate: f64,
    /// Accuracy over documents expected to be Japanese.
    pub japanese_accuracy: f64,
    /// Accuracy over documents expected to be English.
    pub english_accuracy: f64,
    /// Statistics of the confidence scores.
    pub statistics: StatisticalSummary,
}
