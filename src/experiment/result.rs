//! Experiment Result - one tracked experiment execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    EarsCoverageReport, ExperimentConfig, ExperimentStatus, ExperimentType,
    LanguageDetectionReport, PerformanceReport,
};
use crate::{Error, Result};

/// Free-form metadata attached to a result.
pub type Metadata = serde_json::Map<String, Value>;

/// Measurement report; the variant must match the experiment type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExperimentReport {
    /// EARS coverage report.
    EarsCoverage(EarsCoverageReport),
    /// Performance report.
    Performance(PerformanceReport),
    /// Language detection report.
    LanguageDetection(LanguageDetectionReport),
}

impl ExperimentReport {
    /// Experiment type this report belongs to.
    #[must_use]
    pub const fn experiment_type(&self) -> ExperimentType {
        match self {
            Self::EarsCoverage(_) => ExperimentType::EarsCoverage,
            Self::Performance(_) => ExperimentType::Performance,
            Self::LanguageDetection(_) => ExperimentType::LanguageDetection,
        }
    }

    /// Serialize the inner report without the variant tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FormatConversion`] if serialization fails.
    pub fn to_value(&self) -> Result<Value> {
        let value = match self {
            Self::EarsCoverage(r) => serde_json::to_value(r),
            Self::Performance(r) => serde_json::to_value(r),
            Self::LanguageDetection(r) => serde_json::to_value(r),
        };
        value.map_err(|e| Error::FormatConversion(e.to_string()))
    }
}

/// A status change plus the data that accompanies it.
///
/// Metadata is merged into the existing map; the report and error message
/// replace what was there.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    status: ExperimentStatus,
    error_message: Option<String>,
    metadata: Metadata,
    report: Option<ExperimentReport>,
}

impl StatusUpdate {
    /// Update to `status` with no extra data.
    #[must_use]
    pub fn new(status: ExperimentStatus) -> Self {
        Self {
            status,
            error_message: None,
            metadata: Metadata::new(),
            report: None,
        }
    }

    /// Shorthand for a `Completed` update.
    #[must_use]
    pub fn completed() -> Self {
        Self::new(ExperimentStatus::Completed)
    }

    /// Shorthand for a `Failed` update carrying an error message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(ExperimentStatus::Failed).with_error_message(message)
    }

    /// Attach an error message.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Attach metadata entries.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata.extend(metadata);
        self
    }

    /// Attach a single metadata entry.
    #[must_use]
    pub fn with_metadata_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Attach a report.
    #[must_use]
    pub fn with_report(mut self, report: ExperimentReport) -> Self {
        self.report = Some(report);
        self
    }

    /// Target status.
    #[must_use]
    pub const fn status(&self) -> ExperimentStatus {
        self.status
    }
}

impl From<ExperimentStatus> for StatusUpdate {
    fn from(status: ExperimentStatus) -> Self {
        Self::new(status)
    }
}

/// Result of an experiment, tracked from creation to a terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    experiment_id: String,
    timestamp: DateTime<Utc>,
    config: ExperimentConfig,
    status: ExperimentStatus,
    duration_seconds: f64,
    report: Option<ExperimentReport>,
    metadata: Metadata,
    error_message: Option<String>,
}

impl ExperimentResult {
    /// Create a pending result stamped with the current time.
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, config: ExperimentConfig) -> Self {
        Self {
            experiment_id: experiment_id.into(),
            timestamp: Utc::now(),
            config,
            status: ExperimentStatus::Pending,
            duration_seconds: 0.0,
            report: None,
            metadata: Metadata::new(),
            error_message: None,
        }
    }

    /// Attach a report at construction time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if the report does not belong to the
    /// configured experiment type.
    pub fn with_report(mut self, report: ExperimentReport) -> Result<Self> {
        self.check_report(&report)?;
        self.report = Some(report);
        Ok(self)
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Shorthand for `config().experiment_type()`.
    #[must_use]
    pub const fn experiment_type(&self) -> ExperimentType {
        self.config.experiment_type()
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> ExperimentStatus {
        self.status
    }

    /// Seconds between creation and reaching a terminal status (0 until then).
    #[must_use]
    pub const fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    /// Get the report, if any.
    #[must_use]
    pub const fn report(&self) -> Option<&ExperimentReport> {
        self.report.as_ref()
    }

    /// Get the EARS coverage report, if this is a coverage experiment with one.
    #[must_use]
    pub const fn ears_report(&self) -> Option<&EarsCoverageReport> {
        match &self.report {
            Some(ExperimentReport::EarsCoverage(r)) => Some(r),
            _ => None,
        }
    }

    /// Get the performance report, if any.
    #[must_use]
    pub const fn performance_report(&self) -> Option<&PerformanceReport> {
        match &self.report {
            Some(ExperimentReport::Performance(r)) => Some(r),
            _ => None,
        }
    }

    /// Get the language detection report, if any.
    #[must_use]
    pub const fn language_report(&self) -> Option<&LanguageDetectionReport> {
        match &self.report {
            Some(ExperimentReport::LanguageDetection(r)) => Some(r),
            _ => None,
        }
    }

    /// Get the metadata map.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Get the error message of a failed experiment.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn check_report(&self, report: &ExperimentReport) -> Result<()> {
        if report.experiment_type() == self.experiment_type() {
            Ok(())
        } else {
            Err(Error::Execution(format!(
                "Report of type {} cannot be attached to {} experiment {}",
                report.experiment_type(),
                self.experiment_type(),
                self.experiment_id
            )))
        }
    }

    /// Validate `update` against the state machine, then apply it.
    ///
    /// Nothing is modified when validation fails.
    pub(crate) fn apply_update(&mut self, update: StatusUpdate) -> Result<()> {
        if !self.status.can_transition_to(update.status) {
            return Err(Error::InvalidTransition {
                experiment_id: self.experiment_id.clone(),
                from: self.status,
                to: update.status,
            });
        }
        if let Some(report) = &update.report {
            self.check_report(report)?;
        }

        self.status = update.status;
        self.metadata.extend(update.metadata);
        if let Some(message) = update.error_message {
            self.error_message = Some(message);
        }
        if let Some(report) = update.report {
            self.report = Some(report);
        }
        if self.status.is_terminal() {
            let elapsed = Utc::now() - self.timestamp;
            self.duration_seconds = elapsed.num_nanoseconds().map_or_else(
                || elapsed.num_milliseconds() as f64 / 1_000.0,
                |nanos| nanos as f64 / 1_000_000_000.0,
            );
        }
        Ok(())
    }
}
