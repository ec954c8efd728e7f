//! Experiment API: runs configured experiments end to end
//!
//! Each run creates a tracked result, moves it to `Running`, performs the
//! measurement, renders the report in every requested output format and
//! finishes as `Completed` (or `Failed` with the error message).
//!
//! ## Example
//!
//! ```rust
//! use specbench::api::ExperimentApi;
//! use specbench::experiment::{ExperimentParameters, OutputFormat, PerformanceParameters};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> specbench::Result<()> {
//! let dir = tempfile::tempdir()?;
//! let api = ExperimentApi::builder().config_dir(dir.path()).build()?;
//!
//! let parameters = ExperimentParameters::Performance(PerformanceParameters {
//!     operation_name: "cpu_intensive".to_string(),
//!     measurement_rounds: 3,
//!     warmup_rounds: 1,
//!     memory_profiling: false,
//! });
//! let result = api
//!     .run_experiment(parameters, vec![OutputFormat::Json, OutputFormat::Csv], 60, 512)
//!     .await?;
//! assert_eq!(result.performance_report().map(|r| r.total_executions), Some(3));
//! # Ok(())
//! # }
//! ```

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{json, Value};
use tracing::{info, info_span, warn, Instrument};

use crate::comparative::ComparativeAnalyzer;
use crate::experiment::{
    ComparativeExperimentReport, ComparativeParameters, DetailLevel, EarsCoverageParameters,
    EarsCoverageReport, ExperimentConfig, ExperimentManager, ExperimentParameters,
    ExperimentReport, ExperimentResult, ExperimentStatus, ExperimentStore, Language,
    LanguageDetectionParameters, LanguageDetectionReport, Metadata, OutputFormat,
    PerformanceParameters, PerformanceReport, StatusUpdate, TestDocument,
};
use crate::output::{OutputFormatter, DEFAULT_MAX_RETRIES};
use crate::profiler::{Operation, PerformanceProfiler};
use crate::providers::{
    self, AnalysisOptions, CoverageAnalyzer, LanguageClassifier, REQUIRED_ACCURACY,
};
use crate::{Error, Result};

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "SPECBENCH_CONFIG_DIR";
/// Configuration directory used when none is given.
pub const DEFAULT_CONFIG_DIR: &str = ".specbench/experiments";

/// Builder for [`ExperimentApi`].
#[derive(Default)]
pub struct ExperimentApiBuilder {
    config_dir: Option<PathBuf>,
    store: Option<Arc<ExperimentStore>>,
    max_write_retries: Option<u32>,
    coverage_analyzer: Option<Arc<dyn CoverageAnalyzer>>,
    language_classifier: Option<Arc<dyn LanguageClassifier>>,
    operations: Vec<Operation>,
}

impl ExperimentApiBuilder {
    /// Directory holding saved configurations.
    ///
    /// Defaults to `$SPECBENCH_CONFIG_DIR`, then `.specbench/experiments`.
    #[must_use]
    pub fn config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    /// Share an existing result store.
    #[must_use]
    pub fn store(mut self, store: Arc<ExperimentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Attempts per output file write.
    #[must_use]
    pub const fn max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = Some(retries);
        self
    }

    /// Provider for EARS coverage experiments.
    #[must_use]
    pub fn coverage_analyzer(mut self, analyzer: Arc<dyn CoverageAnalyzer>) -> Self {
        self.coverage_analyzer = Some(analyzer);
        self
    }

    /// Provider for language detection experiments.
    #[must_use]
    pub fn language_classifier(mut self, classifier: Arc<dyn LanguageClassifier>) -> Self {
        self.language_classifier = Some(classifier);
        self
    }

    /// Make an operation available to performance experiments by name.
    #[must_use]
    pub fn register_operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Create the API, creating the configuration directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the configuration directory cannot be created.
    pub fn build(self) -> Result<ExperimentApi> {
        let config_dir = self
            .config_dir
            .or_else(|| env::var_os(CONFIG_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));
        let store = self.store.unwrap_or_default();
        let manager = ExperimentManager::with_store(config_dir, store)?;

        let operations = DashMap::new();
        for operation in self.operations {
            operations.insert(operation.name().to_string(), operation);
        }

        Ok(ExperimentApi {
            manager,
            formatter: OutputFormatter::new()
                .with_max_retries(self.max_write_retries.unwrap_or(DEFAULT_MAX_RETRIES)),
            analyzer: ComparativeAnalyzer::new(),
            coverage_analyzer: self.coverage_analyzer,
            language_classifier: self.language_classifier,
            operations,
        })
    }
}

impl fmt::Debug for ExperimentApiBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentApiBuilder")
            .field("config_dir", &self.config_dir)
            .field("max_write_retries", &self.max_write_retries)
            .field("coverage_analyzer", &self.coverage_analyzer.is_some())
            .field("language_classifier", &self.language_classifier.is_some())
            .field("operations", &self.operations)
            .finish_non_exhaustive()
    }
}

/// Entry point for running and comparing experiments.
pub struct ExperimentApi {
    manager: ExperimentManager,
    formatter: OutputFormatter,
    analyzer: ComparativeAnalyzer,
    coverage_analyzer: Option<Arc<dyn CoverageAnalyzer>>,
    language_classifier: Option<Arc<dyn LanguageClassifier>>,
    operations: DashMap<String, Operation>,
}

impl fmt::Debug for ExperimentApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentApi")
            .field("manager", &self.manager)
            .field("formatter", &self.formatter)
            .field("operations", &self.operations.len())
            .finish_non_exhaustive()
    }
}

impl ExperimentApi {
    /// Start building an API.
    #[must_use]
    pub fn builder() -> ExperimentApiBuilder {
        ExperimentApiBuilder::default()
    }

    /// Get the experiment manager.
    #[must_use]
    pub const fn manager(&self) -> &ExperimentManager {
        &self.manager
    }

    /// Get the output formatter.
    #[must_use]
    pub const fn formatter(&self) -> &OutputFormatter {
        &self.formatter
    }

    /// Register (or replace) a named operation.
    pub fn register_operation(&self, operation: Operation) {
        self.operations
            .insert(operation.name().to_string(), operation);
    }

    /// Build a configuration from its parts and run it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if the configuration is invalid and
    /// [`Error::Execution`] if the experiment fails.
    pub async fn run_experiment(
        &self,
        parameters: ExperimentParameters,
        output_format: Vec<OutputFormat>,
        timeout_seconds: u64,
        memory_limit_mb: u64,
    ) -> Result<ExperimentResult> {
        let config = ExperimentConfig::builder(parameters)
            .output_format(output_format)
            .timeout_seconds(timeout_seconds)
            .memory_limit_mb(memory_limit_mb)
            .build()?;
        self.execute(config).await
    }

    /// Run a configuration saved under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration cannot be loaded
    /// and [`Error::Execution`] if the experiment fails.
    pub async fn run_saved_config(&self, name: &str) -> Result<ExperimentResult> {
        let config = self.manager.load_config(name)?;
        self.execute(config).await
    }

    /// Run a validated configuration as a tracked experiment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] naming the experiment stage if the run
    /// fails; the tracked result is then `Failed` with the message.
    pub async fn execute(&self, config: ExperimentConfig) -> Result<ExperimentResult> {
        let experiment_type = config.experiment_type();
        let result = self.manager.create_experiment_result(config.clone());
        let experiment_id = result.experiment_id().to_string();
        let span = info_span!("experiment", id = %experiment_id, kind = %experiment_type);

        async {
            self.manager
                .update_experiment_status(&experiment_id, ExperimentStatus::Running)?;
            match self.run_stage(&config).await {
                Ok(update) => {
                    let finished = self.manager.update_experiment_status(&experiment_id, update)?;
                    info!(
                        duration_seconds = finished.duration_seconds(),
                        "experiment completed"
                    );
                    Ok(finished)
                }
                Err(e) => {
                    warn!(error = %e, "experiment failed");
                    if let Err(update_error) = self
                        .manager
                        .update_experiment_status(&experiment_id, StatusUpdate::failed(e.to_string()))
                    {
                        warn!(error = %update_error, "could not record failure");
                    }
                    Err(Error::Execution(format!(
                        "{} experiment failed: {e}",
                        experiment_type.stage_label()
                    )))
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_stage(&self, config: &ExperimentConfig) -> Result<StatusUpdate> {
        match config.parameters() {
            ExperimentParameters::EarsCoverage(p) => self.run_ears_coverage(config, p).await,
            ExperimentParameters::Performance(p) => self.run_performance(config, p).await,
            ExperimentParameters::LanguageDetection(p) => {
                self.run_language_detection(config, p).await
            }
            ExperimentParameters::Comparative(p) => self.run_comparative(config, p),
        }
    }

    async fn run_ears_coverage(
        &self,
        config: &ExperimentConfig,
        parameters: &EarsCoverageParameters,
    ) -> Result<StatusUpdate> {
        if parameters.input_paths.is_empty() {
            return Err(Error::InvalidParameters(
                "input_paths parameter is required for EARS coverage experiment".to_string(),
            ));
        }
        let report = self
            .measure_ears_coverage(
                &parameters.input_paths,
                parameters.language,
                parameters.output_detail_level,
            )
            .await?;
        self.completed(config, ExperimentReport::EarsCoverage(report))
    }

    async fn run_performance(
        &self,
        config: &ExperimentConfig,
        parameters: &PerformanceParameters,
    ) -> Result<StatusUpdate> {
        let profiler = PerformanceProfiler::new(config.memory_limit_mb(), config.timeout_seconds())
            .with_memory_profiling(parameters.memory_profiling);
        let report = self
            .profile(
                &profiler,
                &parameters.operation_name,
                parameters.measurement_rounds,
                parameters.warmup_rounds,
                None,
            )
            .await?;
        self.completed(config, ExperimentReport::Performance(report))
    }

    async fn run_language_detection(
        &self,
        config: &ExperimentConfig,
        parameters: &LanguageDetectionParameters,
    ) -> Result<StatusUpdate> {
        if parameters.test_documents.is_empty() {
            return Err(Error::InvalidParameters(
                "test_documents parameter is required for language detection experiment"
                    .to_string(),
            ));
        }
        let report = self
            .measure_language_detection(&parameters.test_documents)
            .await?;
        let low_confidence_count = report
            .results
            .iter()
            .filter(|r| r.confidence_score < parameters.confidence_threshold)
            .count();
        let meets_accuracy_target = report.accuracy_rate >= REQUIRED_ACCURACY;
        Ok(self
            .completed(config, ExperimentReport::LanguageDetection(report))?
            .with_metadata_entry("low_confidence_count", json!(low_confidence_count))
            .with_metadata_entry("meets_accuracy_target", json!(meets_accuracy_target)))
    }

    fn run_comparative(
        &self,
        config: &ExperimentConfig,
        parameters: &ComparativeParameters,
    ) -> Result<StatusUpdate> {
        let baseline_id = parameters
            .baseline_experiment_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                Error::InvalidParameters(
                    "baseline_experiment_id parameter is required for comparative experiment"
                        .to_string(),
                )
            })?;
        if parameters.comparison_experiment_ids.is_empty() {
            return Err(Error::InvalidParameters(
                "comparison_experiment_ids parameter is required for comparative experiment"
                    .to_string(),
            ));
        }
        let report = self.compare(
            baseline_id,
            &parameters.comparison_experiment_ids,
            parameters.metrics_to_compare.as_deref(),
        )?;

        let mut formatted = Metadata::new();
        for &format in config.output_format() {
            let text = self.formatter.format_comparative_report(&report, format)?;
            formatted.insert(format.to_string(), Value::String(text));
        }
        let comparative_report = serde_json::to_value(&report)
            .map_err(|e| Error::FormatConversion(e.to_string()))?;

        Ok(StatusUpdate::completed()
            .with_metadata_entry("comparative_report", comparative_report)
            .with_metadata_entry("formatted_outputs", Value::Object(formatted))
            .with_metadata_entry("baseline_experiment_id", json!(baseline_id))
            .with_metadata_entry(
                "comparison_experiment_ids",
                json!(parameters.comparison_experiment_ids),
            )
            .with_metadata_entry("total_comparisons", json!(report.comparisons.len()))
            .with_metadata_entry(
                "significant_differences",
                json!(report.significant_differences()),
            ))
    }

    /// Completion update carrying the report and its rendered outputs.
    fn completed(&self, config: &ExperimentConfig, report: ExperimentReport) -> Result<StatusUpdate> {
        let data = report.to_value()?;
        let mut formatted = Metadata::new();
        for &format in config.output_format() {
            let text = self.formatter.format(&data, format)?;
            formatted.insert(format.to_string(), Value::String(text));
        }
        Ok(StatusUpdate::completed()
            .with_report(report)
            .with_metadata_entry("report", data)
            .with_metadata_entry("formatted_outputs", Value::Object(formatted)))
    }

    /// Analyze documents with the configured coverage analyzer.
    ///
    /// A single document yields the analyzer's report; several are combined
    /// with [`providers::combine_coverage_reports`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] for an empty list or a missing
    /// path and [`Error::Execution`] if no analyzer is configured or reading or
    /// analysis fails.
    pub async fn measure_ears_coverage(
        &self,
        input_paths: &[PathBuf],
        language: Language,
        detail_level: DetailLevel,
    ) -> Result<EarsCoverageReport> {
        if input_paths.is_empty() {
            return Err(Error::InvalidParameters(
                "At least one input path must be provided".to_string(),
            ));
        }
        if let Some(missing) = input_paths.iter().find(|p| !p.exists()) {
            return Err(Error::InvalidParameters(format!(
                "Input path does not exist: {}",
                missing.display()
            )));
        }
        let analyzer = self.coverage_analyzer.as_ref().ok_or_else(|| {
            Error::Execution("No coverage analyzer is configured".to_string())
        })?;
        let options = AnalysisOptions {
            language,
            detail_level,
        };

        let mut reports = Vec::with_capacity(input_paths.len());
        for path in input_paths {
            let content = read_document(path).await.map_err(coverage_failure)?;
            let report = analyzer
                .analyze_document(path, &content, options)
                .map_err(coverage_failure)?;
            reports.push(report);
        }
        if reports.len() == 1 {
            if let Some(report) = reports.pop() {
                return Ok(report);
            }
        }
        providers::combine_coverage_reports(reports)
    }

    /// Profile a custom, registered or predefined operation.
    ///
    /// Without `custom_operation`, operations registered on the API take
    /// precedence over the predefined ones of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if `measurement_rounds` is 0 and
    /// [`Error::Execution`] for an unknown operation.
    pub async fn measure_performance(
        &self,
        operation_name: &str,
        measurement_rounds: u32,
        warmup_rounds: u32,
        memory_profiling: bool,
        custom_operation: Option<Operation>,
    ) -> Result<PerformanceReport> {
        let profiler = PerformanceProfiler::default().with_memory_profiling(memory_profiling);
        self.profile(
            &profiler,
            operation_name,
            measurement_rounds,
            warmup_rounds,
            custom_operation,
        )
        .await
    }

    async fn profile(
        &self,
        profiler: &PerformanceProfiler,
        operation_name: &str,
        measurement_rounds: u32,
        warmup_rounds: u32,
        custom_operation: Option<Operation>,
    ) -> Result<PerformanceReport> {
        if measurement_rounds == 0 {
            return Err(Error::InvalidParameters(
                "measurement_rounds must be positive".to_string(),
            ));
        }
        let rounds = measurement_rounds as usize;
        let warmup = warmup_rounds as usize;
        let registered = custom_operation.or_else(|| {
            self.operations
                .get(operation_name)
                .map(|entry| entry.value().clone())
        });
        let report = match registered {
            Some(operation) => {
                profiler
                    .profile_custom_operation(&operation, rounds, warmup)
                    .await
            }
            None => {
                profiler
                    .profile_operation(operation_name, rounds, warmup)
                    .await
            }
        };
        report.map_err(|e| Error::Execution(format!("Performance measurement failed: {e}")))
    }

    /// Classify each document and build the accuracy report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] for an empty list and
    /// [`Error::Execution`] if no classifier is configured or a document
    /// cannot be read.
    pub async fn measure_language_detection(
        &self,
        documents: &[TestDocument],
    ) -> Result<LanguageDetectionReport> {
        if documents.is_empty() {
            return Err(Error::InvalidParameters(
                "At least one test document must be provided".to_string(),
            ));
        }
        let classifier = self.language_classifier.as_ref().ok_or_else(|| {
            Error::Execution("No language classifier is configured".to_string())
        })?;

        let mut results = Vec::with_capacity(documents.len());
        for document in documents {
            let content = read_document(&document.path).await.map_err(|e| {
                Error::Execution(format!("Language detection measurement failed: {e}"))
            })?;
            let classification = classifier.classify(&content, document.is_spec_document);
            results.push(providers::detection_result(
                &document.path,
                document.expected_language,
                classification,
            ));
        }
        providers::generate_accuracy_report(results)
    }

    /// Compare tracked experiments against a baseline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if an id is unknown, plus the
    /// errors of [`ComparativeAnalyzer::compare_experiments`].
    pub fn compare(
        &self,
        baseline_id: &str,
        comparison_ids: &[String],
        metrics: Option<&[String]>,
    ) -> Result<ComparativeExperimentReport> {
        let lookup = |id: &str| {
            self.manager
                .get_experiment_result(id)
                .ok_or_else(|| Error::InvalidParameters(format!("Experiment not found: {id}")))
        };
        let baseline = lookup(baseline_id)?;
        let comparisons = comparison_ids
            .iter()
            .map(|id| lookup(id))
            .collect::<Result<Vec<_>>>()?;
        self.analyzer
            .compare_experiments(&baseline, &comparisons, metrics)
    }

    /// Write a tracked experiment's report to `path` in `format`.
    ///
    /// The report is written when present (a comparative report as one row
    /// per comparison in CSV), otherwise the whole result. Returns the path
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] for an unknown id and the errors of
    /// [`OutputFormatter::save_to_file`].
    pub fn export_report(
        &self,
        experiment_id: &str,
        path: &Path,
        format: OutputFormat,
    ) -> Result<PathBuf> {
        let result = self.manager.get_experiment_result(experiment_id).ok_or_else(|| {
            Error::InvalidParameters(format!("Experiment not found: {experiment_id}"))
        })?;
        let metadata = result.metadata();
        if let Some(report) = metadata.get("report") {
            return self.formatter.save_to_file(report, path, format);
        }
        if let Some(value) = metadata.get("comparative_report") {
            let report: ComparativeExperimentReport = serde_json::from_value(value.clone())
                .map_err(|e| Error::FormatConversion(e.to_string()))?;
            let content = self.formatter.format_comparative_report(&report, format)?;
            return self.formatter.save_rendered(&content, path, format);
        }
        self.formatter.save_to_file(&result, path, format)
    }
}

async fn read_document(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))
}

fn coverage_failure(e: anyhow::Error) -> Error {
    Error::Execution(format!("EARS coverage measurement failed: {e}"))
}
