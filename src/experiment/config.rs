//! Experiment configuration: type, typed parameters and resource limits

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Default per-experiment timeout.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

/// Default per-experiment memory ceiling.
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 100;

/// Kind of experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentType {
    /// EARS pattern coverage of requirement documents.
    EarsCoverage,
    /// Execution time and memory profiling.
    Performance,
    /// Language detection accuracy.
    LanguageDetection,
    /// Statistical comparison of earlier experiments.
    Comparative,
}

impl ExperimentType {
    /// All experiment types.
    pub const ALL: [Self; 4] = [
        Self::EarsCoverage,
        Self::Performance,
        Self::LanguageDetection,
        Self::Comparative,
    ];

    /// Snake-case name used in configs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EarsCoverage => "ears_coverage",
            Self::Performance => "performance",
            Self::LanguageDetection => "language_detection",
            Self::Comparative => "comparative",
        }
    }

    /// Human-readable stage name used when wrapping runner failures.
    #[must_use]
    pub const fn stage_label(self) -> &'static str {
        match self {
            Self::EarsCoverage => "EARS coverage",
            Self::Performance => "Performance",
            Self::LanguageDetection => "Language detection",
            Self::Comparative => "Comparative",
        }
    }
}

impl fmt::Display for ExperimentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperimentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidParameters(format!("Unknown experiment type: {s}")))
    }
}

/// Serialization format for experiment outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// UTF-8 JSON.
    Json,
    /// Comma-separated values with a header row.
    Csv,
    /// YAML document.
    Yaml,
}

impl OutputFormat {
    /// File extension written by `save_to_file`.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Document language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    /// Japanese.
    #[default]
    #[serde(rename = "ja")]
    Japanese,
    /// English.
    #[serde(rename = "en")]
    English,
}

impl Language {
    /// ISO 639-1 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Japanese => "ja",
            Self::English => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How much detail a coverage analysis reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Totals only.
    #[default]
    Summary,
    /// Totals plus per-requirement violations.
    Detailed,
}

/// Parameters of an EARS coverage experiment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EarsCoverageParameters {
    /// Documents to analyze.
    pub input_paths: Vec<PathBuf>,
    /// Report detail.
    pub output_detail_level: DetailLevel,
    /// Document language.
    pub language: Language,
}

/// Parameters of a performance experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceParameters {
    /// Registered or predefined operation to profile.
    pub operation_name: String,
    /// Measured executions.
    pub measurement_rounds: u32,
    /// Unmeasured executions run first.
    pub warmup_rounds: u32,
    /// Track peak allocation during measurement.
    pub memory_profiling: bool,
}

impl Default for PerformanceParameters {
    fn default() -> Self {
        Self {
            operation_name: "default_operation".to_string(),
            measurement_rounds: 5,
            warmup_rounds: 2,
            memory_profiling: true,
        }
    }
}

/// One labelled document of a language detection experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDocument {
    /// Document location.
    pub path: PathBuf,
    /// Ground-truth language.
    pub expected_language: Language,
    /// Whether the document follows the requirement-document layout (classifier hint).
    #[serde(default = "default_true")]
    pub is_spec_document: bool,
}

const fn default_true() -> bool {
    true
}

impl TestDocument {
    /// Create an entry for a requirement document.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, expected_language: Language) -> Self {
        Self {
            path: path.into(),
            expected_language,
            is_spec_document: true,
        }
    }
}

/// Parameters of a language detection experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageDetectionParameters {
    /// Labelled documents.
    pub test_documents: Vec<TestDocument>,
    /// Detections below this confidence are counted as low-confidence.
    pub confidence_threshold: f64,
}

impl Default for LanguageDetectionParameters {
    fn default() -> Self {
        Self {
            test_documents: Vec::new(),
            confidence_threshold: 0.8,
        }
    }
}

/// Parameters of a comparative experiment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparativeParameters {
    /// Experiment used as the baseline.
    pub baseline_experiment_id: Option<String>,
    /// Experiments compared against the baseline.
    pub comparison_experiment_ids: Vec<String>,
    /// Metrics to compare; `None` selects the defaults for the type.
    pub metrics_to_compare: Option<Vec<String>>,
}

/// Typed parameters; the variant determines the experiment type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExperimentParameters {
    /// EARS coverage parameters.
    EarsCoverage(EarsCoverageParameters),
    /// Performance parameters.
    Performance(PerformanceParameters),
    /// Language detection parameters.
    LanguageDetection(LanguageDetectionParameters),
    /// Comparative parameters.
    Comparative(ComparativeParameters),
}

impl ExperimentParameters {
    /// Experiment type implied by the variant.
    #[must_use]
    pub const fn experiment_type(&self) -> ExperimentType {
        match self {
            Self::EarsCoverage(_) => ExperimentType::EarsCoverage,
            Self::Performance(_) => ExperimentType::Performance,
            Self::LanguageDetection(_) => ExperimentType::LanguageDetection,
            Self::Comparative(_) => ExperimentType::Comparative,
        }
    }

    /// Default parameter template for a type.
    #[must_use]
    pub fn default_for(experiment_type: ExperimentType) -> Self {
        match experiment_type {
            ExperimentType::EarsCoverage => Self::EarsCoverage(EarsCoverageParameters::default()),
            ExperimentType::Performance => Self::Performance(PerformanceParameters::default()),
            ExperimentType::LanguageDetection => {
                Self::LanguageDetection(LanguageDetectionParameters::default())
            }
            ExperimentType::Comparative => Self::Comparative(ComparativeParameters::default()),
        }
    }

    /// Interpret an untyped parameter mapping for the given type.
    ///
    /// `null` yields the defaults; missing keys are filled from them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if the mapping does not fit the
    /// parameter record of `experiment_type`.
    pub fn from_value(experiment_type: ExperimentType, value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default_for(experiment_type));
        }
        let invalid = |e: serde_json::Error| {
            Error::InvalidParameters(format!("{experiment_type} parameters: {e}"))
        };
        let parameters = match experiment_type {
            ExperimentType::EarsCoverage => {
                Self::EarsCoverage(serde_json::from_value(value).map_err(invalid)?)
            }
            ExperimentType::Performance => {
                Self::Performance(serde_json::from_value(value).map_err(invalid)?)
            }
            ExperimentType::LanguageDetection => {
                Self::LanguageDetection(serde_json::from_value(value).map_err(invalid)?)
            }
            ExperimentType::Comparative => {
                Self::Comparative(serde_json::from_value(value).map_err(invalid)?)
            }
        };
        Ok(parameters)
    }

    /// Range checks that apply regardless of how the experiment is run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] for zero measurement rounds or a
    /// confidence threshold outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Performance(p) if p.measurement_rounds == 0 => Err(Error::InvalidParameters(
                "measurement_rounds must be positive".to_string(),
            )),
            Self::LanguageDetection(p) if !(0.0..=1.0).contains(&p.confidence_threshold) => {
                Err(Error::InvalidParameters(format!(
                    "confidence_threshold must be within [0, 1], got {}",
                    p.confidence_threshold
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Validated, immutable experiment configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawExperimentConfig")]
pub struct ExperimentConfig {
    experiment_type: ExperimentType,
    parameters: ExperimentParameters,
    output_format: Vec<OutputFormat>,
    timeout_seconds: u64,
    memory_limit_mb: u64,
}

impl ExperimentConfig {
    /// Create a configuration with default output format and limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if the parameters fail validation.
    pub fn new(parameters: ExperimentParameters) -> Result<Self> {
        Self::builder(parameters).build()
    }

    /// Create a builder for a configuration with non-default fields.
    #[must_use]
    pub fn builder(parameters: ExperimentParameters) -> ExperimentConfigBuilder {
        ExperimentConfigBuilder::new(parameters)
    }

    /// Default template for a type: JSON output, 600 s, 100 MB.
    #[must_use]
    pub fn default_for(experiment_type: ExperimentType) -> Self {
        Self {
            experiment_type,
            parameters: ExperimentParameters::default_for(experiment_type),
            output_format: vec![OutputFormat::Json],
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
        }
    }

    /// Get the experiment type.
    #[must_use]
    pub const fn experiment_type(&self) -> ExperimentType {
        self.experiment_type
    }

    /// Get the typed parameters.
    #[must_use]
    pub const fn parameters(&self) -> &ExperimentParameters {
        &self.parameters
    }

    /// Get the requested output formats.
    #[must_use]
    pub fn output_format(&self) -> &[OutputFormat] {
        &self.output_format
    }

    /// Get the timeout in seconds.
    #[must_use]
    pub const fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Get the memory ceiling in megabytes.
    #[must_use]
    pub const fn memory_limit_mb(&self) -> u64 {
        self.memory_limit_mb
    }
}

/// Builder for `ExperimentConfig`.
#[derive(Debug)]
pub struct ExperimentConfigBuilder {
    parameters: ExperimentParameters,
    output_format: Vec<OutputFormat>,
    timeout_seconds: u64,
    memory_limit_mb: u64,
}

impl ExperimentConfigBuilder {
    /// Create a builder with default format and limits.
    #[must_use]
    pub fn new(parameters: ExperimentParameters) -> Self {
        Self {
            parameters,
            output_format: vec![OutputFormat::Json],
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            memory_limit_mb: DEFAULT_MEMORY_LIMIT_MB,
        }
    }

    /// Set the output formats.
    #[must_use]
    pub fn output_format(mut self, formats: Vec<OutputFormat>) -> Self {
        self.output_format = formats;
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub const fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the memory ceiling in megabytes.
    #[must_use]
    pub const fn memory_limit_mb(mut self, megabytes: u64) -> Self {
        self.memory_limit_mb = megabytes;
        self
    }

    /// Validate and build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] for an empty format list, a zero
    /// limit or parameters that fail [`ExperimentParameters::validate`].
    pub fn build(self) -> Result<ExperimentConfig> {
        if self.output_format.is_empty() {
            return Err(Error::InvalidParameters(
                "At least one output format is required".to_string(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::InvalidParameters(
                "timeout_seconds must be positive".to_string(),
            ));
        }
        if self.memory_limit_mb == 0 {
            return Err(Error::InvalidParameters(
                "memory_limit_mb must be positive".to_string(),
            ));
        }
        self.parameters.validate()?;
        Ok(ExperimentConfig {
            experiment_type: self.parameters.experiment_type(),
            parameters: self.parameters,
            output_format: self.output_format,
            timeout_seconds: self.timeout_seconds,
            memory_limit_mb: self.memory_limit_mb,
        })
    }
}

#[derive(Deserialize)]
struct RawExperimentConfig {
    experiment_type: ExperimentType,
    #[serde(default)]
    parameters: Value,
    #[serde(default = "default_output_format")]
    output_format: Vec<OutputFormat>,
    #[serde(default = "default_timeout")]
    timeout_seconds: u64,
    #[serde(default = "default_memory_limit")]
    memory_limit_mb: u64,
}

fn default_output_format() -> Vec<OutputFormat> {
    vec![OutputFormat::Json]
}

const fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

const fn default_memory_limit() -> u64 {
    DEFAULT_MEMORY_LIMIT_MB
}

impl TryFrom<RawExperimentConfig> for ExperimentConfig {
    type Error = Error;

    fn try_from(raw: RawExperimentConfig) -> Result<Self> {
        let parameters = ExperimentParameters::from_value(raw.experiment_type, raw.parameters)?;
        Self::builder(parameters)
            .output_format(raw.output_format)
            .timeout_seconds(raw.timeout_seconds)
            .memory_limit_mb(raw.memory_limit_mb)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config_template() {
        let config = ExperimentConfig::default_for(ExperimentType::Performance);
        assert_eq!(config.experiment_type(), ExperimentType::Performance);
        assert_eq!(config.timeout_seconds(), 600);
        assert_eq!(config.memory_limit_mb(), 100);
        assert_eq!(config.output_format(), &[OutputFormat::Json]);
        match config.parameters() {
            ExperimentParameters::Performance(p) => {
                assert_eq!(p.operation_name, "default_operation");
                assert_eq!(p.measurement_rounds, 5);
                assert_eq!(p.warmup_rounds, 2);
                assert!(p.memory_profiling);
            }
            other => panic!("unexpected parameters: {other:?}"),
        }
    }

    #[test]
    fn test_builder_rejects_invalid_limits() {
        let params = ExperimentParameters::default_for(ExperimentType::EarsCoverage);
        assert!(matches!(
            ExperimentConfig::builder(params.clone()).timeout_seconds(0).build(),
            Err(Error::InvalidParameters(_))
        ));
        assert!(matches!(
            ExperimentConfig::builder(params.clone()).memory_limit_mb(0).build(),
            Err(Error::InvalidParameters(_))
        ));
        assert!(matches!(
            ExperimentConfig::builder(params).output_format(vec![]).build(),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_parameter_range_validation() {
        let perf = ExperimentParameters::Performance(PerformanceParameters {
            measurement_rounds: 0,
            ..PerformanceParameters::default()
        });
        let err = ExperimentConfig::new(perf).unwrap_err();
        assert!(err.to_string().contains("measurement_rounds must be positive"));

        let lang = ExperimentParameters::LanguageDetection(LanguageDetectionParameters {
            confidence_threshold: 1.5,
            ..LanguageDetectionParameters::default()
        });
        assert!(ExperimentConfig::new(lang).is_err());
    }

    #[test]
    fn test_from_value_fills_defaults() {
        let params = ExperimentParameters::from_value(
            ExperimentType::Performance,
            json!({"operation_name": "cpu_intensive"}),
        )
        .unwrap();
        let ExperimentParameters::Performance(p) = params else {
            panic!("expected performance parameters");
        };
        assert_eq!(p.operation_name, "cpu_intensive");
        assert_eq!(p.measurement_rounds, 5);
    }

    #[test]
    fn test_from_value_rejects_wrong_shape() {
        let result = ExperimentParameters::from_value(
            ExperimentType::Performance,
            json!({"measurement_rounds": "many"}),
        );
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let yaml = "experiment_type: language_detection\nparameters:\n  test_documents:\n    - path: a.md\n      expected_language: en\n";
        let config: ExperimentConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.experiment_type(), ExperimentType::LanguageDetection);
        assert_eq!(config.timeout_seconds(), DEFAULT_TIMEOUT_SECONDS);
        let ExperimentParameters::LanguageDetection(p) = config.parameters() else {
            panic!("expected language parameters");
        };
        assert_eq!(p.test_documents.len(), 1);
        assert!(p.test_documents[0].is_spec_document);
        assert_eq!(p.test_documents[0].expected_language, Language::English);
    }

    #[test]
    fn test_experiment_type_parse() {
        assert_eq!(
            "ears_coverage".parse::<ExperimentType>().unwrap(),
            ExperimentType::EarsCoverage
        );
        assert!("unknown".parse::<ExperimentType>().is_err());
        assert_eq!(ExperimentType::LanguageDetection.stage_label(), "Language detection");
    }
}
