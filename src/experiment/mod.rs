//! Experiment data model and lifecycle
//!
//! ## Lifecycle
//!
//! ```text
//! Pending ──> Running ──> Analyzing ──> Completed
//!                 │            │
//!                 └────────────┴──────> Failed
//! ```
//!
//! Results are created by [`ExperimentManager::create_experiment_result`] and
//! change only through [`ExperimentManager::update_experiment_status`].
//!
//! ## Usage
//!
//! ```rust
//! use specbench::experiment::{ExperimentManager, ExperimentStatus, ExperimentType, StatusUpdate};
//!
//! let dir = tempfile::tempdir()?;
//! let manager = ExperimentManager::new(dir.path())?;
//!
//! let config = manager.create_default_config(ExperimentType::Performance);
//! let result = manager.create_experiment_result(config);
//!
//! manager.update_experiment_status(result.experiment_id(), ExperimentStatus::Running)?;
//! let done = manager.update_experiment_status(result.experiment_id(), StatusUpdate::completed())?;
//! assert_eq!(done.status(), ExperimentStatus::Completed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod comparison;
mod config;
mod manager;
mod report;
mod result;
mod status;
mod store;

pub use comparison::{
    ComparativeExperimentReport, ComparisonResult, ComparisonSummary, StatisticalComparison,
};
pub use config::{
    ComparativeParameters, DetailLevel, EarsCoverageParameters, ExperimentConfig,
    ExperimentConfigBuilder, ExperimentParameters, ExperimentType, Language,
    LanguageDetectionParameters, OutputFormat, PerformanceParameters, TestDocument,
    DEFAULT_MEMORY_LIMIT_MB, DEFAULT_TIMEOUT_SECONDS,
};
pub use manager::ExperimentManager;
pub use report::{
    CoverageViolation, EarsCoverageReport, LanguageDetectionReport, LanguageDetectionResult,
    PerformanceDetail, PerformanceReport, StatisticalSummary,
};
pub use result::{ExperimentReport, ExperimentResult, Metadata, StatusUpdate};
pub use status::ExperimentStatus;
pub use store::ExperimentStore;
