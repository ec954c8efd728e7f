//! Error types for specbench
//!
//! Every fallible operation in the crate returns [`Result`]. Target
//! operations handed to the profiler report failures as [`anyhow::Error`];
//! those are rendered into the failed measurement rather than surfaced here.

use std::path::PathBuf;

use thiserror::Error;

use crate::experiment::ExperimentStatus;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// specbench error types
#[derive(Error, Debug)]
pub enum Error {
    /// Caller-supplied parameters are missing or out of range
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Input data contains non-finite or non-numeric values
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Not enough samples for the requested statistic
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Experiments of different types cannot be compared
    #[error("Incompatible experiments: {0}")]
    IncompatibleExperiments(String),

    /// Experiment execution failed (unknown id, runner failure)
    #[error("{0}")]
    Execution(String),

    /// Profiling request could not be carried out
    #[error("Profiling error: {0}")]
    Profiling(String),

    /// Saved configuration missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Status update rejected by the lifecycle state machine
    #[error("Invalid status transition for experiment {experiment_id}: {from} -> {to}")]
    InvalidTransition {
        /// Experiment whose update was rejected
        experiment_id: String,
        /// Status at the time of the update
        from: ExperimentStatus,
        /// Requested status
        to: ExperimentStatus,
    },

    /// Output file could not be written after every retry
    #[error("Failed to write {} after {attempts} attempts", path.display())]
    FileWrite {
        /// Target path (with format extension)
        path: PathBuf,
        /// Number of attempts made
        attempts: u32,
        /// Last underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Report could not be serialized to the requested format
    #[error("Format conversion failed: {0}")]
    FormatConversion(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
