//! Tests for error types

use std::io;
use std::path::PathBuf;

use specbench::experiment::ExperimentStatus;
use specbench::Error;

#[test]
fn test_invalid_parameters_error() {
    let error = Error::InvalidParameters("measurement_rounds must be positive".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid parameters"));
    assert!(error_str.contains("measurement_rounds must be positive"));
}

#[test]
fn test_insufficient_data_error() {
    let error = Error::InsufficientData("Cannot calculate statistics for empty dataset".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Insufficient data"));
    assert!(error_str.contains("empty dataset"));
}

#[test]
fn test_incompatible_experiments_error() {
    let error = Error::IncompatibleExperiments(
        "Experiment types don't match: performance vs ears_coverage".to_string(),
    );
    let error_str = format!("{error}");
    assert!(error_str.contains("Incompatible experiments"));
    assert!(error_str.contains("performance vs ears_coverage"));
}

#[test]
fn test_execution_error_is_verbatim() {
    let error = Error::Execution("Experiment abc not found".to_string());
    assert_eq!(format!("{error}"), "Experiment abc not found");
}

#[test]
fn test_invalid_transition_error() {
    let error = Error::InvalidTransition {
        experiment_id: "exp-1".to_string(),
        from: ExperimentStatus::Completed,
        to: ExperimentStatus::Running,
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("exp-1"));
    assert!(error_str.contains("completed"));
    assert!(error_str.contains("running"));
}

#[test]
fn test_file_write_error_chains_source() {
    let error = Error::FileWrite {
        path: PathBuf::from("out/report.json"),
        attempts: 3,
        source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("out/report.json"));
    assert!(error_str.contains("after 3 attempts"));
    let source = std::error::Error::source(&error).unwrap();
    assert_eq!(source.to_string(), "denied");
}

#[test]
fn test_io_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_result_type_alias() {
    fn returns_error() -> specbench::Result<i32> {
        Err(Error::Profiling("At least 1 iteration is required".to_string()))
    }

    let result = returns_error();
    assert!(result.is_err());
    assert!(format!("{}", result.unwrap_err()).contains("Profiling error"));
}
