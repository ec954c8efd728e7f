//! Integration tests for experiment tracking and saved configurations
//!
//! Tests the manager end to end:
//! 1. Create results and drive them through the status machine
//! 2. Persist and reload configurations
//! 3. Share one store between managers and tasks

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde_json::json;
use specbench::experiment::{
    ExperimentConfig, ExperimentManager, ExperimentParameters, ExperimentStatus, ExperimentStore,
    ExperimentType, OutputFormat, PerformanceParameters, StatusUpdate,
};
use specbench::Error;
use tempfile::TempDir;

fn manager() -> (TempDir, ExperimentManager) {
    let dir = TempDir::new().unwrap();
    let manager = ExperimentManager::new(dir.path().join("experiments")).unwrap();
    (dir, manager)
}

#[test]
fn test_full_lifecycle() {
    let (_dir, manager) = manager();
    let config = manager.create_default_config(ExperimentType::Performance);
    let result = manager.create_experiment_result(config);
    let id = result.experiment_id().to_string();
    assert_eq!(result.status(), ExperimentStatus::Pending);

    manager
        .update_experiment_status(&id, ExperimentStatus::Running)
        .unwrap();
    manager
        .update_experiment_status(
            &id,
            StatusUpdate::new(ExperimentStatus::Analyzing).with_metadata_entry("rounds", json!(5)),
        )
        .unwrap();
    thread::sleep(Duration::from_millis(2));
    let done = manager
        .update_experiment_status(
            &id,
            StatusUpdate::completed().with_metadata_entry("summary", json!("ok")),
        )
        .unwrap();

    assert_eq!(done.status(), ExperimentStatus::Completed);
    assert!(done.duration_seconds() > 0.0);
    assert_eq!(done.metadata()["rounds"], json!(5));
    assert_eq!(done.metadata()["summary"], json!("ok"));
    assert_eq!(manager.get_experiment_result(&id), Some(done));
}

#[test]
fn test_terminal_status_is_final() {
    let (_dir, manager) = manager();
    let result = manager.create_experiment_result(ExperimentConfig::default_for(ExperimentType::EarsCoverage));
    let id = result.experiment_id();

    manager
        .update_experiment_status(id, StatusUpdate::failed("analyzer crashed"))
        .unwrap();
    let err = manager
        .update_experiment_status(id, ExperimentStatus::Running)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidTransition {
            from: ExperimentStatus::Failed,
            to: ExperimentStatus::Running,
            ..
        }
    ));

    let stored = manager.get_experiment_result(id).unwrap();
    assert_eq!(stored.status(), ExperimentStatus::Failed);
    assert_eq!(stored.error_message(), Some("analyzer crashed"));
}

#[test]
fn test_unknown_experiment_update() {
    let (_dir, manager) = manager();
    let err = manager
        .update_experiment_status("nope", ExperimentStatus::Running)
        .unwrap_err();
    assert_eq!(err.to_string(), "Experiment nope not found");
}

#[test]
fn test_cleanup_keeps_unfinished() {
    let (_dir, manager) = manager();
    let config = ExperimentConfig::default_for(ExperimentType::Performance);
    let finished = manager.create_experiment_result(config.clone());
    let running = manager.create_experiment_result(config);
    manager
        .update_experiment_status(finished.experiment_id(), StatusUpdate::completed())
        .unwrap();
    manager
        .update_experiment_status(running.experiment_id(), ExperimentStatus::Running)
        .unwrap();

    assert_eq!(manager.cleanup_completed_experiments(), 1);
    let remaining = manager.list_active_experiments();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].experiment_id(), running.experiment_id());
}

#[test]
fn test_config_round_trip() {
    let (_dir, manager) = manager();
    let config = ExperimentConfig::builder(ExperimentParameters::Performance(PerformanceParameters {
        operation_name: "file_io".to_string(),
        measurement_rounds: 10,
        warmup_rounds: 0,
        memory_profiling: false,
    }))
    .output_format(vec![OutputFormat::Csv, OutputFormat::Yaml])
    .timeout_seconds(30)
    .memory_limit_mb(256)
    .build()
    .unwrap();

    let path = manager.save_config(&config, "io_bench").unwrap();
    assert!(path.ends_with("io_bench.yaml"));
    assert_eq!(manager.load_config("io_bench").unwrap(), config);
    assert_eq!(manager.list_configs().unwrap(), vec!["io_bench".to_string()]);
}

#[test]
fn test_missing_and_malformed_configs() {
    let (_dir, manager) = manager();
    let missing = manager.load_config("absent").unwrap_err();
    assert!(matches!(missing, Error::Configuration(_)));
    assert!(missing.to_string().contains("not found"));

    std::fs::write(manager.config_dir().join("broken.yaml"), "experiment_type: [").unwrap();
    let malformed = manager.load_config("broken").unwrap_err();
    assert!(malformed.to_string().contains("Invalid configuration format in 'broken'"));

    assert!(manager.load_config("../escape").is_err());
}

#[test]
fn test_managers_share_injected_store() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(ExperimentStore::new());
    let first = ExperimentManager::with_store(dir.path(), Arc::clone(&store)).unwrap();
    let second = ExperimentManager::with_store(dir.path(), Arc::clone(&store)).unwrap();

    let result = first.create_experiment_result(ExperimentConfig::default_for(ExperimentType::Comparative));
    assert!(second.get_experiment_result(result.experiment_id()).is_some());
    assert_eq!(store.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creation_and_updates() {
    let (_dir, manager) = manager();
    let mut handles = Vec::new();
    for _ in 0..16 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move {
            let result = manager
                .create_experiment_result(ExperimentConfig::default_for(ExperimentType::Performance));
            manager
                .update_experiment_status(result.experiment_id(), ExperimentStatus::Running)
                .unwrap();
            manager
                .update_experiment_status(result.experiment_id(), StatusUpdate::completed())
                .unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().status(), ExperimentStatus::Completed);
    }
    assert_eq!(manager.list_active_experiments().len(), 16);
    assert_eq!(manager.cleanup_completed_experiments(), 16);
}
