//! Experiment Manager - lifecycle of experiment results and saved configurations

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use super::{ExperimentConfig, ExperimentResult, ExperimentStore, ExperimentType, StatusUpdate};
use crate::{Error, Result};

/// Extension of saved configuration files.
const CONFIG_EXTENSION: &str = "yaml";

/// Owns the experiment registry and the directory of saved configurations.
///
/// The registry is injected, so several managers (or an API and its tests)
/// can share one [`ExperimentStore`].
#[derive(Debug, Clone)]
pub struct ExperimentManager {
    config_dir: PathBuf,
    store: Arc<ExperimentStore>,
}

impl ExperimentManager {
    /// Create a manager with a fresh registry, creating `config_dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created.
    pub fn new(config_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_store(config_dir, Arc::new(ExperimentStore::new()))
    }

    /// Create a manager over an existing registry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created.
    pub fn with_store(config_dir: impl Into<PathBuf>, store: Arc<ExperimentStore>) -> Result<Self> {
        let config_dir = config_dir.into();
        fs::create_dir_all(&config_dir)?;
        debug!(config_dir = %config_dir.display(), "experiment manager ready");
        Ok(Self { config_dir, store })
    }

    /// Directory holding saved configurations.
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Shared registry.
    #[must_use]
    pub const fn store(&self) -> &Arc<ExperimentStore> {
        &self.store
    }

    fn config_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(Error::Configuration(format!(
                "Invalid configuration name '{name}'"
            )));
        }
        Ok(self.config_dir.join(format!("{name}.{CONFIG_EXTENSION}")))
    }

    /// Save `config` as `<config_dir>/<name>.yaml`, overwriting any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for a name containing path separators,
    /// [`Error::FormatConversion`] if serialization fails and [`Error::Io`] if
    /// the file cannot be written.
    pub fn save_config(&self, config: &ExperimentConfig, name: &str) -> Result<PathBuf> {
        let path = self.config_path(name)?;
        let yaml =
            serde_yaml::to_string(config).map_err(|e| Error::FormatConversion(e.to_string()))?;
        fs::write(&path, yaml)?;
        info!(name, path = %path.display(), "saved experiment configuration");
        Ok(path)
    }

    /// Load a configuration saved under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file is missing or does not
    /// describe a valid configuration.
    pub fn load_config(&self, name: &str) -> Result<ExperimentConfig> {
        let path = self.config_path(name)?;
        if !path.exists() {
            return Err(Error::Configuration(format!(
                "Configuration '{name}' not found at {}",
                path.display()
            )));
        }
        let contents = fs::read_to_string(&path)?;
        let config = serde_yaml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Invalid configuration format in '{name}': {e}"))
        })?;
        debug!(name, "loaded experiment configuration");
        Ok(config)
    }

    /// Names of saved configurations, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be read.
    pub fn list_configs(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == CONFIG_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Register a new pending result with a fresh UUID.
    pub fn create_experiment_result(&self, config: ExperimentConfig) -> ExperimentResult {
        let result = loop {
            let candidate = ExperimentResult::new(Uuid::new_v4().to_string(), config.clone());
            if self.store.insert(candidate.clone()).is_ok() {
                break candidate;
            }
        };
        info!(
            experiment_id = result.experiment_id(),
            experiment_type = %result.experiment_type(),
            "created experiment"
        );
        result
    }

    /// Apply a status update; the only way a registered result changes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] for an unknown id or mismatched report and
    /// [`Error::InvalidTransition`] for a transition the state machine rejects.
    pub fn update_experiment_status(
        &self,
        experiment_id: &str,
        update: impl Into<StatusUpdate>,
    ) -> Result<ExperimentResult> {
        let update = update.into();
        let status = update.status();
        let result = self.store.update(experiment_id, update)?;
        info!(experiment_id, %status, "experiment status updated");
        Ok(result)
    }

    /// Snapshot of a registered result.
    #[must_use]
    pub fn get_experiment_result(&self, experiment_id: &str) -> Option<ExperimentResult> {
        self.store.get(experiment_id)
    }

    /// Every registered result, ordered by creation time.
    #[must_use]
    pub fn list_active_experiments(&self) -> Vec<ExperimentResult> {
        self.store.list()
    }

    /// Drop completed and failed results; returns how many were removed.
    pub fn cleanup_completed_experiments(&self) -> usize {
        let removed = self.store.remove_terminal();
        debug!(removed, "cleaned up finished experiments");
        removed
    }

    /// Default configuration template for a type.
    #[must_use]
    pub fn create_default_config(&self, experiment_type: ExperimentType) -> ExperimentConfig {
        ExperimentConfig::default_for(experiment_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{ExperimentStatus, OutputFormat};
    use tempfile::TempDir;

    fn manager() -> (TempDir, ExperimentManager) {
        let dir = TempDir::new().unwrap();
        let manager = ExperimentManager::new(dir.path().join("configs")).unwrap();
        (dir, manager)
    }

    #[test]
    fn test_new_creates_config_dir() {
        let (dir, manager) = manager();
        assert!(dir.path().join("configs").is_dir());
        assert_eq!(manager.config_dir(), dir.path().join("configs"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, manager) = manager();
        let config = ExperimentConfig::builder(
            manager
                .create_default_config(ExperimentType::Performance)
                .parameters()
                .clone(),
        )
        .output_format(vec![OutputFormat::Json, OutputFormat::Csv])
        .timeout_seconds(30)
        .build()
        .unwrap();

        let path = manager.save_config(&config, "perf").unwrap();
        assert!(path.ends_with("perf.yaml"));
        assert_eq!(manager.load_config("perf").unwrap(), config);
        assert_eq!(manager.list_configs().unwrap(), vec!["perf".to_string()]);
    }

    #[test]
    fn test_load_missing_config() {
        let (_dir, manager) = manager();
        let err = manager.load_config("absent").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("Configuration 'absent' not found"));
    }

    #[test]
    fn test_load_malformed_config() {
        let (_dir, manager) = manager();
        fs::write(manager.config_dir().join("bad.yaml"), "experiment_type: [").unwrap();
        let err = manager.load_config("bad").unwrap_err();
        assert!(err
            .to_string()
            .contains("Invalid configuration format in 'bad'"));
    }

    #[test]
    fn test_config_name_with_separator_rejected() {
        let (_dir, manager) = manager();
        let config = manager.create_default_config(ExperimentType::EarsCoverage);
        assert!(matches!(
            manager.save_config(&config, "../escape"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_lifecycle_and_cleanup() {
        let (_dir, manager) = manager();
        let config = manager.create_default_config(ExperimentType::EarsCoverage);
        let created = manager.create_experiment_result(config);
        assert_eq!(created.status(), ExperimentStatus::Pending);
        assert_eq!(Uuid::parse_str(created.experiment_id()).unwrap().get_version_num(), 4);

        let id = created.experiment_id().to_string();
        manager
            .update_experiment_status(&id, ExperimentStatus::Running)
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let done = manager
            .update_experiment_status(&id, StatusUpdate::completed())
            .unwrap();
        assert_eq!(done.status(), ExperimentStatus::Completed);
        assert!(done.duration_seconds() > 0.0);

        assert_eq!(manager.list_active_experiments().len(), 1);
        assert_eq!(manager.cleanup_completed_experiments(), 1);
        assert!(manager.get_experiment_result(&id).is_none());
    }

    #[test]
    fn test_update_unknown_experiment() {
        let (_dir, manager) = manager();
        let err = manager
            .update_experiment_status("missing", ExperimentStatus::Running)
            .unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }
}
