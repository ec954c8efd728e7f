//! Experiment Store - concurrent in-memory registry of experiment results
//!
//! Results are keyed by experiment id. Distinct ids can be created and
//! updated concurrently; updates to one id are serialized by its shard lock.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{ExperimentResult, StatusUpdate};
use crate::{Error, Result};

/// In-memory registry of experiment results.
///
/// # Example
///
/// ```rust
/// use specbench::experiment::{
///     ExperimentConfig, ExperimentResult, ExperimentStatus, ExperimentStore, ExperimentType,
/// };
///
/// let store = ExperimentStore::new();
/// let config = ExperimentConfig::default_for(ExperimentType::Performance);
/// store.insert(ExperimentResult::new("exp-001", config))?;
///
/// store.update("exp-001", ExperimentStatus::Running.into())?;
/// assert_eq!(store.get("exp-001").unwrap().status(), ExperimentStatus::Running);
/// # Ok::<(), specbench::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct ExperimentStore {
    results: DashMap<String, ExperimentResult>,
}

impl ExperimentStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Track a new result under its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] if the id is already tracked; the
    /// existing result is left unchanged.
    pub fn insert(&self, result: ExperimentResult) -> Result<()> {
        match self.results.entry(result.experiment_id().to_string()) {
            Entry::Occupied(entry) => Err(Error::InvalidParameters(format!(
                "Experiment {} already exists",
                entry.key()
            ))),
            Entry::Vacant(entry) => {
                entry.insert(result);
                Ok(())
            }
        }
    }

    /// Snapshot of a result by id.
    #[must_use]
    pub fn get(&self, experiment_id: &str) -> Option<ExperimentResult> {
        self.results.get(experiment_id).map(|r| r.value().clone())
    }

    /// Apply a status update and return the updated snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] for an unknown id, or the error of the
    /// rejected update (the stored result is left unchanged).
    pub fn update(&self, experiment_id: &str, update: StatusUpdate) -> Result<ExperimentResult> {
        let mut entry = self
            .results
            .get_mut(experiment_id)
            .ok_or_else(|| Error::Execution(format!("Experiment {experiment_id} not found")))?;
        entry.apply_update(update)?;
        Ok(entry.value().clone())
    }

    /// Snapshots of every result, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<ExperimentResult> {
        let mut results: Vec<ExperimentResult> =
            self.results.iter().map(|r| r.value().clone()).collect();
        results.sort_by_key(ExperimentResult::timestamp);
        results
    }

    /// Remove every result in a terminal status; returns how many were removed.
    pub fn remove_terminal(&self) -> usize {
        let before = self.results.len();
        self.results.retain(|_, r| !r.status().is_terminal());
        before.saturating_sub(self.results.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{ExperimentConfig, ExperimentStatus, ExperimentType};
    use std::sync::Arc;

    fn result(id: &str) -> ExperimentResult {
        ExperimentResult::new(id, ExperimentConfig::default_for(ExperimentType::EarsCoverage))
    }

    #[test]
    fn test_store_default() {
        let store = ExperimentStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn test_update_unknown_id() {
        let store = ExperimentStore::new();
        let err = store
            .update("nope", ExperimentStatus::Running.into())
            .unwrap_err();
        assert_eq!(err.to_string(), "Experiment nope not found");
    }

    #[test]
    fn test_insert_rejects_tracked_id() {
        let store = ExperimentStore::new();
        store.insert(result("exp")).unwrap();
        store.update("exp", StatusUpdate::completed()).unwrap();

        let err = store.insert(result("exp")).unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
        assert_eq!(err.to_string(), "Invalid parameters: Experiment exp already exists");
        assert_eq!(store.get("exp").unwrap().status(), ExperimentStatus::Completed);
    }

    #[test]
    fn test_list_is_ordered_by_creation() {
        let store = ExperimentStore::new();
        for id in ["a", "b", "c"] {
            store.insert(result(id)).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        let ids: Vec<String> = store
            .list()
            .iter()
            .map(|r| r.experiment_id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_terminal_keeps_active() {
        let store = ExperimentStore::new();
        store.insert(result("done")).unwrap();
        store.insert(result("failed")).unwrap();
        store.insert(result("active")).unwrap();
        store.update("done", StatusUpdate::completed()).unwrap();
        store.update("failed", StatusUpdate::failed("x")).unwrap();
        store.update("active", ExperimentStatus::Running.into()).unwrap();

        assert_eq!(store.remove_terminal(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get("active").is_some());
        assert_eq!(store.remove_terminal(), 0);
    }

    #[test]
    fn test_concurrent_inserts() {
        let store = Arc::new(ExperimentStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        store.insert(result(&format!("{t}-{i}"))).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 200);
    }
}
