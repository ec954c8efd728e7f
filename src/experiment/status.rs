//! Experiment lifecycle status

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of an experiment.
///
/// Transitions only move forward: `Pending -> Running -> Analyzing ->
/// {Completed | Failed}`. Intermediate states may be skipped, terminal
/// states accept nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    /// Created but not yet started.
    Pending,
    /// Measurement in progress.
    Running,
    /// Post-processing of collected measurements.
    Analyzing,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl ExperimentStatus {
    /// Returns `true` for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Analyzing => 2,
            Self::Completed | Self::Failed => 3,
        }
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// Re-asserting a non-terminal status is accepted so that metadata can be
    /// attached without changing state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }

    /// Lowercase name used in serialized output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
