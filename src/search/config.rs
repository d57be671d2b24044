//! Search orchestrator configuration.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default output artifact.
pub const DEFAULT_OUTPUT_PATH: &str = "packing.stl";

/// Default wall-clock budget in seconds.
pub const DEFAULT_TIME_BUDGET_SECS: u64 = 180;

/// Annealing iterations per restart.
pub const ANNEALING_ITERATIONS: usize = 2_000_000;

/// What to do when writing an improved packing fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PersistencePolicy {
    /// Stop the search and return the error.
    #[default]
    Abort,
    /// Log a warning and keep searching. The failed candidate is not
    /// recorded as the incumbent.
    Warn,
}

/// Configuration for [`SearchOrchestrator`](super::SearchOrchestrator).
///
/// # Examples
///
/// ```
/// use pack3d::search::{PersistencePolicy, SearchConfig};
/// use std::time::Duration;
///
/// let config = SearchConfig::default()
///     .with_output_path("out.stl")
///     .with_time_budget(Duration::from_secs(30))
///     .with_annealing_iterations(100_000)
///     .with_persistence_policy(PersistencePolicy::Warn);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchConfig {
    /// The single artifact overwritten on every improvement.
    pub output_path: PathBuf,

    /// Soft deadline, checked between restarts only.
    pub time_budget: Duration,

    /// Iterations of each bounded annealing pass.
    pub annealing_iterations: usize,

    /// Reaction to a failed write.
    pub persistence_policy: PersistencePolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            time_budget: Duration::from_secs(DEFAULT_TIME_BUDGET_SECS),
            annealing_iterations: ANNEALING_ITERATIONS,
            persistence_policy: PersistencePolicy::default(),
        }
    }
}

impl SearchConfig {
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn with_annealing_iterations(mut self, n: usize) -> Self {
        self.annealing_iterations = n;
        self
    }

    pub fn with_persistence_policy(mut self, policy: PersistencePolicy) -> Self {
        self.persistence_policy = policy;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.output_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("output_path must not be empty".into()));
        }
        if self.annealing_iterations == 0 {
            return Err(Error::InvalidConfig(
                "annealing_iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
