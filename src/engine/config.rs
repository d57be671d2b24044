//! Tuning for the reference packing engine.

use crate::error::{Error, Result};

/// Configuration for [`PackingModel`](super::PackingModel).
///
/// Temperatures are relative to the energy at the start of each
/// annealing pass, so the same settings work for any mesh scale.
///
/// # Examples
///
/// ```
/// use pack3d::engine::PackingModelConfig;
///
/// let config = PackingModelConfig::default()
///     .with_rotation_probability(0.5)
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackingModelConfig {
    /// Starting temperature as a fraction of the pass's initial energy.
    pub initial_temperature_ratio: f64,

    /// Final temperature as a fraction of the pass's initial energy.
    pub min_temperature_ratio: f64,

    /// Neighbor evaluations per cooling step.
    pub iterations_per_temperature: usize,

    /// Chance that a move re-orients an instance instead of translating
    /// it. Only applies to meshes with rotation allowed.
    pub rotation_probability: f64,

    /// Random seed for reproducibility.
    pub seed: Option<u64>,
}

impl Default for PackingModelConfig {
    fn default() -> Self {
        Self {
            initial_temperature_ratio: 0.1,
            min_temperature_ratio: 1e-4,
            iterations_per_temperature: 1000,
            rotation_probability: 0.25,
            seed: None,
        }
    }
}

impl PackingModelConfig {
    pub fn with_temperature_ratios(mut self, initial: f64, min: f64) -> Self {
        self.initial_temperature_ratio = initial;
        self.min_temperature_ratio = min;
        self
    }

    pub fn with_iterations_per_temperature(mut self, n: usize) -> Self {
        self.iterations_per_temperature = n;
        self
    }

    pub fn with_rotation_probability(mut self, p: f64) -> Self {
        self.rotation_probability = p;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.min_temperature_ratio > 0.0) {
            return Err(Error::InvalidConfig(
                "min_temperature_ratio must be positive".into(),
            ));
        }
        if !(self.initial_temperature_ratio > self.min_temperature_ratio) {
            return Err(Error::InvalidConfig(
                "initial_temperature_ratio must exceed min_temperature_ratio".into(),
            ));
        }
        if self.iterations_per_temperature == 0 {
            return Err(Error::InvalidConfig(
                "iterations_per_temperature must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.rotation_probability) {
            return Err(Error::InvalidConfig(format!(
                "rotation_probability must be in [0, 1], got {}",
                self.rotation_probability
            )));
        }
        Ok(())
    }
}
