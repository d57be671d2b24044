//! SA configuration with geometric cooling.

use crate::error::{Error, Result};

/// Configuration for one Simulated Annealing pass.
///
/// Temperature cools geometrically, `T_{k+1} = alpha * T_k`, after every
/// `iterations_per_temperature` neighbor evaluations.
///
/// # Examples
///
/// ```
/// use pack3d::sa::SaConfig;
///
/// let config = SaConfig::default()
///     .with_initial_temperature(100.0)
///     .with_min_temperature(0.001)
///     .with_alpha(0.98)
///     .with_iterations_per_temperature(200);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaConfig {
    /// Initial temperature. Higher values allow more exploration.
    pub initial_temperature: f64,

    /// Minimum temperature. The pass stops when T drops below this.
    pub min_temperature: f64,

    /// Cooling factor in (0, 1). Higher = slower cooling.
    pub alpha: f64,

    /// Number of iterations at each temperature level.
    pub iterations_per_temperature: usize,

    /// Maximum total iterations (hard budget). 0 = no limit.
    pub max_iterations: usize,
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 100.0,
            min_temperature: 1e-6,
            alpha: 0.95,
            iterations_per_temperature: 100,
            max_iterations: 0,
        }
    }
}

impl SaConfig {
    /// Builds a schedule that cools from `initial` to `min` over exactly
    /// `iterations` neighbor evaluations.
    ///
    /// ```
    /// use pack3d::sa::SaConfig;
    ///
    /// let config = SaConfig::spanning(1.0, 1e-4, 10_000, 100);
    /// assert_eq!(config.max_iterations, 10_000);
    /// assert!(config.alpha > 0.0 && config.alpha < 1.0);
    /// ```
    pub fn spanning(
        initial: f64,
        min: f64,
        iterations: usize,
        iterations_per_temperature: usize,
    ) -> Self {
        let per_step = iterations_per_temperature.max(1);
        let steps = (iterations / per_step).max(1);
        let alpha = (min / initial).powf(1.0 / steps as f64);
        Self {
            initial_temperature: initial,
            min_temperature: min,
            alpha,
            iterations_per_temperature: per_step,
            max_iterations: iterations,
        }
    }

    pub fn with_initial_temperature(mut self, t: f64) -> Self {
        self.initial_temperature = t;
        self
    }

    pub fn with_min_temperature(mut self, t: f64) -> Self {
        self.min_temperature = t;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_iterations_per_temperature(mut self, n: usize) -> Self {
        self.iterations_per_temperature = n;
        self
    }

    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.initial_temperature > 0.0) {
            return Err(Error::InvalidConfig(
                "initial_temperature must be positive".into(),
            ));
        }
        if !(self.min_temperature > 0.0) {
            return Err(Error::InvalidConfig("min_temperature must be positive".into()));
        }
        if self.min_temperature >= self.initial_temperature {
            return Err(Error::InvalidConfig(
                "min_temperature must be less than initial_temperature".into(),
            ));
        }
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if self.iterations_per_temperature == 0 {
            return Err(Error::InvalidConfig(
                "iterations_per_temperature must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
