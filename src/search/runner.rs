//! Best-of-restarts search loop.
//!
//! # Algorithm
//!
//! 1. Configure the engine with the objects and the perturbation scale,
//!    set the incumbent energy to +infinity and capture the start time
//! 2. While searching:
//!    a. Run one bounded annealing pass
//!    b. If its energy is strictly below the incumbent, snapshot the
//!    engine and overwrite the output artifact
//!    c. Reset the engine to a fresh random arrangement
//!    d. Stop once the elapsed time exceeds the budget
//!
//! The deadline is only checked between restarts, so the final pass may
//! finish after the budget has run out.

use super::clock::{Clock, MonotonicClock};
use super::config::{PersistencePolicy, SearchConfig};
use crate::engine::PackingEngine;
use crate::error::{Error, Result};
use crate::object::ObjectSet;
use crate::persist::PersistenceSink;
use crate::progress::Timed;
use std::time::Duration;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchState {
    /// Not running: either not yet started or finished.
    Stopped,
    /// Restarts are being executed.
    Searching,
}

/// What a single restart produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestartOutcome {
    /// Strictly better than the incumbent and written to disk.
    Improved { energy: f64 },
    /// Equal to or worse than the incumbent; nothing written.
    NotImproved { energy: f64 },
    /// Better than the incumbent, but the write failed and the policy
    /// allowed the search to continue.
    WriteFailed { energy: f64 },
}

/// Summary of a finished (or in-progress) search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchReport {
    /// Annealing passes executed.
    pub restarts: usize,
    /// Artifacts successfully written.
    pub improvements: usize,
    /// Writes that failed under [`PersistencePolicy::Warn`].
    pub failed_writes: usize,
    /// Incumbent energy; +infinity if nothing was written.
    pub best_energy: f64,
    /// Time since the search started.
    pub elapsed: Duration,
}

/// Drives a [`PackingEngine`] through timed restarts, persisting every
/// strict improvement through a [`PersistenceSink`].
///
/// # Examples
///
/// ```no_run
/// use pack3d::engine::{PackingModel, PackingModelConfig};
/// use pack3d::object::{setup_objects, RotationPolicy};
/// use pack3d::persist::StlSink;
/// use pack3d::search::{SearchConfig, SearchOrchestrator};
/// use pack3d::Mesh;
///
/// let objects = setup_objects(["4", "part.stl"], RotationPolicy::default(), |p| Mesh::load(p))?;
/// let engine = PackingModel::new(PackingModelConfig::default())?;
/// let mut search = SearchOrchestrator::new(engine, StlSink, SearchConfig::default());
/// let report = search.run(&objects)?;
/// println!("best energy {}", report.best_energy);
/// # Ok::<(), pack3d::Error>(())
/// ```
pub struct SearchOrchestrator<E, S, C = MonotonicClock> {
    engine: E,
    sink: S,
    clock: C,
    config: SearchConfig,
    state: SearchState,
    started: bool,
    started_at: Duration,
    best_energy: f64,
    restarts: usize,
    improvements: usize,
    failed_writes: usize,
}

impl<E, S> SearchOrchestrator<E, S, MonotonicClock>
where
    E: PackingEngine,
    S: PersistenceSink<E::Snapshot>,
{
    pub fn new(engine: E, sink: S, config: SearchConfig) -> Self {
        Self::with_clock(engine, sink, config, MonotonicClock::new())
    }
}

impl<E, S, C> SearchOrchestrator<E, S, C>
where
    E: PackingEngine,
    S: PersistenceSink<E::Snapshot>,
    C: Clock,
{
    pub fn with_clock(engine: E, sink: S, config: SearchConfig, clock: C) -> Self {
        Self {
            engine,
            sink,
            clock,
            config,
            state: SearchState::Stopped,
            started: false,
            started_at: Duration::ZERO,
            best_energy: f64::INFINITY,
            restarts: 0,
            improvements: 0,
            failed_writes: 0,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Lowest energy written so far.
    pub fn best_energy(&self) -> f64 {
        self.best_energy
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn report(&self) -> SearchReport {
        SearchReport {
            restarts: self.restarts,
            improvements: self.improvements,
            failed_writes: self.failed_writes,
            best_energy: self.best_energy,
            elapsed: self.elapsed(),
        }
    }

    fn elapsed(&self) -> Duration {
        if self.started {
            self.clock.elapsed().saturating_sub(self.started_at)
        } else {
            Duration::ZERO
        }
    }

    /// Configures the engine and enters [`SearchState::Searching`].
    ///
    /// The perturbation scale is taken from `objects` here, once. A search
    /// can only be started once.
    pub fn start(&mut self, objects: &ObjectSet) -> Result<()> {
        if self.started {
            return Err(Error::InvalidConfig("search already started".into()));
        }
        self.config.validate()?;

        let deviation = objects.deviation();
        {
            let _t = Timed::start(format!(
                "configuring {} instances (deviation {deviation:.4})",
                objects.instance_count()
            ));
            self.engine.configure(objects.objects(), deviation);
        }

        self.best_energy = f64::INFINITY;
        self.started = true;
        self.started_at = self.clock.elapsed();
        self.state = SearchState::Searching;
        Ok(())
    }

    /// Executes one restart. Returns `None` once stopped.
    pub fn step(&mut self) -> Result<Option<RestartOutcome>> {
        if self.state != SearchState::Searching {
            return Ok(None);
        }

        self.engine.run_annealing(self.config.annealing_iterations);
        self.restarts += 1;
        let energy = self.engine.energy();
        log::debug!("restart {}: energy {energy}", self.restarts);

        let outcome = if energy < self.best_energy {
            match self.persist() {
                Ok(()) => {
                    self.best_energy = energy;
                    self.improvements += 1;
                    log::info!(
                        "new best energy {energy:.6} at restart {} ({:?} elapsed)",
                        self.restarts,
                        self.elapsed()
                    );
                    RestartOutcome::Improved { energy }
                }
                Err(e) => match self.config.persistence_policy {
                    PersistencePolicy::Abort => {
                        self.state = SearchState::Stopped;
                        return Err(e);
                    }
                    PersistencePolicy::Warn => {
                        log::warn!("{e}; packing with energy {energy:.6} was not saved");
                        self.failed_writes += 1;
                        RestartOutcome::WriteFailed { energy }
                    }
                },
            }
        } else {
            RestartOutcome::NotImproved { energy }
        };

        self.engine.reset();

        if self.elapsed() > self.config.time_budget {
            log::info!(
                "time budget of {:?} used after {} restarts",
                self.config.time_budget,
                self.restarts
            );
            self.state = SearchState::Stopped;
        }

        Ok(Some(outcome))
    }

    fn persist(&mut self) -> Result<()> {
        let _t = Timed::start("writing mesh");
        let snapshot = self.engine.snapshot();
        self.sink.save(&self.config.output_path, &snapshot)
    }

    /// Starts the search and runs restarts until the budget is spent.
    pub fn run(&mut self, objects: &ObjectSet) -> Result<SearchReport> {
        self.start(objects)?;
        while self.step()?.is_some() {}
        Ok(self.report())
    }
}
