//! Best-of-restarts search.
//!
//! A single annealing pass can get trapped in a poor local optimum, so
//! each pass is treated as a disposable trial. Only the best artifact
//! ever produced is kept, on disk; the engine always restarts from a new
//! random arrangement.

mod clock;
mod config;
mod runner;

pub use clock::{Clock, MonotonicClock};
pub use config::{
    PersistencePolicy, SearchConfig, ANNEALING_ITERATIONS, DEFAULT_OUTPUT_PATH,
    DEFAULT_TIME_BUDGET_SECS,
};
pub use runner::{RestartOutcome, SearchOrchestrator, SearchReport, SearchState};
