//! Packing engines.
//!
//! [`PackingEngine`] is the contract the search orchestrator consumes.
//! [`PackingModel`] is the reference implementation: simulated annealing
//! (via [`crate::sa`]) over instance poses with bounding-box overlap
//! rejection.

mod config;
mod model;
mod types;

pub use config::PackingModelConfig;
pub use model::{Layout, PackingModel, PackingProblem, Placement};
pub use types::PackingEngine;
