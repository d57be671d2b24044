//! Packs N copies of one or more 3D meshes into as small a volume as
//! possible within a wall-clock budget.
//!
//! The crate is organised around a best-of-restarts search:
//!
//! - **Object setup** ([`object`]): turns `count mesh count mesh ...`
//!   tokens into [`ObjectDescriptor`]s and derives the perturbation scale
//!   from their summed bounding-box volume.
//! - **Packing engine** ([`engine`]): the [`PackingEngine`] contract and a
//!   reference [`PackingModel`] built on the generic [`sa`] runner.
//! - **Persistence** ([`persist`]): [`PersistenceSink`] and an atomic
//!   binary-STL [`StlSink`].
//! - **Search** ([`search`]): the [`SearchOrchestrator`] state machine
//!   that keeps the best packing ever written and stops between
//!   restarts once the time budget is spent.
//!
//! # Example
//!
//! ```no_run
//! use pack3d::{setup_objects, Mesh, PackingModel, PackingModelConfig, RotationPolicy};
//! use pack3d::{SearchConfig, SearchOrchestrator, StlSink};
//! use std::time::Duration;
//!
//! let objects = setup_objects(
//!     ["10", "bracket.stl", "2", "housing.stl"],
//!     RotationPolicy::parse("1,1,1,0")?,
//!     |path| Mesh::load(path),
//! )?;
//! let engine = PackingModel::new(PackingModelConfig::default())?;
//! let config = SearchConfig::default().with_time_budget(Duration::from_secs(60));
//! let report = SearchOrchestrator::new(engine, StlSink, config).run(&objects)?;
//! println!("{} restarts, best {}", report.restarts, report.best_energy);
//! # Ok::<(), pack3d::Error>(())
//! ```

pub mod engine;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod object;
pub mod persist;
pub mod progress;
pub mod sa;
pub mod search;

pub use engine::{PackingEngine, PackingModel, PackingModelConfig};
pub use error::{Error, Result};
pub use mesh::Mesh;
pub use object::{setup_objects, ObjectDescriptor, ObjectSet, ObjectSetBuilder, RotationPolicy};
pub use persist::{PersistenceSink, StlSink};
pub use search::{PersistencePolicy, SearchConfig, SearchOrchestrator, SearchReport};
