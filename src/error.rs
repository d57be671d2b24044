//! Crate-wide error type.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up or running a packing search.
#[derive(Debug, Error)]
pub enum Error {
    /// The command surface was unusable: no mesh given, a malformed
    /// rotation entry, or a non-positive replication count.
    #[error("configuration error: {0}")]
    Config(String),

    /// A mesh reference could not be read or parsed.
    #[error("failed to load mesh {path}: {source}")]
    GeometryLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing an improved packing to disk failed.
    #[error("failed to write packing to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tuning configuration was rejected by `validate()`.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
