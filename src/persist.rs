//! Persistence of improved packings.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes a snapshot to a fixed output path, replacing any earlier one.
pub trait PersistenceSink<G> {
    fn save(&mut self, path: &Path, geometry: &G) -> Result<()>;
}

/// Binary STL writer.
///
/// The mesh is written to a temporary file next to the target and then
/// renamed over it, so readers never observe a half-written artifact.
#[derive(Debug, Default, Clone, Copy)]
pub struct StlSink;

impl PersistenceSink<Mesh> for StlSink {
    fn save(&mut self, path: &Path, mesh: &Mesh) -> Result<()> {
        let persistence_error = |source| Error::Persistence {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let file = tempfile::NamedTempFile::new_in(dir).map_err(persistence_error)?;
        {
            let mut writer = BufWriter::new(file.as_file());
            mesh.write_stl(&mut writer).map_err(persistence_error)?;
            writer.flush().map_err(persistence_error)?;
        }
        file.as_file().sync_all().map_err(persistence_error)?;
        file.persist(path)
            .map_err(|e| persistence_error(e.error))?;
        Ok(())
    }
}
