use std::path::{Path, PathBuf};

use anyhow::Result;

/// Filesystem primitives used when persisting captures.
pub trait FileSystem: Send + Sync {
    /// Create `path` and any missing ancestors
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Write `data` to `path` so that readers see either the old contents or all of `data`.
    /// Nothing is left at `path` (or beside it) when this fails.
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Absolute, symlink-resolved form of an existing path
    fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}
