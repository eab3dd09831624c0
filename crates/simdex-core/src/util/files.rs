//! File utilities for persisted index artifacts.
//!
//! Artifacts are never written in place. New contents go to a temporary
//! file in the same directory, which is synced and then renamed over the
//! target, so a crash or a failed write leaves the previous copy intact.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// Atomically replace `path` with `contents`.
///
/// Creates the parent directory if needed. On any failure the existing
/// file at `path` (if any) is left untouched.
///
/// # Example
///
/// ```
/// use simdex_core::util::files::write_atomic;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("metadata.json");
/// write_atomic(&path, b"{}").unwrap();
/// assert_eq!(std::fs::read(&path).unwrap(), b"{}");
/// ```
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| Error::io_with_path(e, parent))?;
    tmp.write_all(contents)
        .map_err(|e| Error::io_with_path(e, tmp.path()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io_with_path(e, path))?;
    tmp.persist(path)
        .map_err(|e| Error::io_with_path(e.error, path))?;

    Ok(())
}
