use std::path::Path;

use crate::core::errors::{Result, SealError};

/// Creates target directories on demand.
pub struct DirectoryProvisioner;

impl DirectoryProvisioner {
    /// Create `path` and any missing parents. Succeeds if it already exists.
    ///
    /// Fails with `TaskIo` when `path` (or a parent) exists as a
    /// non-directory, or the directory cannot be created.
    pub fn ensure(&self, path: &Path) -> Result<()> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => return Ok(()),
            Ok(_) => {
                return Err(SealError::TaskIo {
                    path: path.to_path_buf(),
                    detail: "exists but is not a directory".into(),
                });
            }
            Err(_) => {}
        }

        std::fs::create_dir_all(path).map_err(|e| SealError::task_io(path, &e))
    }
}
