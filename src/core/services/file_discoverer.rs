use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::core::errors::{Result, SealError};
use crate::core::models::file_task::FileTask;

/// Walks a source tree and yields plaintext candidates.
///
/// Directories are never yielded, and neither is any path (relative to the
/// root) containing `.<marker>`, so encrypted output is never picked up
/// again. Walk order is filesystem-dependent.
pub struct FileDiscoverer<'a> {
    marker: &'a str,
}

impl<'a> FileDiscoverer<'a> {
    pub fn new(marker: &'a str) -> Self {
        Self { marker }
    }

    /// Lazily walk `root`. Each item is a task or the error that stopped
    /// the walk.
    pub fn discover(&self, root: &Path) -> Discovery {
        Discovery {
            root: root.to_path_buf(),
            needle: format!(".{}", self.marker),
            walker: WalkDir::new(root).follow_links(false).into_iter(),
            failed: false,
        }
    }

    /// Walk `root` to completion. Any error discards the partial result.
    pub fn discover_all(&self, root: &Path) -> Result<Vec<FileTask>> {
        self.discover(root).collect()
    }
}

/// Lazy sequence of discovered tasks. Fused after the first error.
pub struct Discovery {
    root: PathBuf,
    needle: String,
    walker: walkdir::IntoIter,
    failed: bool,
}

impl Iterator for Discovery {
    type Item = Result<FileTask>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    self.failed = true;
                    let path = e.path().unwrap_or(self.root.as_path()).to_path_buf();
                    return Some(Err(SealError::DiscoveryFailure {
                        path,
                        detail: e.to_string(),
                    }));
                }
            };

            // Links are not followed, but a link to a directory is still
            // not a file to encrypt.
            if entry.file_type().is_dir() || (entry.path_is_symlink() && entry.path().is_dir()) {
                continue;
            }

            let source_path = entry.into_path();
            let relative_path = source_path
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| source_path.clone());

            if relative_path.to_string_lossy().contains(&self.needle) {
                continue;
            }

            return Some(Ok(FileTask {
                source_path,
                relative_path,
            }));
        }
    }
}
