use std::path::{Path, PathBuf};

/// The union of every loaded key ring, in load order.
///
/// Built once per batch by the key-ring loader and never mutated after,
/// so workers share it by reference without locking. Duplicates are kept.
#[derive(Debug, Clone)]
pub struct RecipientSet<R> {
    recipients: Vec<R>,
    sources: Vec<PathBuf>,
}

impl<R> RecipientSet<R> {
    pub(crate) fn new(recipients: Vec<R>, sources: Vec<PathBuf>) -> Self {
        Self {
            recipients,
            sources,
        }
    }

    pub fn as_slice(&self) -> &[R] {
        &self.recipients
    }

    pub fn len(&self) -> usize {
        self.recipients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Key-ring files the set was assembled from.
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.sources.iter().map(PathBuf::as_path)
    }
}
