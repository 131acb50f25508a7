use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::errors::{Result, SealError};
use crate::core::models::recipient_set::RecipientSet;
use crate::core::traits::cipher::CipherBackend;

/// Loads key-ring files and merges them into one `RecipientSet`.
pub struct KeyRingLoader<'a, C: CipherBackend> {
    pub cipher: &'a C,
}

impl<'a, C: CipherBackend> KeyRingLoader<'a, C> {
    pub fn new(cipher: &'a C) -> Self {
        Self { cipher }
    }

    /// Read and parse every file in `key_files`, in order.
    ///
    /// Identities are concatenated without deduplication. Any unreadable
    /// or unparsable file fails the whole load.
    pub fn load<P: AsRef<Path>>(&self, key_files: &[P]) -> Result<RecipientSet<C::Recipient>> {
        if key_files.is_empty() {
            return Err(SealError::NoRecipients);
        }

        let mut recipients = Vec::new();
        let mut sources = Vec::with_capacity(key_files.len());

        for path in key_files {
            let path = path.as_ref();
            let contents = std::fs::read(path).map_err(|e| SealError::KeyLoadFailure {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;

            let parsed = self.cipher.parse_key_ring(path, &contents)?;
            if parsed.is_empty() {
                return Err(SealError::KeyLoadFailure {
                    path: path.to_path_buf(),
                    detail: "no keys found in file".into(),
                });
            }

            debug!(path = %path.display(), keys = parsed.len(), "loaded key ring");
            recipients.extend(parsed);
            sources.push(PathBuf::from(path));
        }

        Ok(RecipientSet::new(recipients, sources))
    }
}
