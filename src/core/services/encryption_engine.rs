use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use crate::core::errors::{Result, SealError};
use crate::core::models::file_task::EncryptedEnvelope;
use crate::core::models::recipient_set::RecipientSet;
use crate::core::traits::cipher::CipherBackend;

/// Default streaming chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Streams plaintext through a backend's encrypt-then-armor writer stack.
pub struct EncryptionEngine<'a, C: CipherBackend> {
    cipher: &'a C,
    chunk_size: usize,
}

impl<'a, C: CipherBackend> EncryptionEngine<'a, C> {
    pub fn new(cipher: &'a C, chunk_size: usize) -> Self {
        Self {
            cipher,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Encrypt everything `plaintext` yields into one armored envelope.
    ///
    /// Each call owns its chunk buffer and output sink. On any error the
    /// partial envelope is dropped; read errors are `TaskIo`, everything
    /// else is `EncryptionFailed`, both tagged with `source`.
    pub fn encrypt<R: Read>(
        &self,
        source: &Path,
        recipients: &RecipientSet<C::Recipient>,
        mut plaintext: R,
    ) -> Result<EncryptedEnvelope> {
        let failed = |stage: &str, e: std::io::Error| SealError::EncryptionFailed {
            path: source.to_path_buf(),
            reason: format!("{stage}: {e}"),
        };

        let mut sink = Vec::new();
        let mut writer = self
            .cipher
            .envelope_writer(recipients.as_slice(), &mut sink)
            .map_err(|e| failed("writer setup failed", e))?;

        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            let n = match plaintext.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SealError::task_io(source, &e)),
            };
            writer
                .write_all(&chunk[..n])
                .map_err(|e| failed("write failed", e))?;
        }

        writer.finish().map_err(|e| failed("finalize failed", e))?;

        Ok(EncryptedEnvelope::new(sink))
    }
}
