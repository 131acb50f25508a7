use std::ffi::OsString;
use std::path::PathBuf;

/// A plaintext file found under the source root.
///
/// `relative_path` is the path below the source root; it is what gets
/// mirrored under the target root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
}

/// Where the envelope for one task is written.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetLocation {
    pub directory: PathBuf,
    pub file_name: OsString,
}

impl TargetLocation {
    /// Full path of the envelope file.
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Armored ciphertext of one source file, held fully in memory
/// until it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    bytes: Vec<u8>,
}

impl EncryptedEnvelope {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

