use std::path::PathBuf;

use serde::Serialize;

/// All domain errors for sealdir.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error(
        "Invalid path {path}: {detail}\n\n  \
         The source must be an existing directory.\n  \
         The target is created when missing, but must be a directory if it exists."
    )]
    InvalidInputPath { path: PathBuf, detail: String },

    #[error(
        "Failed to load key ring {path}: {detail}\n\n  \
         Check that the file exists and contains an exported public key.\n  \
         No files were encrypted."
    )]
    KeyLoadFailure { path: PathBuf, detail: String },

    #[error(
        "No recipients configured\n\n  \
         Solutions:\n    \
         → Pass one or more public keys: sealdir encrypt --key <file> ...\n    \
         → Or list them under [keys] recipients in sealdir.toml"
    )]
    NoRecipients,

    #[error("Failed to scan {path}: {detail}\n\n  No files were encrypted.")]
    DiscoveryFailure { path: PathBuf, detail: String },

    #[error("I/O error on {path}: {detail}")]
    TaskIo { path: PathBuf, detail: String },

    #[error("Encryption failed for {path}: {reason}")]
    EncryptionFailed { path: PathBuf, reason: String },

    #[error("{path} maps to the same target as {winner}; it was not encrypted")]
    TargetCollision { path: PathBuf, winner: PathBuf },

    #[error(
        "Decryption failed: no matching key found\n\n  \
         The private key is not among the recipients of this file.\n  \
         Check that you passed the secret half of one of the encryption keys."
    )]
    DecryptionNoKey,

    #[error("Decryption failed: {reason}")]
    DecryptionFailed { reason: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error("{failed} of {total} file(s) could not be encrypted")]
    BatchIncomplete { failed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Classification of a per-file failure, recorded in the batch report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TaskIo,
    Encryption,
    TargetCollision,
}

impl SealError {
    /// Whether this error aborts a run before any file is processed.
    pub fn is_fatal(&self) -> bool {
        self.failure_kind().is_none()
    }

    /// The per-file classification, or `None` for run-level errors.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            SealError::TaskIo { .. } => Some(FailureKind::TaskIo),
            SealError::EncryptionFailed { .. } => Some(FailureKind::Encryption),
            SealError::TargetCollision { .. } => Some(FailureKind::TargetCollision),
            _ => None,
        }
    }

    /// Build a `TaskIo` error for `path` from an I/O error.
    pub fn task_io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        SealError::TaskIo {
            path: path.into(),
            detail: err.to_string(),
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SealError>;
