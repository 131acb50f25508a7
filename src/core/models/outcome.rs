use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::errors::{FailureKind, SealError};

/// Terminal state of one file task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Envelope written; `bytes` is the envelope size.
    Written { bytes: u64 },
    /// Target already present, left untouched.
    SkippedExisting,
    Failed { kind: FailureKind, message: String },
}

/// Result of processing one discovered file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub source: PathBuf,
    pub target: PathBuf,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn written(source: PathBuf, target: PathBuf, bytes: u64) -> Self {
        Self {
            source,
            target,
            status: OutcomeStatus::Written { bytes },
        }
    }

    pub fn skipped(source: PathBuf, target: PathBuf) -> Self {
        Self {
            source,
            target,
            status: OutcomeStatus::SkippedExisting,
        }
    }

    /// Record a per-task error. Run-level errors never reach a task,
    /// but are filed as I/O failures if they do.
    pub fn failed(source: PathBuf, target: PathBuf, err: &SealError) -> Self {
        Self {
            source,
            target,
            status: OutcomeStatus::Failed {
                kind: err.failure_kind().unwrap_or(FailureKind::TaskIo),
                message: err.to_string(),
            },
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// Aggregated outcomes of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub cipher: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<Outcome>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::SkippedExisting))
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                OutcomeStatus::Written { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    /// True when no task failed. Skips count as success.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Outcome recorded for `source`, if it was part of the batch.
    #[cfg(test)]
    pub fn outcome_for(&self, source: &std::path::Path) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.source == source)
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}
