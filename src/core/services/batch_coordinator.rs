use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::errors::{Result, SealError};
use crate::core::models::file_task::{EncryptedEnvelope, FileTask, TargetLocation};
use crate::core::models::outcome::{BatchReport, Outcome, OutcomeStatus};
use crate::core::models::recipient_set::RecipientSet;
use crate::core::services::directory_provisioner::DirectoryProvisioner;
use crate::core::services::encryption_engine::{DEFAULT_CHUNK_SIZE, EncryptionEngine};
use crate::core::services::file_discoverer::FileDiscoverer;
use crate::core::services::key_ring_loader::KeyRingLoader;
use crate::core::services::path_mapper::PathMapper;
use crate::core::traits::cipher::CipherBackend;

/// Tuning knobs for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Worker pool size.
    pub concurrency: usize,
    /// Plaintext streaming chunk size in bytes.
    pub chunk_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Number of workers when none is configured.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// A discovered task together with its resolved destination.
struct PlannedTask {
    task: FileTask,
    location: TargetLocation,
}

/// Orchestrates one batch: keys → discovery → per-file encrypt and write.
///
/// Per-file errors are recorded in the report and never stop the batch.
/// Only input validation, key loading and discovery abort a run, and they
/// do so before any file is touched.
pub struct BatchCoordinator<'a, C: CipherBackend> {
    cipher: &'a C,
    options: BatchOptions,
}

impl<'a, C: CipherBackend> BatchCoordinator<'a, C> {
    pub fn new(cipher: &'a C, options: BatchOptions) -> Self {
        Self { cipher, options }
    }

    /// Encrypt every plaintext file under `source_root` into a mirrored tree
    /// under `target_root`, for every recipient in `key_files`.
    ///
    /// `observer` sees each outcome as soon as its task finishes, from the
    /// worker thread that produced it.
    pub fn run<P: AsRef<Path>>(
        &self,
        source_root: &Path,
        target_root: &Path,
        key_files: &[P],
        observer: &(dyn Fn(&Outcome) + Sync),
    ) -> Result<BatchReport> {
        validate_source(source_root)?;
        prepare_target(target_root)?;

        let recipients = KeyRingLoader::new(self.cipher).load(key_files)?;
        if recipients.is_empty() {
            return Err(SealError::NoRecipients);
        }
        let rings: Vec<String> = recipients
            .sources()
            .map(|p| p.display().to_string())
            .collect();
        info!(
            cipher = self.cipher.name(),
            recipients = recipients.len(),
            rings = ?rings,
            "recipient set ready"
        );

        self.execute(&recipients, source_root, target_root, observer)
    }

    fn execute(
        &self,
        recipients: &RecipientSet<C::Recipient>,
        source_root: &Path,
        target_root: &Path,
        observer: &(dyn Fn(&Outcome) + Sync),
    ) -> Result<BatchReport> {
        let started_at = Utc::now();
        let marker = self.cipher.marker_extension();

        let tasks = FileDiscoverer::new(marker).discover_all(source_root)?;
        debug!(source = %source_root.display(), files = tasks.len(), "discovery finished");

        let (planned, mut outcomes) = plan(tasks, target_root, marker);
        for outcome in &outcomes {
            log_outcome(outcome);
            observer(outcome);
        }

        outcomes.extend(self.fan_out(recipients, planned, observer)?);

        let report = BatchReport {
            cipher: self.cipher.name().to_string(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };
        info!(
            written = report.written(),
            skipped = report.skipped(),
            failed = report.failed(),
            "batch finished"
        );
        Ok(report)
    }

    /// Run every planned task on a bounded pool and collect exactly one
    /// outcome per task.
    fn fan_out(
        &self,
        recipients: &RecipientSet<C::Recipient>,
        planned: Vec<PlannedTask>,
        observer: &(dyn Fn(&Outcome) + Sync),
    ) -> Result<Vec<Outcome>> {
        let expected = planned.len();
        if expected == 0 {
            return Ok(Vec::new());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.concurrency.max(1))
            .thread_name(|i| format!("sealdir-worker-{i}"))
            .build()
            .map_err(|e| SealError::Io(std::io::Error::other(e)))?;

        // Sized to the task count: a send never blocks a worker.
        let (tx, rx) = mpsc::sync_channel::<Outcome>(expected);

        pool.scope(move |scope| {
            for item in planned {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = self.process(recipients, item);
                    log_outcome(&outcome);
                    observer(&outcome);
                    // The receiver outlives the scope.
                    let _ = tx.send(outcome);
                });
            }
        });

        let outcomes: Vec<Outcome> = rx.iter().take(expected).collect();
        debug_assert_eq!(outcomes.len(), expected);
        Ok(outcomes)
    }

    /// Mapped → SkippedExisting | Encrypting → Written | Failed.
    fn process(&self, recipients: &RecipientSet<C::Recipient>, item: PlannedTask) -> Outcome {
        let target = item.location.file_path();
        let source = item.task.source_path.clone();

        if target_present(&target) {
            return Outcome::skipped(source, target);
        }

        match self.encrypt_task(recipients, &item, &target) {
            Ok(Some(bytes)) => Outcome::written(source, target, bytes),
            Ok(None) => Outcome::skipped(source, target),
            Err(e) => Outcome::failed(source, target, &e),
        }
    }

    /// Returns the envelope size, or `None` if the target appeared while
    /// this task was encrypting.
    fn encrypt_task(
        &self,
        recipients: &RecipientSet<C::Recipient>,
        item: &PlannedTask,
        target: &Path,
    ) -> Result<Option<u64>> {
        DirectoryProvisioner.ensure(&item.location.directory)?;

        let source = &item.task.source_path;
        let file = File::open(source).map_err(|e| SealError::task_io(source, &e))?;

        let envelope = EncryptionEngine::new(self.cipher, self.options.chunk_size).encrypt(
            source,
            recipients,
            BufReader::new(file),
        )?;

        persist(&item.location.directory, target, &envelope, self.cipher.marker_extension())
    }
}

/// Source must be an existing directory.
fn validate_source(source_root: &Path) -> Result<()> {
    match std::fs::metadata(source_root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SealError::InvalidInputPath {
            path: source_root.to_path_buf(),
            detail: "source is not a directory".into(),
        }),
        Err(e) => Err(SealError::InvalidInputPath {
            path: source_root.to_path_buf(),
            detail: format!("source does not exist ({e})"),
        }),
    }
}

/// Create the target root when missing; reject it when it is a file.
fn prepare_target(target_root: &Path) -> Result<()> {
    DirectoryProvisioner
        .ensure(target_root)
        .map_err(|e| SealError::InvalidInputPath {
            path: target_root.to_path_buf(),
            detail: match e {
                SealError::TaskIo { detail, .. } => detail,
                other => other.to_string(),
            },
        })
}

/// Map every task and settle target collisions.
///
/// Tasks are ordered by relative path; the first task mapping to a target
/// keeps it and later ones fail with `TargetCollision`.
fn plan(
    mut tasks: Vec<FileTask>,
    target_root: &Path,
    marker: &str,
) -> (Vec<PlannedTask>, Vec<Outcome>) {
    tasks.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    let mapper = PathMapper::new(marker);
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::with_capacity(tasks.len());
    let mut planned = Vec::with_capacity(tasks.len());
    let mut collisions = Vec::new();

    for task in tasks {
        let location = mapper.map(&task.relative_path, target_root);
        let target = location.file_path();

        if let Some(winner) = claimed.get(&target) {
            let err = SealError::TargetCollision {
                path: task.source_path.clone(),
                winner: winner.clone(),
            };
            collisions.push(Outcome::failed(task.source_path, target, &err));
            continue;
        }

        claimed.insert(target, task.source_path.clone());
        planned.push(PlannedTask { task, location });
    }

    (planned, collisions)
}

/// Anything at the target path, including a dangling symlink, counts.
fn target_present(target: &Path) -> bool {
    std::fs::symlink_metadata(target).is_ok()
}

/// Write the whole envelope to a hidden sibling, then link it into place
/// without replacing an existing file.
fn persist(
    directory: &Path,
    target: &Path,
    envelope: &EncryptedEnvelope,
    marker: &str,
) -> Result<Option<u64>> {
    // The marker in the suffix keeps leftovers out of later discovery.
    let suffix = format!(".{marker}.part");
    let mut staged = tempfile::Builder::new()
        .prefix(".sealdir-")
        .suffix(&suffix)
        .tempfile_in(directory)
        .map_err(|e| SealError::task_io(directory, &e))?;

    staged
        .write_all(envelope.as_bytes())
        .and_then(|_| staged.flush())
        .map_err(|e| SealError::task_io(target, &e))?;

    match staged.persist_noclobber(target) {
        Ok(_) => Ok(Some(envelope.as_bytes().len() as u64)),
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(SealError::task_io(target, &e.error)),
    }
}

fn log_outcome(outcome: &Outcome) {
    let source = outcome.source.display();
    let target = outcome.target.display();
    match &outcome.status {
        OutcomeStatus::Written { bytes } => {
            info!(source = %source, target = %target, bytes, "encrypted")
        }
        OutcomeStatus::SkippedExisting => {
            debug!(source = %source, target = %target, "target exists, skipped")
        }
        OutcomeStatus::Failed { kind, message } => {
            warn!(source = %source, kind = ?kind, error = %message, "file not encrypted")
        }
    }
}
