use std::path::{Path, PathBuf};

use crate::adapters::cipher::age_backend::AgeBackend;
use crate::adapters::cipher::pgp_backend::PgpBackend;
use crate::cli::output;
use crate::config::app_config::{AppConfig, validate_cipher};
use crate::core::errors::{Result, SealError};
use crate::core::models::outcome::{BatchReport, Outcome, OutcomeStatus};
use crate::core::services::batch_coordinator::{
    BatchCoordinator, BatchOptions, default_concurrency,
};
use crate::core::traits::cipher::CipherBackend;

/// Arguments of `sealdir encrypt` after clap parsing.
pub struct EncryptArgs<'a> {
    pub source: &'a Path,
    pub target: &'a Path,
    pub keys: &'a [PathBuf],
    pub jobs: Option<usize>,
    pub json: bool,
}

/// Execute the `sealdir encrypt` command.
///
/// Resolves cipher, worker count and key rings from config and flags,
/// runs one batch, and fails with `BatchIncomplete` if any file failed.
pub fn execute(config: &AppConfig, cipher: Option<&str>, args: &EncryptArgs<'_>) -> Result<()> {
    let cipher = cipher.unwrap_or(&config.sealdir.cipher);
    validate_cipher(cipher)?;

    let concurrency = args
        .jobs
        .or(config.sealdir.concurrency)
        .unwrap_or_else(default_concurrency);
    if concurrency == 0 {
        return Err(SealError::InvalidConfig {
            detail: "--jobs must be at least 1".into(),
        });
    }

    let options = BatchOptions {
        concurrency,
        chunk_size: config.sealdir.chunk_size,
    };
    let key_files = config.key_files(args.keys);

    match cipher {
        "pgp" => encrypt_with(&PgpBackend::new(), options, &key_files, args),
        "age" => encrypt_with(&AgeBackend::new(), options, &key_files, args),
        other => Err(SealError::InvalidConfig {
            detail: format!("Unknown cipher backend: '{other}'. Use 'pgp' or 'age'."),
        }),
    }
}

/// Run the batch with a given backend and print the result.
fn encrypt_with<C: CipherBackend>(
    cipher: &C,
    options: BatchOptions,
    key_files: &[PathBuf],
    args: &EncryptArgs<'_>,
) -> Result<()> {
    if !args.json {
        output::header(&format!(
            "Encrypting {} with {}",
            args.source.display(),
            cipher.name()
        ));
        output::detail(&format!("Target: {}", args.target.display()));
        for key in key_files {
            output::detail(&format!("Key ring: {}", key.display()));
        }
        output::detail(&format!("Workers: {}", options.concurrency));
    }

    let pb = if args.json {
        indicatif::ProgressBar::hidden()
    } else {
        output::progress("Encrypting")
    };
    let observer = |outcome: &Outcome| {
        pb.inc(1);
        pb.set_message(outcome.source.display().to_string());
    };

    let result = BatchCoordinator::new(cipher, options).run(
        args.source,
        args.target,
        key_files,
        &observer,
    );
    pb.finish_and_clear();
    let report = result?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).map_err(std::io::Error::from)?;
        println!("{json}");
    } else {
        print_report(&report);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(SealError::BatchIncomplete {
            failed: report.failed(),
            total: report.total(),
        })
    }
}

/// One line per file, then a summary.
fn print_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.status {
            OutcomeStatus::Written { .. } => output::success(&format!(
                "{} → {}",
                outcome.source.display(),
                outcome.target.display()
            )),
            OutcomeStatus::SkippedExisting => output::warning(&format!(
                "Skipped {} ({} already exists)",
                outcome.source.display(),
                outcome.target.display()
            )),
            OutcomeStatus::Failed { message, .. } => output::error(message),
        }
    }

    let elapsed = report.finished_at - report.started_at;
    output::header("Summary");
    output::success(&format!(
        "{} written ({} bytes), {} skipped, {} failed in {:.2}s",
        report.written(),
        report.bytes_written(),
        report.skipped(),
        report.failed(),
        elapsed.num_milliseconds() as f64 / 1000.0
    ));
}
