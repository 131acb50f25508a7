use std::path::{Component, Path};

use crate::adapters::cipher::age_backend::AgeBackend;
use crate::adapters::cipher::pgp_backend::PgpBackend;
use crate::cli::output;
use crate::config::app_config::{AppConfig, validate_cipher};
use crate::core::errors::{Result, SealError};
use crate::core::services::directory_provisioner::DirectoryProvisioner;
use crate::core::traits::cipher::CipherBackend;

/// Execute the `sealdir decrypt` command.
///
/// Decrypts one envelope with the private key at `key` and writes the
/// plaintext to `<target>/<name>`, creating `target` if needed.
pub fn execute(
    config: &AppConfig,
    cipher: Option<&str>,
    key: &Path,
    file: &Path,
    target: &Path,
    name: &str,
) -> Result<()> {
    let cipher = cipher.unwrap_or(&config.sealdir.cipher);
    validate_cipher(cipher)?;
    validate_file_name(name)?;

    if !file.is_file() {
        return Err(SealError::InvalidInputPath {
            path: file.to_path_buf(),
            detail: "encrypted file not found".into(),
        });
    }
    if !key.is_file() {
        return Err(SealError::InvalidInputPath {
            path: key.to_path_buf(),
            detail: "private key file not found".into(),
        });
    }

    match cipher {
        "pgp" => decrypt_with(&PgpBackend::new(), key, file, target, name),
        "age" => decrypt_with(&AgeBackend::new(), key, file, target, name),
        other => Err(SealError::InvalidConfig {
            detail: format!("Unknown cipher backend: '{other}'. Use 'pgp' or 'age'."),
        }),
    }
}

/// Decrypt with a given backend.
fn decrypt_with<C: CipherBackend>(
    cipher: &C,
    key: &Path,
    file: &Path,
    target: &Path,
    name: &str,
) -> Result<()> {
    output::header(&format!("Decrypting with {}", cipher.name()));
    output::detail(&format!("Source: {}", file.display()));

    let ciphertext = std::fs::read(file)?;
    let plaintext = cipher.decrypt(key, &ciphertext)?;

    DirectoryProvisioner.ensure(target)?;
    let dest = target.join(name);
    output::detail(&format!("Destination: {}", dest.display()));
    std::fs::write(&dest, &plaintext)?;

    output::success(&format!(
        "Decrypted {} ({} bytes)",
        file.display(),
        plaintext.len()
    ));
    Ok(())
}

/// The output name must be a single plain path segment.
fn validate_file_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(SealError::InvalidConfig {
            detail: format!("Invalid output name '{name}': must be a plain file name"),
        }),
    }
}
