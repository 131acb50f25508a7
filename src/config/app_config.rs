use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::errors::{Result, SealError};
use crate::core::services::encryption_engine::DEFAULT_CHUNK_SIZE;

/// Name of the project-local config file.
pub const LOCAL_CONFIG_FILE: &str = "sealdir.toml";

/// Largest accepted streaming chunk size (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Cipher backends this build knows about.
pub const KNOWN_CIPHERS: &[&str] = &["pgp", "age"];

/// Top-level sealdir configuration.
///
/// Every section is optional; a missing file is the same as an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub sealdir: SealdirSection,
    pub keys: KeysSection,
}

/// The `[sealdir]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SealdirSection {
    pub cipher: String,
    /// Worker pool size. Defaults to the available parallelism.
    pub concurrency: Option<usize>,
    pub chunk_size: usize,
}

impl Default for SealdirSection {
    fn default() -> Self {
        Self {
            cipher: "pgp".into(),
            concurrency: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// The `[keys]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeysSection {
    /// Key-ring files, relative paths resolved against the config file.
    pub recipients: Vec<PathBuf>,
}

impl AppConfig {
    /// Resolve and load the configuration.
    ///
    /// Order: `explicit` (must exist), `./sealdir.toml`, then
    /// `<config_dir>/sealdir/config.toml`. When none exists the built-in
    /// defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(SealError::InvalidConfig {
                    detail: format!("config file {} not found", path.display()),
                });
            }
            return Self::load_from(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.is_file() {
            return Self::load_from(&local);
        }

        if let Some(global) = Self::global_path() {
            if global.is_file() {
                return Self::load_from(&global);
            }
        }

        Ok(Self::default())
    }

    /// Per-user config location: `<config_dir>/sealdir/config.toml`.
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("sealdir").join("config.toml"))
    }

    /// Parse and validate one config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| SealError::InvalidConfig {
            detail: format!("Failed to parse {}: {e}", path.display()),
        })?;

        if let Some(base) = path.parent() {
            config.keys.recipients = config
                .keys
                .recipients
                .into_iter()
                .map(|p| if p.is_relative() { base.join(p) } else { p })
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and the cipher name.
    pub fn validate(&self) -> Result<()> {
        validate_cipher(&self.sealdir.cipher)?;

        if self.sealdir.concurrency == Some(0) {
            return Err(SealError::InvalidConfig {
                detail: "concurrency must be at least 1".into(),
            });
        }

        if self.sealdir.chunk_size == 0 || self.sealdir.chunk_size > MAX_CHUNK_SIZE {
            return Err(SealError::InvalidConfig {
                detail: format!(
                    "chunk_size must be between 1 and {MAX_CHUNK_SIZE} bytes, got {}",
                    self.sealdir.chunk_size
                ),
            });
        }

        Ok(())
    }

    /// Configured key rings followed by `extra`, order preserved.
    pub fn key_files(&self, extra: &[PathBuf]) -> Vec<PathBuf> {
        self.keys
            .recipients
            .iter()
            .chain(extra)
            .cloned()
            .collect()
    }
}

/// Reject cipher names this build cannot serve.
pub fn validate_cipher(cipher: &str) -> Result<()> {
    if KNOWN_CIPHERS.contains(&cipher) {
        Ok(())
    } else {
        Err(SealError::InvalidConfig {
            detail: format!("Unknown cipher backend: '{cipher}'. Use 'pgp' or 'age'."),
        })
    }
}
