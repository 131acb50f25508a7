use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};

use crate::core::models::file_task::TargetLocation;

/// Maps a source file path to its envelope location under a target root.
///
/// Pure and total: no I/O, no errors. Volume prefixes, root markers and
/// `..` segments are dropped, so the result always stays below the target
/// root. The file's last extension is replaced by the marker extension.
pub struct PathMapper<'a> {
    marker: &'a str,
}

impl<'a> PathMapper<'a> {
    pub fn new(marker: &'a str) -> Self {
        Self { marker }
    }

    /// Compute the target directory and file name for `source`.
    pub fn map(&self, source: &Path, target_root: &Path) -> TargetLocation {
        let parent = source.parent().unwrap_or(Path::new(""));
        let mirrored = mirror_segment(parent);
        let directory = if mirrored.as_os_str().is_empty() {
            target_root.to_path_buf()
        } else {
            target_root.join(mirrored)
        };

        let mut file_name = source
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        file_name.push(".");
        file_name.push(self.marker);

        TargetLocation {
            directory,
            file_name,
        }
    }
}

/// Reduce a directory path to its plain named segments.
fn mirror_segment(dir: &Path) -> PathBuf {
    let mut mirrored = PathBuf::new();
    let mut first = true;

    for component in dir.components() {
        let Component::Normal(part) = component else {
            // Prefix, RootDir, CurDir, ParentDir
            continue;
        };

        if std::mem::take(&mut first) {
            if let Some(rest) = strip_volume(part) {
                if !rest.is_empty() {
                    mirrored.push(rest);
                }
                continue;
            }
        }
        mirrored.push(part);
    }

    mirrored
}

/// `C:` or `C:data` written on a platform without drive prefixes.
///
/// Only a single ASCII letter before the colon counts as a drive; other
/// names containing `:` are ordinary directories.
fn strip_volume(part: &OsStr) -> Option<OsString> {
    let text = part.to_str()?;
    let (drive, rest) = text.split_once(':')?;
    let mut letters = drive.chars();
    match (letters.next(), letters.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(OsString::from(rest)),
        _ => None,
    }
}
