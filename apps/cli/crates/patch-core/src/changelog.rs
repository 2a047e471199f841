//! The local changelog: per-file `(size, lastMod)` bookkeeping used to
//! detect tampering between apply operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Error, Result};

/// Recorded size/mtime for one installed file, both stored as stringified
/// decimals to match the source tool's textual representation exactly
/// (see DESIGN.md for the mtime rendering decision).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub size: String,
    #[serde(rename = "lastMod")]
    pub last_mod: String,
}

/// Maps relative install path to recorded metadata; persisted as
/// `changelog.json` under the install root's `data/` directory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Changelog {
    #[serde(flatten)]
    entries: BTreeMap<String, FileMetadata>,
    #[serde(skip)]
    path: PathBuf,
}

fn skip_ds_store(path: &str) -> bool {
    path.contains(".DS_Store")
}

impl Changelog {
    /// Load the changelog from `<app_data_path>/changelog.json`, or start
    /// empty if it doesn't exist or fails to parse.
    pub fn load(app_data_path: &Path) -> Self {
        let path = app_data_path.join("changelog.json");
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self { entries, path }
    }

    /// Persist the changelog back to disk, creating parent directories as
    /// needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string(&self.entries)?;
        fs::write(&self.path, body)?;
        Ok(())
    }

    /// True iff every recorded (non-`.DS_Store`) entry's file exists on
    /// disk and its current size/mtime string-match the recorded values.
    pub fn validate_current_installation(&self, install_dir: &Path) -> bool {
        self.entries
            .keys()
            .filter(|path| !skip_ds_store(path))
            .all(|path| self.is_valid(install_dir, path))
    }

    /// True iff `rel_path`'s current on-disk metadata matches the stored
    /// entry; false if missing on disk or not recorded.
    pub fn is_valid(&self, install_dir: &Path, rel_path: &str) -> bool {
        let Some(stored) = self.entries.get(rel_path) else {
            return false;
        };
        let file_path = install_dir.join(rel_path);
        match file_metadata(&file_path) {
            Ok(current) => current == *stored,
            Err(_) => false,
        }
    }

    /// Record fresh size/mtime for a file that remains installed.
    pub fn update(&mut self, install_dir: &Path, rel_path: &str) -> Result<()> {
        if skip_ds_store(rel_path) {
            return Ok(());
        }
        let file_path = install_dir.join(rel_path);
        let metadata = file_metadata(&file_path)?;
        self.entries.insert(rel_path.to_string(), metadata);
        Ok(())
    }

    /// Drop a file that is no longer part of the installation.
    pub fn remove(&mut self, rel_path: &str) {
        self.entries.remove(rel_path);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn file_metadata(path: &Path) -> Result<FileMetadata> {
    let meta = fs::metadata(path).map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let size = meta.len().to_string();
    let last_mod = format_mtime(meta.modified().map_err(|e| Error::Io {
        path: path.to_path_buf(),
        source: e,
    })?);
    Ok(FileMetadata { size, last_mod })
}

/// Render a modification time the way the source tool's `os.path.getmtime`
/// textual form does: seconds since epoch as a decimal, with sub-second
/// precision when present. This must be stable across repeated stats of
/// the same unmodified file, which is all `validate` requires.
fn format_mtime(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => {
            let secs = d.as_secs();
            let nanos = d.subsec_nanos();
            if nanos == 0 {
                format!("{secs}.0")
            } else {
                format!("{}.{:09}", secs, nanos).trim_end_matches('0').to_string()
            }
        }
        Err(_) => "0.0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn update_then_validate_round_trips() {
        let root = tempdir().unwrap();
        let app_data = root.path().join("data");
        let install = root.path().join("install");
        fs::create_dir_all(&install).unwrap();
        fs::write(install.join("foo.txt"), b"hello").unwrap();

        let mut log = Changelog::load(&app_data);
        log.update(&install, "foo.txt").unwrap();
        assert!(log.validate_current_installation(&install));

        log.save().unwrap();
        let reloaded = Changelog::load(&app_data);
        assert!(reloaded.validate_current_installation(&install));
    }

    #[test]
    fn tampering_is_detected() {
        let root = tempdir().unwrap();
        let app_data = root.path().join("data");
        let install = root.path().join("install");
        fs::create_dir_all(&install).unwrap();
        fs::write(install.join("foo.txt"), b"hello").unwrap();

        let mut log = Changelog::load(&app_data);
        log.update(&install, "foo.txt").unwrap();
        assert!(log.validate_current_installation(&install));

        // Different length changes size.
        fs::write(install.join("foo.txt"), b"hello world, much longer now").unwrap();
        assert!(!log.validate_current_installation(&install));
    }

    #[test]
    fn missing_file_is_invalid() {
        let root = tempdir().unwrap();
        let app_data = root.path().join("data");
        let install = root.path().join("install");
        fs::create_dir_all(&install).unwrap();
        fs::write(install.join("foo.txt"), b"hello").unwrap();

        let mut log = Changelog::load(&app_data);
        log.update(&install, "foo.txt").unwrap();
        fs::remove_file(install.join("foo.txt")).unwrap();
        assert!(!log.validate_current_installation(&install));
    }

    #[test]
    fn ds_store_entries_are_skipped() {
        let root = tempdir().unwrap();
        let app_data = root.path().join("data");
        let install = root.path().join("install");
        fs::create_dir_all(&install).unwrap();

        let mut log = Changelog::load(&app_data);
        // Never written to disk; would fail validation if not skipped.
        log.update(&install, ".DS_Store").ok();
        assert!(log.validate_current_installation(&install));
    }

    #[test]
    fn remove_drops_entry() {
        let root = tempdir().unwrap();
        let app_data = root.path().join("data");
        let install = root.path().join("install");
        fs::create_dir_all(&install).unwrap();
        fs::write(install.join("foo.txt"), b"hello").unwrap();

        let mut log = Changelog::load(&app_data);
        log.update(&install, "foo.txt").unwrap();
        log.remove("foo.txt");
        assert_eq!(log.len(), 0);
    }
}
