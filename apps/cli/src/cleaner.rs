//! Post-apply cleanup: removes files no longer present in the manifest,
//! updates the changelog for files that remain, and prunes empty
//! directories. Mirrors the producer side's bounded worker pool, capped
//! higher here since cleanup is read-mostly I/O rather than CPU-bound
//! chunking.

use patch_core::{Changelog, Manifest, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Upper bound on concurrent cleanup workers (spec §5).
pub const MAX_CLEANER_WORKERS: usize = 20;

fn is_ds_store(path: &Path) -> bool {
    path.file_name()
        .map(|n| n == ".DS_Store")
        .unwrap_or(false)
}

/// Walk `install_dir` bottom-up: delete files absent from `manifest.files`
/// (updating `changelog` accordingly), record fresh metadata for files
/// that remain, then remove any directory left empty.
pub fn clean(install_dir: &Path, manifest: &Manifest, changelog: &mut Changelog) -> Result<()> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in walkdir::WalkDir::new(install_dir).contents_first(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "failed to walk entry during cleanup");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            dirs.push(entry.path().to_path_buf());
        } else if entry.file_type().is_file() {
            files.push(entry.path().to_path_buf());
        }
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(MAX_CLEANER_WORKERS.max(1))
        .build()
        .expect("failed to build cleaner thread pool");

    let outcomes: Vec<(String, bool)> = pool.install(|| {
        files
            .par_iter()
            .filter_map(|path| classify_file(install_dir, path, manifest))
            .collect()
    });

    for (rel_path, keep) in outcomes {
        if keep {
            if let Err(err) = changelog.update(install_dir, &rel_path) {
                tracing::warn!(path = %rel_path, error = %err, "failed to update changelog entry");
            }
        } else {
            changelog.remove(&rel_path);
        }
    }

    for dir in dirs {
        delete_if_empty(&dir);
    }

    Ok(())
}

/// Returns `(relative_path, keep)` for a file, or `None` for `.DS_Store`
/// entries (left untouched either way).
fn classify_file(install_dir: &Path, path: &Path, manifest: &Manifest) -> Option<(String, bool)> {
    if is_ds_store(path) {
        return None;
    }
    let rel_path = patch_chunker::relative_posix_path(install_dir, path);
    if manifest.files.contains_key(&rel_path) {
        Some((rel_path, true))
    } else {
        if let Err(err) = std::fs::remove_file(path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %err, "failed to remove stale file");
            }
        }
        Some((rel_path, false))
    }
}

fn delete_if_empty(dir: &PathBuf) {
    if let Ok(mut entries) = std::fs::read_dir(dir) {
        if entries.next().is_none() {
            let _ = std::fs::remove_dir(dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patch_core::FileRecord;
    use std::fs;
    use tempfile::tempdir;

    fn h(byte: u8) -> patch_core::Hash {
        patch_core::Hash::from_bytes([byte; 32])
    }

    #[test]
    fn removes_stale_file_and_empty_directory() {
        let root = tempdir().unwrap();
        let install = root.path().join("install");
        fs::create_dir_all(install.join("stale_dir")).unwrap();
        fs::write(install.join("stale_dir/old.txt"), b"gone").unwrap();
        fs::write(install.join("keep.txt"), b"stays").unwrap();

        let mut manifest = Manifest::empty();
        manifest
            .files
            .insert("keep.txt".to_string(), FileRecord::new(vec![h(1)]));

        let app_data = root.path().join("data");
        let mut changelog = Changelog::load(&app_data);
        clean(&install, &manifest, &mut changelog).unwrap();

        assert!(!install.join("stale_dir/old.txt").exists());
        assert!(!install.join("stale_dir").exists());
        assert!(install.join("keep.txt").exists());
        assert!(changelog.is_valid(&install, "keep.txt"));
    }

    #[test]
    fn ds_store_is_never_touched() {
        let root = tempdir().unwrap();
        let install = root.path().join("install");
        fs::create_dir_all(&install).unwrap();
        fs::write(install.join(".DS_Store"), b"finder metadata").unwrap();

        let manifest = Manifest::empty();
        let app_data = root.path().join("data");
        let mut changelog = Changelog::load(&app_data);
        clean(&install, &manifest, &mut changelog).unwrap();

        assert!(install.join(".DS_Store").exists());
    }
}
