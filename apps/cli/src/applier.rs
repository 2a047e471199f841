//! Atomic file materialization from the fetched block pool.

use patch_core::{Error, Manifest, Result};
use patch_fetch::BlockPool;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Apply every file named in `files_to_patch`, reading their block
/// sequences from `manifest` and their bytes from `pool`. Each file is
/// written through a temp-file-plus-rename so a crash mid-apply never
/// leaves a partially-written file at its final path.
pub fn apply_files(
    install_dir: &Path,
    manifest: &Manifest,
    pool: &BlockPool,
    files_to_patch: &[String],
) -> Result<()> {
    for rel_path in files_to_patch {
        apply_one_file(install_dir, manifest, pool, rel_path)?;
    }
    Ok(())
}

fn apply_one_file(install_dir: &Path, manifest: &Manifest, pool: &BlockPool, rel_path: &str) -> Result<()> {
    let record = manifest.files.get(rel_path).ok_or_else(|| Error::Other(format!(
        "file {rel_path} scheduled for patching but absent from manifest"
    )))?;

    let final_path = install_dir.join(rel_path);
    let dest_dir = final_path.parent().unwrap_or(install_dir);
    fs::create_dir_all(dest_dir).map_err(|e| Error::Io {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    let mut temp = tempfile::Builder::new()
        .prefix(".patchkit-tmp-")
        .tempfile_in(dest_dir)
        .map_err(|e| Error::Io {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;

    let write_result = (|| -> Result<()> {
        for hash in &record.blocks {
            let bytes = pool.get(hash).ok_or_else(|| Error::MissingBlock { hash: hash.to_hex() })?;
            temp.write_all(bytes).map_err(|e| Error::Io {
                path: final_path.clone(),
                source: e,
            })?;
        }
        Ok(())
    })();

    if let Err(err) = write_result {
        // `temp` drops here, unlinking the temp file.
        return Err(err);
    }

    if final_path.exists() {
        fs::remove_file(&final_path).map_err(|e| Error::Io {
            path: final_path.clone(),
            source: e,
        })?;
    }

    temp.persist(&final_path).map_err(|e| Error::Io {
        path: final_path.clone(),
        source: e.error,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use patch_core::FileRecord;
    use tempfile::tempdir;

    fn h(byte: u8) -> patch_core::Hash {
        patch_core::Hash::from_bytes([byte; 32])
    }

    #[test]
    fn applies_blocks_in_order_and_is_idempotent() {
        let root = tempdir().unwrap();
        let install = root.path().join("install");
        fs::create_dir_all(&install).unwrap();

        let mut manifest = Manifest::empty();
        manifest
            .files
            .insert("nested/foo.txt".to_string(), FileRecord::new(vec![h(1), h(2)]));

        let mut pool = BlockPool::new();
        pool.insert(h(1), b"hello ".to_vec());
        pool.insert(h(2), b"world".to_vec());

        apply_files(&install, &manifest, &pool, &["nested/foo.txt".to_string()]).unwrap();
        let written = fs::read(install.join("nested/foo.txt")).unwrap();
        assert_eq!(written, b"hello world");

        // Re-applying (property 7: apply idempotence) reproduces the
        // identical bytes rather than appending or erroring.
        apply_files(&install, &manifest, &pool, &["nested/foo.txt".to_string()]).unwrap();
        let written_again = fs::read(install.join("nested/foo.txt")).unwrap();
        assert_eq!(written_again, b"hello world");
    }

    #[test]
    fn missing_block_in_pool_errors_and_leaves_no_temp_file() {
        let root = tempdir().unwrap();
        let install = root.path().join("install");
        fs::create_dir_all(&install).unwrap();

        let mut manifest = Manifest::empty();
        manifest
            .files
            .insert("foo.txt".to_string(), FileRecord::new(vec![h(1)]));
        let pool = BlockPool::new();

        let err = apply_files(&install, &manifest, &pool, &["foo.txt".to_string()]).unwrap_err();
        assert!(matches!(err, Error::MissingBlock { .. }));
        assert!(!install.join("foo.txt").exists());
        assert_eq!(fs::read_dir(&install).unwrap().count(), 0);
    }
}
