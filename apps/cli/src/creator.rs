//! Producer pipeline: chunk a source directory, optionally compress,
//! pack bundles, and write out a patch data set (`blocks/`, `bundles/`,
//! `patchData.json`, `version`, and optionally `dictionary`).

use patch_chunker::{scan_directory, ChunkerConfig};
use patch_core::{CompressionInfo, Error, Manifest, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Options controlling a single `create` invocation, mirroring the `create`
/// CLI subcommand's flags.
pub struct CreateOptions {
    pub block_size: u32,
    pub compress: bool,
    pub compression_level: i32,
    pub dict_path: Option<std::path::PathBuf>,
    pub regen_dict: bool,
    pub max_workers: usize,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            block_size: 65536,
            compress: false,
            compression_level: 5,
            dict_path: None,
            regen_dict: false,
            max_workers: 6,
        }
    }
}

/// Run the full producer pipeline, writing all output under `output_dir`.
/// `patch_data_dir` is the directory to load a prior `patchData.json` from
/// for bundle reuse (often the same as `output_dir`).
pub fn create_patch(
    source_dir: &Path,
    output_dir: &Path,
    patch_data_dir: &Path,
    options: &CreateOptions,
) -> Result<Manifest> {
    if !source_dir.is_dir() {
        return Err(Error::SourceDirectoryNotFound(source_dir.to_path_buf()));
    }
    if options.block_size == 0 {
        return Err(Error::InvalidBlockSize(options.block_size));
    }

    let chunker_config = ChunkerConfig::for_avg_size(options.block_size);
    let scan = scan_directory(source_dir, chunker_config, options.max_workers)
        .map_err(|e| Error::Io {
            path: source_dir.to_path_buf(),
            source: e,
        })?;

    if scan.files.is_empty() || scan.pool.is_empty() {
        return Err(Error::EmptySourceDirectory(source_dir.to_path_buf()));
    }

    // Preserve discovery order for deterministic bundle packing of
    // not-yet-bundled blocks.
    let pool_order: Vec<patch_core::Hash> = scan.pool.iter().map(|entry| *entry.key()).collect();
    let mut pool: BTreeMap<patch_core::Hash, Vec<u8>> = scan
        .pool
        .into_iter()
        .collect();

    let dict_path = options
        .dict_path
        .clone()
        .unwrap_or_else(|| output_dir.join("dictionary"));

    if options.compress {
        let raw_samples: Vec<Vec<u8>> = pool.values().cloned().collect();
        let sample_cap = if options.regen_dict {
            None
        } else {
            Some(patch_bundle::DEFAULT_SAMPLE_CAP)
        };
        let dict = patch_bundle::load_or_train_dict(&dict_path, &raw_samples, options.block_size, sample_cap)?;

        for bytes in pool.values_mut() {
            let compressed = patch_bundle::compress(bytes, &dict, options.compression_level)?;
            *bytes = compressed;
        }
    }

    write_block_files(&output_dir.join("blocks"), &pool)?;

    let prior = Manifest::load(patch_data_dir)?;
    let pack_result = patch_bundle::pack_bundles(&pool_order, &pool, prior.as_ref());
    patch_bundle::write_bundles(&output_dir.join("bundles"), &pack_result.payloads)?;

    let manifest = Manifest {
        compression: CompressionInfo {
            enabled: options.compress,
            level: options.compress.then_some(options.compression_level),
        },
        files: scan.files,
        bundles: pack_result.bundles,
    };
    manifest.save(output_dir)?;

    Ok(manifest)
}

/// Write every block in `pool` to `<dir>/<hash>`, then delete any file in
/// `dir` that isn't one of the pool's hashes.
fn write_block_files(dir: &Path, pool: &BTreeMap<patch_core::Hash, Vec<u8>>) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for (hash, bytes) in pool {
        let path = dir.join(hash.to_hex());
        fs::write(&path, bytes).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
    }

    let entries = fs::read_dir(dir).map_err(|e| Error::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name();
        let is_known = patch_core::Hash::from_hex(&name.to_string_lossy())
            .map(|h| pool.contains_key(&h))
            .unwrap_or(false);
        if !is_known {
            fs::remove_file(entry.path()).map_err(|e| Error::Io {
                path: entry.path(),
                source: e,
            })?;
        }
    }

    Ok(())
}
