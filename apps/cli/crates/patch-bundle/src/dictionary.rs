//! Zstandard dictionary training and block compression/decompression.

use patch_core::{Error, Result};
use rand::seq::SliceRandom;
use rand::thread_rng;
use std::fs;
use std::path::Path;

/// Sample cap used when training a dictionary without `regen_dict`.
pub const DEFAULT_SAMPLE_CAP: usize = 2000;

/// Load a dictionary from `dict_path` if it already exists; otherwise
/// train one from `samples` (raw, uncompressed block bytes) and write it
/// out. When `sample_cap` is `None`, every sample is used (the
/// `regen_dict` case); otherwise at most `sample_cap` samples are drawn
/// uniformly at random without replacement.
pub fn load_or_train_dict(
    dict_path: &Path,
    samples: &[Vec<u8>],
    block_size: u32,
    sample_cap: Option<usize>,
) -> Result<Vec<u8>> {
    if dict_path.exists() {
        return fs::read(dict_path).map_err(|e| Error::Io {
            path: dict_path.to_path_buf(),
            source: e,
        });
    }

    let training_set: Vec<&Vec<u8>> = match sample_cap {
        Some(cap) if samples.len() > cap => {
            let mut rng = thread_rng();
            samples.choose_multiple(&mut rng, cap).collect()
        }
        _ => samples.iter().collect(),
    };

    let dict_bytes = zstd::dict::from_samples(&training_set, block_size as usize)
        .map_err(|e| Error::Dictionary(e.to_string()))?;

    if let Some(parent) = dict_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(dict_path, &dict_bytes).map_err(|e| Error::Io {
        path: dict_path.to_path_buf(),
        source: e,
    })?;

    Ok(dict_bytes)
}

/// Compress `data` against `dictionary` at `level`.
pub fn compress(data: &[u8], dictionary: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut compressor =
        zstd::bulk::Compressor::with_dictionary(level, dictionary).map_err(|e| Error::Dictionary(e.to_string()))?;
    compressor
        .compress(data)
        .map_err(|e| Error::Dictionary(e.to_string()))
}

/// Decompress `data` against `dictionary`. `capacity_hint` bounds the
/// output buffer; pass the known uncompressed size when available.
pub fn decompress(data: &[u8], dictionary: &[u8], capacity_hint: usize) -> Result<Vec<u8>> {
    let mut decompressor =
        zstd::bulk::Decompressor::with_dictionary(dictionary).map_err(|e| Error::Decompress {
            hash: String::new(),
            source: e,
        })?;
    decompressor
        .decompress(data, capacity_hint)
        .map_err(|e| Error::Decompress {
            hash: String::new(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_blocks() -> Vec<Vec<u8>> {
        (0..50)
            .map(|i| format!("sample block number {i} with some repeated filler content").into_bytes())
            .collect()
    }

    #[test]
    fn trains_and_persists_dictionary() {
        let dir = tempdir().unwrap();
        let dict_path = dir.path().join("dictionary");
        let samples = sample_blocks();

        let dict = load_or_train_dict(&dict_path, &samples, 1024, Some(DEFAULT_SAMPLE_CAP)).unwrap();
        assert!(!dict.is_empty());
        assert!(dict_path.exists());

        // Second call loads the persisted dictionary rather than retraining.
        let reloaded = load_or_train_dict(&dict_path, &samples, 1024, Some(DEFAULT_SAMPLE_CAP)).unwrap();
        assert_eq!(dict, reloaded);
    }

    #[test]
    fn compress_then_decompress_round_trips() {
        let dir = tempdir().unwrap();
        let dict_path = dir.path().join("dictionary");
        let samples = sample_blocks();
        let dict = load_or_train_dict(&dict_path, &samples, 1024, None).unwrap();

        let original = b"sample block number 7 with some repeated filler content";
        let compressed = compress(original, &dict, 5).unwrap();
        let decompressed = decompress(&compressed, &dict, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn regen_dict_uses_unbounded_sample_cap() {
        let dir = tempdir().unwrap();
        let dict_path = dir.path().join("dictionary");
        let samples = sample_blocks();
        // sample_cap of None (regen_dict) must not error even though
        // samples.len() exceeds DEFAULT_SAMPLE_CAP would (it doesn't
        // here, but the code path must not subsample at all).
        let dict = load_or_train_dict(&dict_path, &samples, 1024, None).unwrap();
        assert!(!dict.is_empty());
    }
}
