//! # patch-chunker
//!
//! Content-defined chunking: turns a byte buffer into a sequence of
//! `(hash, bytes)` blocks ([`fastcdc`]), and walks a directory tree
//! chunking every file concurrently into a shared block pool ([`scan_directory`]).

pub mod fastcdc;

pub use crate::fastcdc::{chunk_data, chunk_data_with_refs, Block, BlockRef, ChunkerConfig};

use dashmap::DashMap;
use patch_core::{FileRecord, Hash};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Chunk a single file on disk, returning its `FileRecord` and inserting
/// every distinct block into `pool`. Pool insertion is idempotent:
/// concurrent scans of the same content always agree on the bytes for a
/// given hash, so a benign race just re-writes the same value.
pub fn chunk_file(
    path: &Path,
    config: ChunkerConfig,
    pool: &DashMap<Hash, Vec<u8>>,
) -> std::io::Result<FileRecord> {
    let data = std::fs::read(path)?;
    let blocks = chunk_data(&data, config);
    let mut hashes = Vec::with_capacity(blocks.len());
    for block in blocks {
        hashes.push(block.hash);
        pool.entry(block.hash).or_insert(block.data);
    }
    Ok(FileRecord::new(hashes))
}

/// The result of scanning a directory: every file's record, keyed by its
/// POSIX-style relative path, and the shared block pool populated along
/// the way.
pub struct ScanResult {
    pub files: std::collections::BTreeMap<String, FileRecord>,
    pub pool: DashMap<Hash, Vec<u8>>,
}

/// Walk `root`, chunking every regular file with up to `max_workers`
/// concurrent workers (spec default: 6). Each file is chunked by a
/// single worker; the block pool is shared and written to concurrently.
pub fn scan_directory(
    root: &Path,
    config: ChunkerConfig,
    max_workers: usize,
) -> std::io::Result<ScanResult> {
    let pool = DashMap::new();
    let entries: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();

    let thread_pool = Arc::new(
        rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers.max(1))
            .build()
            .expect("failed to build chunker thread pool"),
    );

    let files: std::collections::BTreeMap<String, FileRecord> = thread_pool.install(|| {
        entries
            .par_iter()
            .filter_map(|path| {
                let rel_path = relative_posix_path(root, path);
                match chunk_file(path, config, &pool) {
                    Ok(record) => Some((rel_path, record)),
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "failed to chunk file during scan");
                        None
                    }
                }
            })
            .collect()
    });

    Ok(ScanResult { files, pool })
}

/// Render `path` relative to `root` with forward slashes, matching the
/// manifest's POSIX-style relative path keys regardless of host OS.
pub fn relative_posix_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
