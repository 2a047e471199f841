//! Content-defined chunking of a single byte buffer using FastCDC.

use fastcdc::v2020::FastCDC;
use patch_core::{Hash, Hasher};

/// Chunker parameters. Defaults follow the spec: `avg = 65536`,
/// `min = avg / 2`, `max = 2 * avg`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub min_size: u32,
    pub avg_size: u32,
    pub max_size: u32,
}

impl ChunkerConfig {
    /// Build a config from a single average block size, deriving min/max
    /// per the spec's fixed ratios.
    pub fn for_avg_size(avg_size: u32) -> Self {
        Self {
            min_size: avg_size / 2,
            avg_size,
            max_size: avg_size * 2,
        }
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self::for_avg_size(65536)
    }
}

/// One content-defined block: its hash and raw bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub hash: Hash,
    pub data: Vec<u8>,
}

impl Block {
    pub fn new(data: Vec<u8>) -> Self {
        let hash = Hasher::hash(&data);
        Self { hash, data }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// A block's position within its originating buffer, without owning the
/// bytes — used when the caller wants offsets rather than copies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRef {
    pub hash: Hash,
    pub offset: usize,
    pub size: usize,
}

/// Chunk `data` into content-defined blocks, emitting `(hash, bytes)`
/// pairs in order. Concatenating `.data` across the result reproduces
/// `data` exactly.
///
/// A zero-byte input yields an empty block sequence (so its file-record
/// hash reduces to SHA-256 of the empty string). FastCDC requires
/// `data.len() >= min_size` to find a boundary; non-empty inputs below
/// that threshold are emitted as a single block.
pub fn chunk_data(data: &[u8], config: ChunkerConfig) -> Vec<Block> {
    if data.is_empty() {
        return vec![];
    }
    if data.len() < config.min_size as usize {
        return vec![Block::new(data.to_vec())];
    }

    let chunker = FastCDC::new(data, config.min_size, config.avg_size, config.max_size);
    chunker
        .map(|entry| Block::new(data[entry.offset..entry.offset + entry.length].to_vec()))
        .collect()
}

/// Like [`chunk_data`] but returns offset/size references instead of
/// owned copies, hashing each candidate slice in parallel via `rayon`.
pub fn chunk_data_with_refs(data: &[u8], config: ChunkerConfig) -> Vec<BlockRef> {
    use rayon::prelude::*;

    if data.is_empty() {
        return vec![];
    }
    if data.len() < config.min_size as usize {
        return vec![BlockRef {
            hash: Hasher::hash(data),
            offset: 0,
            size: data.len(),
        }];
    }

    let chunker = FastCDC::new(data, config.min_size, config.avg_size, config.max_size);
    let boundaries: Vec<(usize, usize)> = chunker.map(|e| (e.offset, e.length)).collect();

    boundaries
        .into_par_iter()
        .map(|(offset, size)| BlockRef {
            hash: Hasher::hash(&data[offset..offset + size]),
            offset,
            size,
        })
        .collect()
}
