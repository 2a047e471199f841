//! The on-disk manifest (`patchData.json`) and its constituent record types.

use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of block entries packed into a single bundle.
pub const BUNDLE_CAPACITY: usize = 60;

/// Compression settings recorded in the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionInfo {
    pub enabled: bool,
    pub level: Option<i32>,
}

impl Default for CompressionInfo {
    fn default() -> Self {
        Self {
            enabled: false,
            level: None,
        }
    }
}

/// A single file's entry in the manifest: its block sequence and the
/// derived hash of that sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: Hash,
    pub blocks: Vec<Hash>,
}

impl FileRecord {
    /// Build a file record from an ordered block-hash sequence, computing
    /// `hash` as specified: SHA-256 of the UTF-8 concatenation of the block
    /// hashes' hex digests, in order.
    pub fn new(blocks: Vec<Hash>) -> Self {
        let hash = crate::hash::file_record_hash(blocks.iter());
        Self { hash, blocks }
    }

    /// Recompute `hash` from `blocks` and compare against the stored value.
    pub fn is_self_consistent(&self) -> bool {
        crate::hash::file_record_hash(self.blocks.iter()) == self.hash
    }
}

/// One block's placement within a bundle file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleMember {
    pub hash: Hash,
    pub length: u64,
    #[serde(rename = "blockOffset")]
    pub block_offset: u64,
}

/// A bundle's ordered member list, keyed by stringified integer index so
/// that JSON serialization preserves the 0..n-1 ordering that the bundle
/// id is computed over.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BundleMembers(BTreeMap<OrderedIndex, BundleMember>);

/// Wraps a `usize` so that its `Ord` impl sorts numerically rather than
/// lexicographically once serialized as a string map key (`"2" < "10"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderedIndex(pub usize);

impl Serialize for OrderedIndex {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderedIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<usize>()
            .map(OrderedIndex)
            .map_err(serde::de::Error::custom)
    }
}

impl BundleMembers {
    pub fn from_ordered(members: Vec<BundleMember>) -> Self {
        let map = members
            .into_iter()
            .enumerate()
            .map(|(i, m)| (OrderedIndex(i), m))
            .collect();
        Self(map)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Members in index order (0, 1, 2, ...).
    pub fn iter_ordered(&self) -> impl Iterator<Item = &BundleMember> {
        self.0.values()
    }

    pub fn contains_hash(&self, hash: &Hash) -> bool {
        self.0.values().any(|m| m.hash == *hash)
    }

    /// Canonical textual rendering used to derive the bundle id: each
    /// member rendered in a fixed field order, joined in index order.
    /// This implementation does not attempt to reproduce Python's
    /// `str(dict)` output byte-for-byte (see DESIGN.md); it only needs to
    /// be stable and deterministic across runs of this implementation.
    pub fn canonical_text(&self) -> String {
        let mut out = String::from("{");
        for (i, (idx, member)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&format!(
                "{}: {{hash: {}, length: {}, blockOffset: {}}}",
                idx.0,
                member.hash.to_hex(),
                member.length,
                member.block_offset
            ));
        }
        out.push('}');
        out
    }

    /// Compute the bundle id: SHA-256 hex digest of `canonical_text()`.
    pub fn compute_id(&self) -> Hash {
        crate::hash::Hasher::hash(self.canonical_text().as_bytes())
    }
}

/// The full manifest: `patchData.json`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub compression: CompressionInfo,
    pub files: BTreeMap<String, FileRecord>,
    pub bundles: BTreeMap<String, BundleMembers>,
}

impl Manifest {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The set of every distinct block hash referenced by any file.
    pub fn all_file_block_hashes(&self) -> std::collections::BTreeSet<Hash> {
        self.files
            .values()
            .flat_map(|f| f.blocks.iter().copied())
            .collect()
    }

    /// Find which bundle (if any) contains a given block hash, and the
    /// member metadata within it.
    pub fn locate_block(&self, hash: &Hash) -> Option<(&str, BundleMember)> {
        for (bundle_id, members) in &self.bundles {
            if let Some(member) = members.iter_ordered().find(|m| m.hash == *hash) {
                return Some((bundle_id.as_str(), *member));
            }
        }
        None
    }

    /// SHA-256 hex digest of the canonical JSON serialization of this
    /// manifest; written out as the `version` file.
    pub fn version_hash(&self) -> Result<Hash, serde_json::Error> {
        let bytes = serde_json::to_vec(self)?;
        Ok(crate::hash::Hasher::hash(&bytes))
    }

    /// Load `patchData.json` from `patch_data_dir`, or `None` if it doesn't
    /// exist yet (the no-prior-version case for `create`).
    pub fn load(patch_data_dir: &std::path::Path) -> crate::error::Result<Option<Self>> {
        let path = patch_data_dir.join("patchData.json");
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read(&path).map_err(|e| crate::error::Error::Io {
            path: path.clone(),
            source: e,
        })?;
        let manifest = serde_json::from_slice(&content)?;
        Ok(Some(manifest))
    }

    /// Write `patchData.json` and the accompanying `version` file to
    /// `patch_data_dir`.
    pub fn save(&self, patch_data_dir: &std::path::Path) -> crate::error::Result<()> {
        std::fs::create_dir_all(patch_data_dir).map_err(|e| crate::error::Error::Io {
            path: patch_data_dir.to_path_buf(),
            source: e,
        })?;
        let bytes = serde_json::to_vec(self)?;
        let data_path = patch_data_dir.join("patchData.json");
        std::fs::write(&data_path, &bytes).map_err(|e| crate::error::Error::Io {
            path: data_path,
            source: e,
        })?;

        let version_hash = crate::hash::Hasher::hash(&bytes);
        let version_path = patch_data_dir.join("version");
        std::fs::write(&version_path, version_hash.to_hex()).map_err(|e| crate::error::Error::Io {
            path: version_path,
            source: e,
        })?;
        Ok(())
    }
}
