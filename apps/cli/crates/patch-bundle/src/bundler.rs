//! Bundle packing: groups block payloads into fixed-cardinality bundles,
//! reusing bundle compositions from a prior manifest when possible.

use patch_core::{BundleMember, BundleMembers, Error, Hash, Manifest, Result, BUNDLE_CAPACITY};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// The producer-side packing result: the new `bundles` map plus, for each
/// bundle id, the raw concatenated payload to write to disk.
pub struct PackResult {
    pub bundles: BTreeMap<String, BundleMembers>,
    pub payloads: BTreeMap<String, Vec<u8>>,
}

/// Pack `pool` (block hash → possibly-compressed payload) into bundles.
///
/// `prior` is the previous manifest, if any: any of its bundles whose
/// members all still exist in `pool` are reused verbatim (same id, same
/// membership), and those blocks are removed from the pool before the
/// remaining blocks are packed into fresh groups of `BUNDLE_CAPACITY`.
///
/// Insertion order of `pool` determines packing order for the remaining
/// (non-reused) blocks, so callers should use an order-preserving map.
pub fn pack_bundles(
    pool_order: &[Hash],
    pool: &BTreeMap<Hash, Vec<u8>>,
    prior: Option<&Manifest>,
) -> PackResult {
    let mut remaining: BTreeMap<Hash, Vec<u8>> = pool.clone();
    let mut bundles = BTreeMap::new();
    let mut payloads = BTreeMap::new();

    if let Some(prior) = prior {
        for (bundle_id, members) in &prior.bundles {
            if can_reuse(members, &remaining) {
                let mut payload = Vec::new();
                for member in members.iter_ordered() {
                    payload.extend_from_slice(&remaining[&member.hash]);
                    remaining.remove(&member.hash);
                }
                tracing::debug!(bundle_id, members = members.len(), "reusing bundle from prior manifest");
                bundles.insert(bundle_id.clone(), members.clone());
                payloads.insert(bundle_id.clone(), payload);
            }
        }
    }

    // Pack whatever's left, in the pool's original insertion order, in
    // groups of BUNDLE_CAPACITY.
    let remaining_ordered: Vec<Hash> = pool_order
        .iter()
        .copied()
        .filter(|h| remaining.contains_key(h))
        .collect();

    for group in remaining_ordered.chunks(BUNDLE_CAPACITY) {
        let mut members = Vec::with_capacity(group.len());
        let mut payload = Vec::new();
        let mut offset = 0u64;
        for hash in group {
            let bytes = &remaining[hash];
            members.push(BundleMember {
                hash: *hash,
                length: bytes.len() as u64,
                block_offset: offset,
            });
            offset += bytes.len() as u64;
            payload.extend_from_slice(bytes);
        }
        let members = BundleMembers::from_ordered(members);
        let id = members.compute_id().to_hex();
        tracing::debug!(bundle_id = %id, members = group.len(), "packed fresh bundle");
        bundles.insert(id.clone(), members);
        payloads.insert(id, payload);
    }

    PackResult { bundles, payloads }
}

fn can_reuse(members: &BundleMembers, pool: &BTreeMap<Hash, Vec<u8>>) -> bool {
    members.iter_ordered().all(|m| pool.contains_key(&m.hash))
}

/// Write every packed bundle payload to `<dir>/<bundle_id>`, then delete
/// any file in `dir` whose name is not a produced bundle id.
pub fn write_bundles(dir: &Path, payloads: &BTreeMap<String, Vec<u8>>) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for (id, payload) in payloads {
        let path = dir.join(id);
        fs::write(&path, payload).map_err(|e| Error::Io {
            path: path.clone(),
            source: e,
        })?;
    }

    garbage_collect(dir, payloads)
}

fn garbage_collect(dir: &Path, produced: &BTreeMap<String, Vec<u8>>) -> Result<()> {
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
        let name = name.to_string_lossy();
        if !produced.contains_key(name.as_ref()) {
            fs::remove_file(entry.path()).map_err(|e| Error::Io {
                path: entry.path(),
                source: e,
            })?;
        }
    }
    Ok(())
}
