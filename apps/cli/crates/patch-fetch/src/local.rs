//! Local-filesystem fetch mode: read bundle/block files directly off disk.

use crate::BlockPool;
use patch_core::{Error, Manifest, Progress, Result};
use patch_planner::FetchPlan;
use std::fs;
use std::path::Path;

/// Execute `plan` by reading bundle and block files from `patch_root`
/// (`<patch_root>/bundles/<id>`, `<patch_root>/blocks/<hash>`),
/// decompressing with `dictionary` when compression is enabled.
pub fn fetch_local(
    patch_root: &Path,
    manifest: &Manifest,
    plan: &FetchPlan,
    dictionary: Option<&[u8]>,
    compression_level: i32,
    pool: &mut BlockPool,
    progress: &mut Progress,
) -> Result<()> {
    for bundle_fetch in &plan.bundle_fetches {
        let bundle_path = patch_root.join("bundles").join(&bundle_fetch.bundle_id);
        let bundle_data = fs::read(&bundle_path).map_err(|e| Error::Io {
            path: bundle_path.clone(),
            source: e,
        })?;

        let members = manifest.bundles.get(&bundle_fetch.bundle_id).ok_or_else(|| {
            Error::MalformedBundleIndex {
                bundle_id: bundle_fetch.bundle_id.clone(),
                reason: "bundle referenced by plan is absent from manifest".to_string(),
            }
        })?;

        for needed_hash in &bundle_fetch.needed {
            let member = members
                .iter_ordered()
                .find(|m| m.hash == *needed_hash)
                .ok_or_else(|| Error::MissingBlock {
                    hash: needed_hash.to_hex(),
                })?;
            let start = member.block_offset as usize;
            let end = start + member.length as usize;
            let slice = &bundle_data[start..end];
            let bytes = decompress_if_needed(slice, dictionary, compression_level)?;
            pool.insert(*needed_hash, bytes);
        }
        progress.advance(1);
    }

    for hash in &plan.individual_blocks {
        let block_path = patch_root.join("blocks").join(hash.to_hex());
        let raw = fs::read(&block_path).map_err(|e| Error::Io {
            path: block_path,
            source: e,
        })?;
        let bytes = decompress_if_needed(&raw, dictionary, compression_level)?;
        pool.insert(*hash, bytes);
        progress.advance(1);
    }

    Ok(())
}

fn decompress_if_needed(data: &[u8], dictionary: Option<&[u8]>, _level: i32) -> Result<Vec<u8>> {
    match dictionary {
        Some(dict) => patch_bundle::decompress(data, dict, data.len() * 4),
        None => Ok(data.to_vec()),
    }
}
