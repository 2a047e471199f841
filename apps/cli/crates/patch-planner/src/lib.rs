//! # patch-planner
//!
//! Given a new manifest and the locally-derived block pool, computes the
//! minimal fetch plan: which files need patching, which bundles are worth
//! fetching wholesale, and which blocks must be fetched individually.

use patch_core::{Changelog, Hash, Manifest};
use std::collections::{BTreeMap, BTreeSet};

/// Threshold at which a bundle is scheduled for a bundle-range fetch
/// rather than leaving its needed members as individual block fetches.
pub const BUNDLE_FETCH_THRESHOLD: f64 = 0.5;

/// A scheduled bundle fetch: the bundle id and the member hashes actually
/// needed from it (a subset of its full membership).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleFetch {
    pub bundle_id: String,
    pub needed: Vec<Hash>,
}

/// The computed fetch plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchPlan {
    pub files_to_patch: Vec<String>,
    pub bundle_fetches: Vec<BundleFetch>,
    pub individual_blocks: BTreeSet<Hash>,
}

/// Step 1: determine which files need patching. A file needs patching
/// when it's missing locally, its file-record hash has changed, or the
/// changelog considers it tampered.
pub fn files_to_patch(
    manifest: &Manifest,
    local_file_hashes: &BTreeMap<String, Hash>,
    changelog: &Changelog,
    install_dir: &std::path::Path,
) -> Vec<String> {
    manifest
        .files
        .iter()
        .filter(|(path, record)| {
            let missing_or_changed = match local_file_hashes.get(path.as_str()) {
                None => true,
                Some(local_hash) => *local_hash != record.hash,
            };
            missing_or_changed || !changelog.is_valid(install_dir, path)
        })
        .map(|(path, _)| path.clone())
        .collect()
}

/// Step 2: union of block hashes referenced by `files_to_patch`, minus
/// whatever's already in the local block pool.
pub fn missing_blocks(
    manifest: &Manifest,
    files_to_patch: &[String],
    local_pool: &BTreeSet<Hash>,
) -> BTreeSet<Hash> {
    let mut missing = BTreeSet::new();
    for path in files_to_patch {
        if let Some(record) = manifest.files.get(path) {
            for hash in &record.blocks {
                if !local_pool.contains(hash) {
                    missing.insert(*hash);
                }
            }
        }
    }
    missing
}

/// Steps 3-4: decide bundle-fetch vs. individual-block fetch for every
/// missing hash.
pub fn plan_fetches(manifest: &Manifest, missing: &BTreeSet<Hash>) -> (Vec<BundleFetch>, BTreeSet<Hash>) {
    let mut remaining = missing.clone();
    let mut bundle_fetches = Vec::new();

    for (bundle_id, members) in &manifest.bundles {
        if members.is_empty() {
            continue;
        }
        let needed: Vec<Hash> = members
            .iter_ordered()
            .map(|m| m.hash)
            .filter(|h| missing.contains(h))
            .collect();
        let percent_needed = needed.len() as f64 / members.len() as f64;
        if percent_needed >= BUNDLE_FETCH_THRESHOLD {
            tracing::debug!(bundle_id, percent_needed, needed = needed.len(), "scheduling bundle fetch");
            for hash in &needed {
                remaining.remove(hash);
            }
            bundle_fetches.push(BundleFetch {
                bundle_id: bundle_id.clone(),
                needed,
            });
        } else {
            tracing::debug!(bundle_id, percent_needed, "below threshold, falling back to individual blocks");
        }
    }

    (bundle_fetches, remaining)
}

/// Run the full planning pipeline end to end.
pub fn plan(
    manifest: &Manifest,
    local_file_hashes: &BTreeMap<String, Hash>,
    local_pool: &BTreeSet<Hash>,
    changelog: &Changelog,
    install_dir: &std::path::Path,
) -> FetchPlan {
    let files = files_to_patch(manifest, local_file_hashes, changelog, install_dir);
    let missing = missing_blocks(manifest, &files, local_pool);
    let (bundle_fetches, individual_blocks) = plan_fetches(manifest, &missing);

    FetchPlan {
        files_to_patch: files,
        bundle_fetches,
        individual_blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patch_core::{BundleMember, BundleMembers, FileRecord};
    use tempfile::tempdir;

    fn h(byte: u8) -> Hash {
        Hash::from_bytes([byte; 32])
    }

    #[test]
    fn planner_threshold_boundary_schedules_bundle_fetch() {
        // S4: bundle has 2 members, 1 missing -> percent_needed == 0.5.
        let mut manifest = Manifest::empty();
        let members = BundleMembers::from_ordered(vec![
            BundleMember {
                hash: h(1),
                length: 1,
                block_offset: 0,
            },
            BundleMember {
                hash: h(2),
                length: 1,
                block_offset: 1,
            },
        ]);
        manifest.bundles.insert("b1".to_string(), members);

        let mut missing = BTreeSet::new();
        missing.insert(h(1));

        let (bundle_fetches, residual) = plan_fetches(&manifest, &missing);
        assert_eq!(bundle_fetches.len(), 1);
        assert_eq!(bundle_fetches[0].needed, vec![h(1)]);
        assert!(residual.is_empty());
    }

    #[test]
    fn below_threshold_falls_back_to_individual_blocks() {
        let mut manifest = Manifest::empty();
        let members = BundleMembers::from_ordered(vec![
            BundleMember {
                hash: h(1),
                length: 1,
                block_offset: 0,
            },
            BundleMember {
                hash: h(2),
                length: 1,
                block_offset: 1,
            },
            BundleMember {
                hash: h(3),
                length: 1,
                block_offset: 2,
            },
        ]);
        manifest.bundles.insert("b1".to_string(), members);

        let mut missing = BTreeSet::new();
        missing.insert(h(1));

        let (bundle_fetches, residual) = plan_fetches(&manifest, &missing);
        assert!(bundle_fetches.is_empty());
        assert_eq!(residual, missing);
    }

    #[test]
    fn files_to_patch_detects_missing_changed_and_tampered() {
        let dir = tempdir().unwrap();
        let install_dir = dir.path().join("install");
        std::fs::create_dir_all(&install_dir).unwrap();

        let mut manifest = Manifest::empty();
        manifest
            .files
            .insert("present.txt".to_string(), FileRecord::new(vec![h(1)]));
        manifest
            .files
            .insert("missing.txt".to_string(), FileRecord::new(vec![h(2)]));

        let mut local_hashes = BTreeMap::new();
        local_hashes.insert("present.txt".to_string(), FileRecord::new(vec![h(1)]).hash);

        let changelog = Changelog::load(&dir.path().join("data"));
        let result = files_to_patch(&manifest, &local_hashes, &changelog, &install_dir);

        // present.txt has a matching local hash, but the changelog has no
        // entry for it at all, so it is still considered unverified.
        assert!(result.contains(&"present.txt".to_string()));
        assert!(result.contains(&"missing.txt".to_string()));
    }

    #[test]
    fn missing_blocks_excludes_local_pool() {
        let mut manifest = Manifest::empty();
        manifest
            .files
            .insert("a.txt".to_string(), FileRecord::new(vec![h(1), h(2)]));

        let mut local_pool = BTreeSet::new();
        local_pool.insert(h(1));

        let missing = missing_blocks(&manifest, &["a.txt".to_string()], &local_pool);
        assert_eq!(missing, BTreeSet::from([h(2)]));
    }
}
