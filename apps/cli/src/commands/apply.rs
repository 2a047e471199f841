use crate::ui::{Spinner, UnitProgress};
use crate::util::{format_bytes, format_percentage, safe_percentage};
use crate::{applier, cleaner};
use anyhow::{Context, Result};
use console::style;
use patch_chunker::{scan_directory, ChunkerConfig};
use patch_core::{Changelog, Manifest, Progress};
use patch_fetch::BlockPool;
use patch_planner::plan;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Block size used when rescanning the local install tree to detect which
/// files already match the target build. Fixed rather than configurable:
/// the upstream patcher never exposed this at apply time either, since the
/// value only matters for re-deriving comparable block hashes, not for
/// choosing how the target build itself was chunked.
const LOCAL_RESCAN_BLOCK_SIZE: u32 = 65536;

pub async fn run_apply(install_root: &Path, patch_data: &str) -> Result<()> {
    let install_dir = install_root.join("install");
    let app_data_dir = install_root.join("data");
    std::fs::create_dir_all(&install_dir).context("failed to create install directory")?;

    let is_remote = patch_fetch::is_url(patch_data);
    let (manifest, dictionary) = load_manifest_and_dictionary(patch_data, is_remote).await?;

    tracing::info!(files = manifest.files.len(), bundles = manifest.bundles.len(), "loaded manifest");

    let scan_spinner = Spinner::new("scanning local install tree");
    let chunker_config = ChunkerConfig::for_avg_size(LOCAL_RESCAN_BLOCK_SIZE);
    let local_scan = scan_directory(&install_dir, chunker_config, 6).context("failed to scan local install tree")?;
    scan_spinner.finish_success(&format!("scanned {} local files", local_scan.files.len()));

    let local_file_hashes: BTreeMap<String, patch_core::Hash> = local_scan
        .files
        .iter()
        .map(|(path, record)| (path.clone(), record.hash))
        .collect();
    let local_pool: BTreeSet<patch_core::Hash> = local_scan.pool.iter().map(|e| *e.key()).collect();

    let mut changelog = Changelog::load(&app_data_dir);
    let fetch_plan = plan(&manifest, &local_file_hashes, &local_pool, &changelog, &install_dir);

    let total_units = (fetch_plan.bundle_fetches.len() + fetch_plan.individual_blocks.len()) as u64;
    let mut progress = Progress::new(total_units);
    let fetch_bar = UnitProgress::new(total_units, "fetching bundles and blocks");

    let mut pool: BlockPool = local_scan
        .pool
        .into_iter()
        .filter(|(hash, _)| manifest.all_file_block_hashes().contains(hash))
        .collect();

    let needed_blocks: BTreeSet<patch_core::Hash> = fetch_plan
        .files_to_patch
        .iter()
        .filter_map(|path| manifest.files.get(path))
        .flat_map(|record| record.blocks.iter().copied())
        .collect();
    let reused_from_local = needed_blocks.iter().filter(|h| pool.contains_key(h)).count();
    let reuse_ratio = safe_percentage(reused_from_local as u64, needed_blocks.len() as u64);

    let fetch_result = if is_remote {
        let client = reqwest::Client::new();
        patch_fetch::remote::fetch_remote(
            &client,
            patch_data,
            &manifest,
            &fetch_plan,
            dictionary.as_deref(),
            &mut pool,
            &mut progress,
        )
        .await
        .context("remote fetch failed")
    } else {
        patch_fetch::local::fetch_local(
            Path::new(patch_data),
            &manifest,
            &fetch_plan,
            dictionary.as_deref(),
            manifest.compression.level.unwrap_or(5),
            &mut pool,
            &mut progress,
        )
        .context("local fetch failed")
    };
    fetch_bar.set_position(progress.current);
    match &fetch_result {
        Ok(()) => fetch_bar.finish_success("fetch complete"),
        Err(e) => fetch_bar.finish_error(&e.to_string()),
    }
    fetch_result?;

    applier::apply_files(&install_dir, &manifest, &pool, &fetch_plan.files_to_patch)
        .context("failed to apply fetched blocks to install tree")?;

    cleaner::clean(&install_dir, &manifest, &mut changelog).context("cleanup failed")?;
    changelog.save().context("failed to save changelog")?;

    let fetched_bytes: u64 = pool
        .iter()
        .filter(|(hash, _)| needed_blocks.contains(*hash))
        .map(|(_, bytes)| bytes.len() as u64)
        .sum();

    println!(
        "{} {} files patched, {} fetched ({} reused from local install) -> {}",
        style("applied").green().bold(),
        fetch_plan.files_to_patch.len(),
        format_bytes(fetched_bytes),
        format_percentage(reuse_ratio),
        install_dir.display()
    );
    Ok(())
}

async fn load_manifest_and_dictionary(patch_data: &str, is_remote: bool) -> Result<(Manifest, Option<Vec<u8>>)> {
    if is_remote {
        let client = reqwest::Client::new();
        let manifest_url = format!("{patch_data}/patchData.json");
        let body = client
            .get(&manifest_url)
            .send()
            .await
            .with_context(|| format!("failed to fetch {manifest_url}"))?
            .bytes()
            .await
            .with_context(|| format!("failed to read body from {manifest_url}"))?;
        let manifest: Manifest = serde_json::from_slice(&body).context("failed to parse patchData.json")?;

        let dictionary = if manifest.compression.enabled {
            let dict_url = format!("{patch_data}/dictionary");
            let response = client.get(&dict_url).send().await.with_context(|| format!("failed to fetch {dict_url}"))?;
            Some(response.bytes().await.with_context(|| format!("failed to read body from {dict_url}"))?.to_vec())
        } else {
            None
        };

        Ok((manifest, dictionary))
    } else {
        let path = Path::new(patch_data);
        let manifest = Manifest::load(path)?
            .with_context(|| format!("no patchData.json found under {}", path.display()))?;
        let dictionary = if manifest.compression.enabled {
            Some(std::fs::read(path.join("dictionary")).context("failed to read dictionary file")?)
        } else {
            None
        };
        Ok((manifest, dictionary))
    }
}
