use crate::creator::{create_patch, CreateOptions};
use crate::ui::Spinner;
use crate::util::format_bytes;
use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};

#[allow(clippy::too_many_arguments)]
pub fn run_create(
    directory: &Path,
    output: &Path,
    patch_data: Option<&Path>,
    block_size: u64,
    compress: bool,
    compression_level: i32,
    dict_path: Option<PathBuf>,
    regen_dict: bool,
) -> Result<()> {
    let options = CreateOptions {
        block_size: block_size.try_into().context("block size too large")?,
        compress,
        compression_level,
        dict_path,
        regen_dict,
        max_workers: 6,
    };
    let patch_data_dir = patch_data.unwrap_or(output);

    tracing::info!(source = %directory.display(), output = %output.display(), "starting create");
    let spinner = Spinner::new(&format!("chunking {}", directory.display()));
    let manifest = create_patch(directory, output, patch_data_dir, &options)
        .with_context(|| format!("failed to create patch data from {}", directory.display()))?;
    let total_bytes: u64 = manifest
        .bundles
        .values()
        .flat_map(|members| members.iter_ordered())
        .map(|member| member.length)
        .sum();

    spinner.finish_success(&format!(
        "{} files, {} bundles",
        manifest.files.len(),
        manifest.bundles.len()
    ));

    println!(
        "{} {} files, {} bundles, {} -> {}",
        style("created").green().bold(),
        manifest.files.len(),
        manifest.bundles.len(),
        format_bytes(total_bytes),
        output.display()
    );
    Ok(())
}
