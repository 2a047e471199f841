use anyhow::Result;
use patch_core::Changelog;
use std::io::Write;
use std::path::Path;

/// Print `1` (no trailing newline) when every changelog entry matches the
/// currently installed file, `0` otherwise. Always exits 0.
pub fn run_validate(install_root: &Path) -> Result<()> {
    let install_dir = install_root.join("install");
    let app_data_dir = install_root.join("data");

    let changelog = Changelog::load(&app_data_dir);
    let valid = changelog.validate_current_installation(&install_dir);

    print!("{}", if valid { "1" } else { "0" });
    std::io::stdout().flush()?;
    Ok(())
}
