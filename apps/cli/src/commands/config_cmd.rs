use anyhow::{Context, Result};
use patch_core::Config;

pub enum ConfigAction {
    Get(String),
    Set(String, String),
    Unset(String),
    List,
}

pub fn run_config(action: ConfigAction) -> Result<()> {
    let path = patch_core::config::global_config_path();
    let mut config = Config::load(&path).context("failed to load configuration")?;

    match action {
        ConfigAction::Get(key) => match config.get(&key) {
            Some(value) => println!("{value}"),
            None => anyhow::bail!("unknown config key: {key}"),
        },
        ConfigAction::Set(key, value) => {
            config.set(&key, &value).with_context(|| format!("failed to set {key}"))?;
            config.save(&path)?;
        }
        ConfigAction::Unset(key) => {
            config.unset(&key).with_context(|| format!("failed to unset {key}"))?;
            config.save(&path)?;
        }
        ConfigAction::List => {
            for (key, value) in config.list() {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}
