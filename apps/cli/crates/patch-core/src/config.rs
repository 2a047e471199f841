//! Persistent configuration for the patching engine's CLI front-end.
//!
//! Supplements the explicit `create`/`apply` flags with a layered TOML
//! config file holding defaults, following this codebase's usual
//! dot-notation `get`/`set`/`unset`/`list` convention.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Engine configuration.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub compression: CompressionConfig,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

/// Chunking defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Target (average) block size in bytes.
    #[serde(default = "default_block_size")]
    pub block_size: u32,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
        }
    }
}

fn default_block_size() -> u32 {
    65536
}

/// Compression defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompressionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_compression_level")]
    pub level: i32,
    #[serde(default)]
    pub dict_path: Option<PathBuf>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: default_compression_level(),
            dict_path: None,
        }
    }
}

fn default_compression_level() -> i32 {
    5
}

impl Config {
    /// Load configuration from `path`, or return defaults if it doesn't
    /// exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Get a config value by dot-notation key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "chunking.block_size" => Some(self.chunking.block_size.to_string()),
            "compression.enabled" => Some(self.compression.enabled.to_string()),
            "compression.level" => Some(self.compression.level.to_string()),
            "compression.dict_path" => self
                .compression
                .dict_path
                .as_ref()
                .map(|p| p.display().to_string()),
            _ => None,
        }
    }

    /// Set a config value by dot-notation key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "chunking.block_size" => {
                self.chunking.block_size = parse_size(value)?.try_into().map_err(|_| {
                    Error::InvalidConfigValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason: "too large for a block size".to_string(),
                    }
                })?
            }
            "compression.enabled" => {
                self.compression.enabled = value.parse().map_err(|_| Error::InvalidConfigValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected boolean".to_string(),
                })?
            }
            "compression.level" => {
                self.compression.level = value.parse().map_err(|_| Error::InvalidConfigValue {
                    key: key.to_string(),
                    value: value.to_string(),
                    reason: "expected integer".to_string(),
                })?
            }
            "compression.dict_path" => self.compression.dict_path = Some(PathBuf::from(value)),
            _ => return Err(Error::UnknownConfigKey(key.to_string())),
        }
        Ok(())
    }

    /// Unset (remove) a config value, restoring its default.
    pub fn unset(&mut self, key: &str) -> Result<bool> {
        match key {
            "compression.dict_path" => {
                let had_value = self.compression.dict_path.is_some();
                self.compression.dict_path = None;
                Ok(had_value)
            }
            _ => Err(Error::UnknownConfigKey(key.to_string())),
        }
    }

    /// List all config values as key/value pairs.
    pub fn list(&self) -> Vec<(String, String)> {
        let mut items = vec![
            (
                "chunking.block_size".to_string(),
                format_size(self.chunking.block_size as u64),
            ),
            (
                "compression.enabled".to_string(),
                self.compression.enabled.to_string(),
            ),
            (
                "compression.level".to_string(),
                self.compression.level.to_string(),
            ),
        ];
        if let Some(ref dict_path) = self.compression.dict_path {
            items.push((
                "compression.dict_path".to_string(),
                dict_path.display().to_string(),
            ));
        }
        items
    }
}

/// Parse a size string (e.g., "1MB", "512KB", "65536").
pub fn parse_size(s: &str) -> Result<u64> {
    let trimmed = s.trim().to_uppercase();

    if let Ok(n) = trimmed.parse::<u64>() {
        return Ok(n);
    }

    let (num_str, multiplier) = if trimmed.ends_with("GB") {
        (&trimmed[..trimmed.len() - 2], 1024 * 1024 * 1024)
    } else if trimmed.ends_with("MB") {
        (&trimmed[..trimmed.len() - 2], 1024 * 1024)
    } else if trimmed.ends_with("KB") {
        (&trimmed[..trimmed.len() - 2], 1024)
    } else if trimmed.ends_with('B') {
        (&trimmed[..trimmed.len() - 1], 1)
    } else {
        return Err(Error::InvalidConfigValue {
            key: "size".to_string(),
            value: s.to_string(),
            reason: "expected a plain number or a B/KB/MB/GB suffix".to_string(),
        });
    };

    let n: f64 = num_str.trim().parse().map_err(|_| Error::InvalidConfigValue {
        key: "size".to_string(),
        value: s.to_string(),
        reason: "expected a plain number or a B/KB/MB/GB suffix".to_string(),
    })?;
    Ok((n * multiplier as f64) as u64)
}

/// Format a size as a human-readable string.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB && bytes % GB == 0 {
        format!("{}GB", bytes / GB)
    } else if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{bytes}")
    }
}

/// Path to the global configuration file.
pub fn global_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("patchkit")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_chunker_contract() {
        let config = Config::default();
        assert_eq!(config.chunking.block_size, 65536);
        assert!(!config.compression.enabled);
    }

    #[test]
    fn set_get_round_trip() {
        let mut config = Config::default();
        config.set("chunking.block_size", "128KB").unwrap();
        assert_eq!(config.get("chunking.block_size").unwrap(), "131072");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.set("compression.enabled", "true").unwrap();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert!(loaded.compression.enabled);
    }

    #[test]
    fn unknown_key_is_an_error() {
        let mut config = Config::default();
        assert!(config.set("nonexistent.key", "x").is_err());
    }

    #[test]
    fn parse_size_handles_suffixes() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("64KB").unwrap(), 65536);
        assert_eq!(parse_size("1MB").unwrap(), 1024 * 1024);
    }
}
