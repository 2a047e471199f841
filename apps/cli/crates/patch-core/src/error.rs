//! Error types for the patching engine.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the engine's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for core patching operations.
#[derive(Error, Debug)]
pub enum Error {
    // ==================== Input errors ====================
    #[error("source directory does not exist: {0}")]
    SourceDirectoryNotFound(PathBuf),

    #[error("source directory is empty: {0}")]
    EmptySourceDirectory(PathBuf),

    #[error("invalid block size: {0} (must be > 0)")]
    InvalidBlockSize(u32),

    #[error("invalid compression level: {0}")]
    InvalidCompressionLevel(i32),

    // ==================== Integrity errors ====================
    #[error("manifest references block {hash} which was never fetched")]
    MissingBlock { hash: String },

    #[error("malformed bundle index for bundle {bundle_id}: {reason}")]
    MalformedBundleIndex { bundle_id: String, reason: String },

    #[error("file record hash mismatch for {path}: stored {stored}, recomputed {recomputed}")]
    FileRecordHashMismatch {
        path: String,
        stored: String,
        recomputed: String,
    },

    #[error("failed to parse manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    // ==================== Transport errors ====================
    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} fetching {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed multipart/byteranges response from {url}: {reason}")]
    MalformedMultipart { url: String, reason: String },

    // ==================== Decompression errors ====================
    #[error("failed to decompress block {hash}: {source}")]
    Decompress {
        hash: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to train or load compression dictionary: {0}")]
    Dictionary(String),

    // ==================== Configuration errors ====================
    #[error("IO error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("unknown config key: {0}")]
    UnknownConfigKey(String),

    #[error("invalid value for '{key}': {value} ({reason})")]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },

    // ==================== I/O ====================
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    PlainIo(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error represents a problem the caller could plausibly
    /// retry (a fresh `apply` invocation), as opposed to one that will
    /// always recur (bad input, a corrupt manifest).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. } | Error::UnexpectedStatus { .. } | Error::MalformedMultipart { .. }
        )
    }
}
