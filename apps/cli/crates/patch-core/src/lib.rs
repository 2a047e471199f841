//! # patch-core
//!
//! Core data model, error types, and configuration for the patching engine:
//! the `Hash`/`Hasher` content-addressing primitives, the manifest record
//! types (`FileRecord`, `BundleMember`, `Manifest`), the local `Changelog`,
//! and the unified `Error` type shared by the chunker, bundler, planner,
//! fetcher, and applier.

pub mod changelog;
pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod types;

pub use changelog::{Changelog, FileMetadata};
pub use config::Config;
pub use error::{Error, Result};
pub use hash::{file_record_hash, Hash, Hasher};
pub use manifest::{
    BundleMember, BundleMembers, CompressionInfo, FileRecord, Manifest, BUNDLE_CAPACITY,
};
pub use types::Progress;
