//! patchkit - content-addressed binary patching for large installation trees.
//!
//! # Modules
//!
//! - [`creator`]: chunks a source directory and packs blocks into bundles.
//! - [`applier`]: reconstructs files atomically from a fetched block pool.
//! - [`cleaner`]: removes stale files and empty directories after apply.
//! - [`commands`]: CLI subcommand implementations.

pub mod applier;
pub mod cleaner;
pub mod commands;
pub mod creator;
pub mod ui;
pub mod util;
