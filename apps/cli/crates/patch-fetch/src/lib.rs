//! # patch-fetch
//!
//! Executes a [`patch_planner::FetchPlan`] against either a local
//! directory or an HTTP(S) source: local mode slices bundle/block files
//! directly off disk, remote mode issues multi-range HTTP requests with a
//! bounded connection pool and falls back to whole-bundle downloads when
//! the server doesn't cooperate.

pub mod local;
pub mod multipart;
pub mod remote;

use patch_core::Hash;
use std::collections::HashMap;

/// The in-memory block pool populated by a fetch, keyed by block hash.
/// Owned by a single apply operation; never persisted between runs.
pub type BlockPool = HashMap<Hash, Vec<u8>>;

/// Connection pool cap for remote fetches (spec §4.5 / §5).
pub const MAX_CONCURRENT_CONNECTIONS: usize = 15;

/// True when `source` should be treated as an HTTP(S) URL rather than a
/// local filesystem path.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_url_detects_http_and_https() {
        assert!(is_url("https://example.com/patch"));
        assert!(is_url("http://example.com/patch"));
        assert!(!is_url("/local/path/to/patch"));
        assert!(!is_url("C:\\local\\path"));
    }
}
