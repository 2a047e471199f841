//! # patch-bundle
//!
//! Producer-side packaging: Zstandard dictionary training and block
//! compression ([`dictionary`]), and bundle packing with cross-version
//! identity reuse ([`bundler`]).

pub mod bundler;
pub mod dictionary;

pub use bundler::{pack_bundles, write_bundles, PackResult};
pub use dictionary::{compress, decompress, load_or_train_dict, DEFAULT_SAMPLE_CAP};
