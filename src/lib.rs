// PadIndex - indexing and query core for an ad-serving pad selector.
// See SPEC_FULL.md for the full design.

pub mod bitset;
pub mod catalog;
pub mod error;
pub mod index;

pub use bitset::Bitset;
pub use error::{PadIndexError, Result};
pub use index::PadIndex;

/// Runtime configuration for the build/query CLIs.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing the flat catalog files and `index.txt`.
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self { data_dir: "./data".to_string() }
    }
}
