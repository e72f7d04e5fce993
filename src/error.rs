use thiserror::Error;

/// Errors surfaced while loading a catalog or building an index.
///
/// Referential errors (a row pointing at an unknown id) are not a
/// variant here: they're counted and dropped during load, then reported
/// in aggregate via `tracing::warn!`. Only format and structural
/// violations are fatal; out-of-range bitset access and mismatched-size
/// boolean ops are programmer errors and panic instead of returning
/// `Err` (see `bitset.rs`).
#[derive(Error, Debug)]
pub enum PadIndexError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("format error in {file}: {message}")]
    Format { file: String, message: String },

    #[error("structural invariant violated: {0}")]
    Structural(String),
}

pub type Result<T> = std::result::Result<T, PadIndexError>;
