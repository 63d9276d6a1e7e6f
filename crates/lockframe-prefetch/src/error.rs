//! Errors surfaced by the prefetch binary.

use std::{io, path::PathBuf};

use lockframe_media::FetchError;
use thiserror::Error;

/// Everything that stops the CLI before or after the prefetch pass.
#[derive(Debug, Error)]
pub enum CliError {
    /// Record file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Record file is not the expected JSON shape
    #[error("invalid record file: {0}")]
    Json(#[from] serde_json::Error),

    /// A hex field did not decode
    #[error("invalid hex in {field} for {identifier:?}: {source}")]
    Hex {
        /// Record identifier (empty for the group key)
        identifier: String,
        /// Field name
        field: &'static str,
        /// Decoder error
        source: hex::FromHexError,
    },

    /// HTTP client could not be constructed
    #[error("http setup failed: {0}")]
    Http(#[from] FetchError),

    /// Some assets could not be cached
    #[error("{failed} of {requested} assets could not be cached")]
    Incomplete {
        /// Failed identifiers
        failed: usize,
        /// Identifiers attempted
        requested: usize,
    },
}
