//! Error types for media prefetching.
//!
//! [`ReferenceError`] covers records that can never be fetched; they are
//! filtered out before any network traffic. [`FetchError`] covers everything
//! that can go wrong once a fetch starts; every variant is retried by the
//! prefetcher because a transient server glitch can surface as any of them.

use lockframe_crypto::AssetCryptoError;
use thiserror::Error;

/// Why a candidate record does not yield a fetchable reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Record has no URL, or an empty one
    #[error("missing asset url")]
    MissingUrl,

    /// URL does not parse as an absolute URI
    #[error("invalid asset url {url:?}: {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Parser error
        reason: String,
    },

    /// Record has a URL but no salt
    #[error("missing salt")]
    MissingSalt,

    /// Record has a URL but no nonce
    #[error("missing nonce")]
    MissingNonce,

    /// Salt has the wrong length
    #[error("invalid salt length: expected {expected}, got {actual}")]
    InvalidSaltLength {
        /// Required salt length
        expected: usize,
        /// Actual salt length
        actual: usize,
    },

    /// Nonce has the wrong length
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Required nonce length
        expected: usize,
        /// Actual nonce length
        actual: usize,
    },
}

/// Errors from a single fetch attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Server answered with a non-2xx status
    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    /// Connection, timeout or body read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Authentication or format failure while decrypting
    #[error("decryption error: {0}")]
    Decryption(String),

    /// Decrypted bytes are not a valid asset
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Short, stable label for logs and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnexpectedStatus(_) | Self::Transport(_) => "network",
            Self::Decryption(_) => "decryption",
            Self::Decode(_) => "decode",
        }
    }

    /// Returns true if another attempt may succeed.
    ///
    /// All fetch errors are retried: a flaky CDN can return a truncated body
    /// that fails authentication just as easily as a 503.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UnexpectedStatus(_)
            | Self::Transport(_)
            | Self::Decryption(_)
            | Self::Decode(_) => true,
        }
    }
}

impl From<AssetCryptoError> for FetchError {
    fn from(err: AssetCryptoError) -> Self {
        Self::Decryption(err.to_string())
    }
}
