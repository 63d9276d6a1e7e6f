//! Error types for asset crypto operations

use thiserror::Error;

/// Errors from asset decryption
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetCryptoError {
    /// Decryption failed (authentication tag mismatch)
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },

    /// Ciphertext cannot hold the authentication tag
    #[error("ciphertext too short: need at least {minimum} bytes, got {actual}")]
    CiphertextTooShort {
        /// Minimum valid length (tag size)
        minimum: usize,
        /// Actual ciphertext length
        actual: usize,
    },
}
