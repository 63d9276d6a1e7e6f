//! Encrypted media assets.
//!
//! An asset is stored remotely as `ciphertext || tag`. Everything needed to
//! open it besides the group key travels in the member's profile: the URL, a
//! 32-byte salt and a 12-byte nonce.

mod derivation;
mod encryption;
mod error;

pub use derivation::{ContentKey, KEY_SIZE, SALT_SIZE, derive_content_key};
pub use encryption::{NONCE_SIZE, TAG_SIZE, decrypt_asset, encrypt_asset};
pub use error::AssetCryptoError;

/// Derive the content key and decrypt in one step.
///
/// # Errors
///
/// - `CiphertextTooShort`: input cannot even hold the authentication tag
/// - `DecryptionFailed`: wrong group key, wrong salt/nonce, or tampering
pub fn open_asset(
    group_key: &[u8],
    salt: &[u8; SALT_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>, AssetCryptoError> {
    let key = derive_content_key(group_key, salt);
    decrypt_asset(ciphertext, &key, nonce)
}

/// Derive the content key and encrypt in one step.
///
/// Counterpart of [`open_asset`], used by uploaders and test fixtures.
pub fn seal_asset(
    group_key: &[u8],
    salt: &[u8; SALT_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Vec<u8> {
    let key = derive_content_key(group_key, salt);
    encrypt_asset(plaintext, &key, nonce)
}
