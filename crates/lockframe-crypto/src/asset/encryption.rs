//! Asset encryption using `ChaCha20-Poly1305`
//!
//! All functions are pure - the nonce must be provided by the caller. The
//! nonce is published next to the asset URL, so it is an input here rather
//! than generated.

use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};

use super::{derivation::ContentKey, error::AssetCryptoError};

/// Size of the `ChaCha20` nonce (12 bytes)
pub const NONCE_SIZE: usize = 12;

/// Poly1305 tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// Encrypt an asset using `ChaCha20-Poly1305`.
///
/// Returns `ciphertext || tag`.
///
/// # Security
///
/// - A (content key, nonce) pair must never encrypt two different assets
/// - Caller MUST provide a fresh random salt or nonce per upload in production
pub fn encrypt_asset(plaintext: &[u8], key: &ContentKey, nonce: &[u8; NONCE_SIZE]) -> Vec<u8> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(nonce), plaintext) else {
        unreachable!("ChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    ciphertext
}

/// Decrypt an asset using `ChaCha20-Poly1305`.
///
/// Returns the decrypted plaintext.
///
/// # Errors
///
/// - `CiphertextTooShort`: input is shorter than the Poly1305 tag (malformed)
/// - `DecryptionFailed`: authentication tag or key is incorrect (tamper)
pub fn decrypt_asset(
    ciphertext: &[u8],
    key: &ContentKey,
    nonce: &[u8; NONCE_SIZE],
) -> Result<Vec<u8>, AssetCryptoError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(AssetCryptoError::CiphertextTooShort {
            minimum: TAG_SIZE,
            actual: ciphertext.len(),
        });
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

    cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| {
        AssetCryptoError::DecryptionFailed { reason: "authentication failed".to_string() }
    })
}

#[cfg(test)]
mod tests {
    use super::{super::derivation::derive_content_key, *};

    fn test_key() -> ContentKey {
        let mut salt = [0u8; 32];
        for (i, byte) in salt.iter_mut().enumerate() {
            *byte = i as u8;
        }
        derive_content_key(b"test group key", &salt)
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let key = test_key();
        let nonce = [0xAB; NONCE_SIZE];

        let ciphertext = encrypt_asset(b"Hello, World!", &key, &nonce);
        let decrypted = decrypt_asset(&ciphertext, &key, &nonce).unwrap();

        assert_eq!(decrypted, b"Hello, World!");
    }

    #[test]
    fn encrypt_decrypt_empty_asset() {
        let key = test_key();
        let nonce = [0x00; NONCE_SIZE];

        let ciphertext = encrypt_asset(b"", &key, &nonce);
        assert_eq!(ciphertext.len(), TAG_SIZE);

        let decrypted = decrypt_asset(&ciphertext, &key, &nonce).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn encrypt_decrypt_large_asset() {
        let key = test_key();
        let plaintext = vec![0x42u8; 256 * 1024]; // 256KB
        let nonce = [0xFF; NONCE_SIZE];

        let ciphertext = encrypt_asset(&plaintext, &key, &nonce);
        let decrypted = decrypt_asset(&ciphertext, &key, &nonce).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn ciphertext_is_plaintext_plus_tag() {
        let key = test_key();
        let plaintext = b"test asset";

        let ciphertext = encrypt_asset(plaintext, &key, &[0x00; NONCE_SIZE]);

        assert_eq!(ciphertext.len(), plaintext.len() + TAG_SIZE);
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let key = test_key();
        let nonce = [0x00; NONCE_SIZE];

        let mut ciphertext = encrypt_asset(b"original asset", &key, &nonce);
        ciphertext[0] ^= 0xFF;

        let result = decrypt_asset(&ciphertext, &key, &nonce);
        assert!(matches!(
            result,
            Err(AssetCryptoError::DecryptionFailed { reason })
                if reason.contains("authentication")
        ));
    }

    #[test]
    fn tampered_tag_fails_decryption() {
        let key = test_key();
        let nonce = [0x00; NONCE_SIZE];

        let mut ciphertext = encrypt_asset(b"original asset", &key, &nonce);
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        assert!(decrypt_asset(&ciphertext, &key, &nonce).is_err());
    }

    #[test]
    fn wrong_nonce_fails_decryption() {
        let key = test_key();

        let ciphertext = encrypt_asset(b"asset", &key, &[0x01; NONCE_SIZE]);
        let result = decrypt_asset(&ciphertext, &key, &[0x02; NONCE_SIZE]);

        assert!(result.is_err());
    }

    #[test]
    fn truncated_ciphertext_is_malformed() {
        let key = test_key();

        let result = decrypt_asset(&[0u8; TAG_SIZE - 1], &key, &[0x00; NONCE_SIZE]);

        assert!(matches!(
            result,
            Err(AssetCryptoError::CiphertextTooShort { minimum: TAG_SIZE, actual: 15 })
        ));
    }
}
