//! Content-key derivation using HKDF

use std::fmt;

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

/// Label used for asset content-key derivation
const ASSET_KEY_LABEL: &[u8] = b"lockframeAssetV1";

/// Size of the per-asset salt (32 bytes)
pub const SALT_SIZE: usize = 32;

/// Size of a derived content key (32 bytes)
pub const KEY_SIZE: usize = 32;

/// A symmetric key for exactly one asset.
///
/// Derived from the group key and the asset salt. Zeroized on drop.
#[derive(Clone)]
pub struct ContentKey {
    key: [u8; KEY_SIZE],
}

impl ContentKey {
    /// 32-byte symmetric key for ChaCha20-Poly1305 AEAD.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

impl Drop for ContentKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Derive the content key for one asset.
///
/// HKDF-SHA256 with the asset salt as HKDF salt and the group key as input
/// keying material. The output is unique per (group key, salt) pair.
///
/// # Security
///
/// - Different salts produce unrelated keys (per-asset isolation)
/// - Different group keys produce unrelated keys (per-room isolation)
/// - Deterministic: same inputs always produce same output
pub fn derive_content_key(group_key: &[u8], salt: &[u8; SALT_SIZE]) -> ContentKey {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), group_key);

    let mut key = [0u8; KEY_SIZE];
    let Ok(()) = hkdf.expand(ASSET_KEY_LABEL, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };

    ContentKey { key }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_is_deterministic() {
        let group_key = b"test_group_key_material_here!!!!";
        let salt = [7u8; SALT_SIZE];

        let key1 = derive_content_key(group_key, &salt);
        let key2 = derive_content_key(group_key, &salt);

        assert_eq!(key1.as_bytes(), key2.as_bytes(), "same inputs must produce same output");
    }

    #[test]
    fn different_salts_produce_different_keys() {
        let group_key = b"test_group_key_material_here!!!!";

        let key_a = derive_content_key(group_key, &[0u8; SALT_SIZE]);
        let key_b = derive_content_key(group_key, &[1u8; SALT_SIZE]);

        assert_ne!(key_a.as_bytes(), key_b.as_bytes(), "different salts must produce different keys");
    }

    #[test]
    fn different_group_keys_produce_different_keys() {
        let salt = [3u8; SALT_SIZE];

        let key_a = derive_content_key(b"group_key_a_____________________", &salt);
        let key_b = derive_content_key(b"group_key_b_____________________", &salt);

        assert_ne!(key_a.as_bytes(), key_b.as_bytes());
    }

    #[test]
    fn works_with_empty_group_key() {
        // HKDF accepts empty IKM; rejection of empty keys is the caller's call
        let key = derive_content_key(&[], &[0u8; SALT_SIZE]);
        assert_eq!(key.as_bytes().len(), KEY_SIZE);
    }

    #[test]
    fn debug_redacts_key_material() {
        let key = derive_content_key(b"secret", &[0u8; SALT_SIZE]);
        assert_eq!(format!("{key:?}"), "ContentKey(..)");
    }
}
