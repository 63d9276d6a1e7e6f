//! Lockframe Cryptographic Primitives
//!
//! Building blocks for end-to-end encrypted media assets (avatars, room
//! images). Pure functions with deterministic outputs. Callers provide salts
//! and nonces, which keeps every operation reproducible in tests.
//!
//! # Key Lifecycle
//!
//! Each uploaded asset carries its own random salt and nonce. The content key
//! is derived from the room's group key and the asset salt, so two assets
//! never share a key even inside the same room.
//!
//! ```text
//! Group Key ─┐
//!            ├─ HKDF-SHA256 → Content Key (per asset)
//! Salt ──────┘                    │
//!                                 ▼
//!            Nonce ──→ ChaCha20-Poly1305 → Ciphertext || Tag
//! ```
//!
//! # Security
//!
//! Authenticity:
//! - ChaCha20-Poly1305 AEAD provides tamper-proof encryption
//! - Failed authentication tag -> reject asset, never return partial plaintext
//!
//! Key Hygiene:
//! - Content keys are zeroized on drop
//! - Derivation is domain-separated by a fixed label

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod asset;

pub use asset::{
    AssetCryptoError, ContentKey, KEY_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE, decrypt_asset,
    derive_content_key, encrypt_asset, open_asset, seal_asset,
};
