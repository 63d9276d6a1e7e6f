//! Asset references and the records they are extracted from.

use std::{fmt, sync::Arc};

use lockframe_crypto::{NONCE_SIZE, SALT_SIZE};
use url::Url;
use zeroize::Zeroizing;

use crate::error::ReferenceError;

/// Symmetric key shared by the members of a room.
///
/// Cloning shares the same allocation; the bytes are zeroized when the last
/// clone is dropped. `Debug` never prints key material.
#[derive(Clone)]
pub struct GroupKey(Arc<Zeroizing<Vec<u8>>>);

impl GroupKey {
    /// Wrap raw key material.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(Zeroizing::new(bytes.into())))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Debug for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupKey({} bytes)", self.0.len())
    }
}

/// A member profile (or any record) that may point at an encrypted asset.
///
/// Read-only snapshot supplied by the caller for one prefetch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// Stable key used for dedup and cache lookup (e.g. member id)
    pub identifier: String,
    /// Location of the ciphertext
    pub url: Option<String>,
    /// Per-asset key-derivation salt
    pub salt: Option<Vec<u8>>,
    /// AEAD nonce
    pub nonce: Option<Vec<u8>>,
}

impl CandidateRecord {
    /// Record with an identifier and no asset.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), url: None, salt: None, nonce: None }
    }

    /// Record pointing at an encrypted asset.
    pub fn with_asset(
        identifier: impl Into<String>,
        url: impl Into<String>,
        salt: impl Into<Vec<u8>>,
        nonce: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            url: Some(url.into()),
            salt: Some(salt.into()),
            nonce: Some(nonce.into()),
        }
    }
}

/// Everything needed to fetch and decrypt one remote asset.
///
/// # Invariants
///
/// - `url` is an absolute URI
/// - salt is exactly [`SALT_SIZE`] bytes, nonce exactly [`NONCE_SIZE`] bytes
///
/// Both are enforced at construction, so an invalid reference cannot reach a
/// fetcher.
#[derive(Debug, Clone)]
pub struct AssetReference {
    url: Url,
    source_url: String,
    salt: [u8; SALT_SIZE],
    nonce: [u8; NONCE_SIZE],
    group_key: GroupKey,
}

impl AssetReference {
    /// Validate raw parts into a reference.
    ///
    /// # Errors
    ///
    /// - `MissingUrl` / `InvalidUrl` for an empty or unparseable URL
    /// - `InvalidSaltLength` / `InvalidNonceLength` for wrong-sized parameters
    pub fn new(
        url: &str,
        salt: &[u8],
        nonce: &[u8],
        group_key: GroupKey,
    ) -> Result<Self, ReferenceError> {
        if url.trim().is_empty() {
            return Err(ReferenceError::MissingUrl);
        }

        let parsed = Url::parse(url)
            .map_err(|e| ReferenceError::InvalidUrl { url: url.to_string(), reason: e.to_string() })?;

        let salt: [u8; SALT_SIZE] = salt.try_into().map_err(|_| {
            ReferenceError::InvalidSaltLength { expected: SALT_SIZE, actual: salt.len() }
        })?;

        let nonce: [u8; NONCE_SIZE] = nonce.try_into().map_err(|_| {
            ReferenceError::InvalidNonceLength { expected: NONCE_SIZE, actual: nonce.len() }
        })?;

        Ok(Self { url: parsed, source_url: url.to_string(), salt, nonce, group_key })
    }

    /// Extract a reference from a candidate record.
    ///
    /// # Errors
    ///
    /// Any missing field, plus everything [`AssetReference::new`] rejects.
    pub fn from_record(
        record: &CandidateRecord,
        group_key: &GroupKey,
    ) -> Result<Self, ReferenceError> {
        let url = record.url.as_deref().ok_or(ReferenceError::MissingUrl)?;
        let salt = record.salt.as_deref().ok_or(ReferenceError::MissingSalt)?;
        let nonce = record.nonce.as_deref().ok_or(ReferenceError::MissingNonce)?;

        Self::new(url, salt, nonce, group_key.clone())
    }

    /// Parsed URL of the ciphertext.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// URL exactly as the record carried it. This is what the cache stores
    /// and compares for staleness.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Key-derivation salt.
    pub fn salt(&self) -> &[u8; SALT_SIZE] {
        &self.salt
    }

    /// AEAD nonce.
    pub fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Group key the content key is derived from.
    pub fn group_key(&self) -> &GroupKey {
        &self.group_key
    }
}
