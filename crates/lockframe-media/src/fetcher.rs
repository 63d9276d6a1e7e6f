//! Fetch-and-decrypt seams.
//!
//! [`AssetFetcher`] is the capability the prefetcher consumes: given a
//! reference, return plaintext bytes. [`DecryptingFetcher`] implements it on
//! top of any [`BlobSource`] (HTTP in production, [`MemoryBlobSource`] in
//! tests and simulations). Neither caches nor retries.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use lockframe_crypto::open_asset;
use url::Url;

use crate::{error::FetchError, reference::AssetReference};

/// Fetches and decrypts one asset.
///
/// Implementations must be stateless with respect to a single fetch and safe
/// to call concurrently for different references.
#[async_trait]
pub trait AssetFetcher: Send + Sync + 'static {
    /// Return the plaintext bytes of `reference`.
    ///
    /// # Errors
    ///
    /// Network, status and decryption failures as [`FetchError`].
    async fn fetch(&self, reference: &AssetReference) -> Result<Vec<u8>, FetchError>;
}

/// Retrieves raw ciphertext by URL.
#[async_trait]
pub trait BlobSource: Send + Sync + 'static {
    /// Download the body at `url`.
    ///
    /// # Errors
    ///
    /// `UnexpectedStatus` for non-2xx responses, `Transport` otherwise.
    async fn get(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// [`AssetFetcher`] that downloads through a [`BlobSource`] and opens the
/// ciphertext with the reference's group key, salt and nonce.
#[derive(Debug, Clone)]
pub struct DecryptingFetcher<S> {
    source: S,
}

impl<S: BlobSource> DecryptingFetcher<S> {
    /// Wrap a blob source.
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: BlobSource> AssetFetcher for DecryptingFetcher<S> {
    async fn fetch(&self, reference: &AssetReference) -> Result<Vec<u8>, FetchError> {
        let ciphertext = self.source.get(reference.url()).await?;

        let group_key = reference.group_key().clone();
        let salt = *reference.salt();
        let nonce = *reference.nonce();

        // Keep multi-megabyte decrypts off the async workers
        let plaintext = tokio::task::spawn_blocking(move || {
            open_asset(group_key.as_bytes(), &salt, &nonce, &ciphertext)
        })
        .await
        .map_err(|e| FetchError::Decryption(format!("decrypt task failed: {e}")))??;

        Ok(plaintext)
    }
}

#[async_trait]
impl<F: AssetFetcher> AssetFetcher for Arc<F> {
    async fn fetch(&self, reference: &AssetReference) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(reference).await
    }
}

#[derive(Debug, Clone)]
enum Blob {
    Body(Vec<u8>),
    Status(u16),
}

#[derive(Default)]
struct MemoryBlobs {
    blobs: HashMap<String, Blob>,
    requests: HashMap<String, usize>,
}

/// In-memory [`BlobSource`] for testing and simulation.
///
/// Unknown URLs answer 404. Every request is counted per URL. Clones share
/// state, so a test can keep a handle after giving one to a fetcher.
#[derive(Clone, Default)]
pub struct MemoryBlobSource {
    inner: Arc<Mutex<MemoryBlobs>>,
}

impl MemoryBlobSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn insert(&self, url: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.lock().blobs.insert(url.into(), Blob::Body(body.into()));
    }

    /// Answer requests for `url` with a bare status code.
    pub fn respond_with_status(&self, url: impl Into<String>, status: u16) {
        self.lock().blobs.insert(url.into(), Blob::Status(status));
    }

    /// Number of requests made for `url`.
    pub fn request_count(&self, url: &str) -> usize {
        self.lock().requests.get(url).copied().unwrap_or(0)
    }

    /// Number of requests across all URLs.
    pub fn total_requests(&self) -> usize {
        self.lock().requests.values().sum()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryBlobs> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BlobSource for MemoryBlobSource {
    async fn get(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let mut inner = self.lock();
        *inner.requests.entry(url.to_string()).or_default() += 1;

        match inner.blobs.get(url.as_str()) {
            Some(Blob::Body(body)) => Ok(body.clone()),
            Some(Blob::Status(status)) if (200..300).contains(status) => Ok(Vec::new()),
            Some(Blob::Status(status)) => Err(FetchError::UnexpectedStatus(*status)),
            None => Err(FetchError::UnexpectedStatus(404)),
        }
    }
}

#[cfg(test)]
mod tests {
    use lockframe_crypto::seal_asset;

    use super::*;
    use crate::reference::GroupKey;

    const URL: &str = "https://cdn.example/avatars/alice";

    fn reference(group_key: &GroupKey) -> AssetReference {
        AssetReference::new(URL, &[4; 32], &[5; 12], group_key.clone()).unwrap()
    }

    #[tokio::test]
    async fn fetch_decrypts_body() {
        let group_key = GroupKey::new(b"room key".to_vec());
        let source = MemoryBlobSource::new();
        source.insert(URL, seal_asset(group_key.as_bytes(), &[4; 32], &[5; 12], b"plaintext"));

        let fetcher = DecryptingFetcher::new(source.clone());
        let plaintext = fetcher.fetch(&reference(&group_key)).await.unwrap();

        assert_eq!(plaintext, b"plaintext");
        assert_eq!(source.request_count(URL), 1);
    }

    #[tokio::test]
    async fn wrong_group_key_is_decryption_error() {
        let source = MemoryBlobSource::new();
        source.insert(URL, seal_asset(b"other key", &[4; 32], &[5; 12], b"plaintext"));

        let fetcher = DecryptingFetcher::new(source);
        let result = fetcher.fetch(&reference(&GroupKey::new(b"room key".to_vec()))).await;

        assert!(matches!(result, Err(FetchError::Decryption(_))));
    }

    #[tokio::test]
    async fn non_success_status_is_network_error() {
        let source = MemoryBlobSource::new();
        source.respond_with_status(URL, 503);

        let fetcher = DecryptingFetcher::new(source);
        let result = fetcher.fetch(&reference(&GroupKey::new(b"room key".to_vec()))).await;

        assert_eq!(result, Err(FetchError::UnexpectedStatus(503)));
    }

    #[tokio::test]
    async fn unknown_url_is_not_found() {
        let fetcher = DecryptingFetcher::new(MemoryBlobSource::new());
        let result = fetcher.fetch(&reference(&GroupKey::new(b"room key".to_vec()))).await;

        assert_eq!(result, Err(FetchError::UnexpectedStatus(404)));
    }

    #[tokio::test]
    async fn empty_body_is_malformed_ciphertext() {
        let source = MemoryBlobSource::new();
        source.respond_with_status(URL, 200);

        let fetcher = DecryptingFetcher::new(source);
        let result = fetcher.fetch(&reference(&GroupKey::new(b"room key".to_vec()))).await;

        assert!(matches!(result, Err(FetchError::Decryption(reason)) if reason.contains("too short")));
    }
}
