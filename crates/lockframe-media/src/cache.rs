//! Identifier-keyed store of decoded assets with change notifications.
//!
//! The store is the single source of truth for "is this identifier's asset
//! current". Readers run concurrently; writes are serialized behind one lock
//! and publish their [`UrlChangeEvent`] before the lock is released, so every
//! subscriber observes changes in write order.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tokio::sync::broadcast;

/// Default capacity of the change-notification channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// The stored source URL for an identifier changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlChangeEvent {
    /// Identifier whose asset changed
    pub identifier: String,
    /// Previously stored URL (`None` if nothing was cached)
    pub old_url: Option<String>,
    /// Newly stored URL (`None` if the entry was removed)
    pub new_url: Option<String>,
}

/// Snapshot of one cached asset.
#[derive(Debug)]
pub struct CacheEntry<A> {
    /// Identifier the asset is stored under
    pub identifier: String,
    /// Decoded asset
    pub asset: Arc<A>,
    /// URL the asset was fetched from
    pub source_url: String,
}

impl<A> Clone for CacheEntry<A> {
    fn clone(&self) -> Self {
        Self {
            identifier: self.identifier.clone(),
            asset: Arc::clone(&self.asset),
            source_url: self.source_url.clone(),
        }
    }
}

struct StoredAsset<A> {
    asset: Arc<A>,
    source_url: String,
}

struct CacheInner<A> {
    entries: RwLock<HashMap<String, StoredAsset<A>>>,
    events: broadcast::Sender<UrlChangeEvent>,
}

/// In-memory asset cache.
///
/// Cloning is cheap; clones share the same entries and notification channel,
/// so one store can be handed to several prefetchers and to UI observers.
pub struct CacheStore<A> {
    inner: Arc<CacheInner<A>>,
}

impl<A> Clone for CacheStore<A> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<A> Default for CacheStore<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> CacheStore<A> {
    /// Create an empty store with [`DEFAULT_EVENT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty store whose notification channel buffers `capacity`
    /// events per subscriber. A subscriber that falls further behind receives
    /// `RecvError::Lagged` and skips the oldest events.
    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self { inner: Arc::new(CacheInner { entries: RwLock::new(HashMap::new()), events }) }
    }

    /// Look up the cached asset for `identifier`.
    pub fn get(&self, identifier: &str) -> Option<CacheEntry<A>> {
        self.read().get(identifier).map(|stored| CacheEntry {
            identifier: identifier.to_string(),
            asset: Arc::clone(&stored.asset),
            source_url: stored.source_url.clone(),
        })
    }

    /// Check whether anything is cached for `identifier`.
    pub fn contains(&self, identifier: &str) -> bool {
        self.read().contains_key(identifier)
    }

    /// Stored source URL for `identifier`, if any.
    pub fn source_url(&self, identifier: &str) -> Option<String> {
        self.read().get(identifier).map(|stored| stored.source_url.clone())
    }

    /// Store `asset` for `identifier`, replacing any previous entry.
    ///
    /// Emits a [`UrlChangeEvent`] when `source_url` differs from the
    /// previously stored URL, including the first write. Re-caching under the
    /// same URL refreshes the asset silently.
    pub fn put(&self, identifier: impl Into<String>, asset: A, source_url: impl Into<String>) {
        let identifier = identifier.into();
        let source_url = source_url.into();

        let mut entries = self.write();
        let previous = entries.insert(
            identifier.clone(),
            StoredAsset { asset: Arc::new(asset), source_url: source_url.clone() },
        );

        let old_url = previous.map(|stored| stored.source_url);
        if old_url.as_deref() != Some(source_url.as_str()) {
            tracing::debug!(%identifier, ?old_url, new_url = %source_url, "cached asset url changed");
            self.publish(UrlChangeEvent { identifier, old_url, new_url: Some(source_url) });
        }
    }

    /// Drop the entry for `identifier`.
    ///
    /// Emits a present → absent [`UrlChangeEvent`] if something was cached.
    pub fn remove(&self, identifier: &str) -> Option<CacheEntry<A>> {
        let mut entries = self.write();
        let stored = entries.remove(identifier)?;

        self.publish(UrlChangeEvent {
            identifier: identifier.to_string(),
            old_url: Some(stored.source_url.clone()),
            new_url: None,
        });

        Some(CacheEntry {
            identifier: identifier.to_string(),
            asset: stored.asset,
            source_url: stored.source_url,
        })
    }

    /// Returns true if the stored URL for `identifier` differs from `url`.
    ///
    /// An identifier with nothing cached has always changed.
    pub fn has_changed(&self, url: &str, identifier: &str) -> bool {
        self.read().get(identifier).is_none_or(|stored| stored.source_url != url)
    }

    /// Subscribe to URL change events.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe(&self) -> broadcast::Receiver<UrlChangeEvent> {
        self.inner.events.subscribe()
    }

    /// Number of cached assets.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// All cached identifiers, sorted.
    pub fn identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.read().keys().cloned().collect();
        identifiers.sort();
        identifiers
    }

    /// Must be called with the write lock held.
    fn publish(&self, event: UrlChangeEvent) {
        // No subscribers is not an error for a cache
        let _ = self.inner.events.send(event);
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, StoredAsset<A>>> {
        self.inner.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, StoredAsset<A>>> {
        self.inner.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
