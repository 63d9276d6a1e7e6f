//! Prefetch coordinator.
//!
//! [`Prefetcher`] turns a batch of candidate records into cache entries:
//!
//! 1. Resolve the batch (validity, in-batch dedup, freshness)
//! 2. For each remaining identifier, join the unit already in flight or start
//!    a new one (single-flight across concurrent calls)
//! 3. Each unit runs on its own task and waits for one of
//!    `max_concurrent_fetches` permits. It then re-checks the cache and
//!    fetches, decrypts and decodes, retrying with a constant backoff
//! 4. Success writes to the [`CacheStore`]; exhausted retries are logged and
//!    reported, never raised
//!
//! Dropping a `prefetch_all` future abandons only the wait: units already
//! started still finish, cache their asset and free their permit.
//!
//! Per identifier: `NotStarted → InFlight → (Succeeded | FailedExhausted)`.
//! Only `InFlight` is tracked (the single-flight table); success is implied by
//! cache containment and failure by absence, which makes the next call retry.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::{
    cache::CacheStore,
    decoder::AssetDecoder,
    env::Environment,
    error::FetchError,
    fetcher::AssetFetcher,
    reference::{AssetReference, CandidateRecord, GroupKey},
    resolver::{self, ResolvedAsset},
    single_flight::{Role, SingleFlight},
};

/// Tuning for a [`Prefetcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchConfig {
    /// Maximum units of work executing at once (values below 1 act as 1)
    pub max_concurrent_fetches: usize,
    /// Attempts per identifier per call, including the first (values below 1
    /// act as 1)
    pub max_attempts: u32,
    /// Constant pause between attempts
    pub retry_backoff: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self { max_concurrent_fetches: 4, max_attempts: 2, retry_backoff: Duration::from_secs(1) }
    }
}

/// An identifier whose retries were exhausted in this call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchFailure {
    /// Identifier that could not be cached
    pub identifier: String,
    /// Error from the last attempt
    pub error: FetchError,
}

/// What one [`Prefetcher::prefetch_all`] call did.
///
/// Informational only; callers are free to ignore it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Identifiers that survived resolution
    pub requested: usize,
    /// Identifiers this call fetched and cached
    pub fetched: Vec<String>,
    /// Identifiers another call fetched; this call waited for that fetch or
    /// found the result in the cache before starting its own
    pub joined: Vec<String>,
    /// Identifiers this call gave up on
    pub failed: Vec<PrefetchFailure>,
}

impl PrefetchReport {
    /// Check if the call had nothing to do.
    pub fn is_empty(&self) -> bool {
        self.requested == 0
    }
}

/// Output of one unit of work, shared with every joined caller.
#[derive(Debug, Clone)]
enum UnitOutcome {
    Cached,
    /// Another writer cached the same URL before this unit got a permit
    AlreadyFresh,
    Failed(FetchError),
}

struct PrefetchInner<F, D: AssetDecoder, E> {
    fetcher: F,
    decoder: Arc<D>,
    env: E,
    cache: CacheStore<D::Asset>,
    config: PrefetchConfig,
    permits: Semaphore,
    flights: SingleFlight<String, UnitOutcome>,
}

/// Bounded, deduplicating, retrying fetch-decrypt-cache coordinator.
///
/// Cheap to clone; clones share the in-flight table and the concurrency
/// limit. Separate `Prefetcher`s may share one [`CacheStore`].
pub struct Prefetcher<F, D: AssetDecoder, E> {
    inner: Arc<PrefetchInner<F, D, E>>,
}

impl<F, D: AssetDecoder, E> Clone for Prefetcher<F, D, E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<F, D, E> Prefetcher<F, D, E>
where
    F: AssetFetcher,
    D: AssetDecoder,
    E: Environment,
{
    /// Create a prefetcher writing into `cache`.
    pub fn new(
        fetcher: F,
        decoder: D,
        cache: CacheStore<D::Asset>,
        env: E,
        config: PrefetchConfig,
    ) -> Self {
        let permits = Semaphore::new(config.max_concurrent_fetches.max(1));

        Self {
            inner: Arc::new(PrefetchInner {
                fetcher,
                decoder: Arc::new(decoder),
                env,
                cache,
                config,
                permits,
                flights: SingleFlight::new(),
            }),
        }
    }

    /// The cache this prefetcher writes into.
    pub fn cache(&self) -> &CacheStore<D::Asset> {
        &self.inner.cache
    }

    /// Active configuration.
    pub fn config(&self) -> &PrefetchConfig {
        &self.inner.config
    }

    /// Number of identifiers currently being fetched.
    pub fn in_flight_count(&self) -> usize {
        self.inner.flights.len()
    }

    /// Check whether `identifier` is currently being fetched.
    pub fn is_in_flight(&self, identifier: &str) -> bool {
        self.inner.flights.in_flight(&identifier.to_string())
    }

    /// Warm the cache for every record that needs it.
    ///
    /// Returns once every resolved identifier has been cached, has exhausted
    /// its retries, or (if another call was already fetching it) once that
    /// other unit finished. Never fails; see [`PrefetchReport`].
    pub async fn prefetch_all(
        &self,
        candidates: &[CandidateRecord],
        group_key: &GroupKey,
    ) -> PrefetchReport {
        let work = resolver::resolve(candidates, group_key, &self.inner.cache);

        let mut report = PrefetchReport { requested: work.len(), ..PrefetchReport::default() };
        if work.is_empty() {
            return report;
        }

        tracing::debug!(
            candidates = candidates.len(),
            requested = report.requested,
            "prefetch pass starting"
        );

        let units = work.into_iter().map(|item| self.join_or_start(item));

        for (identifier, outcome, role) in join_all(units).await {
            match (role, outcome) {
                (Role::Follower, _) | (Role::Leader, UnitOutcome::AlreadyFresh) => {
                    report.joined.push(identifier);
                },
                (Role::Leader, UnitOutcome::Cached) => report.fetched.push(identifier),
                (Role::Leader, UnitOutcome::Failed(error)) => {
                    report.failed.push(PrefetchFailure { identifier, error });
                },
            }
        }

        tracing::debug!(
            fetched = report.fetched.len(),
            joined = report.joined.len(),
            failed = report.failed.len(),
            "prefetch pass complete"
        );

        report
    }

    async fn join_or_start(&self, item: ResolvedAsset) -> (String, UnitOutcome, Role) {
        let identifier = item.identifier.clone();
        let inner = Arc::clone(&self.inner);

        let (outcome, role) =
            self.inner.flights.run(identifier.clone(), move || run_unit(inner, item)).await;

        let outcome = outcome.unwrap_or_else(|aborted| {
            tracing::warn!(%identifier, error = %aborted, "asset prefetch aborted");
            UnitOutcome::Failed(FetchError::Transport(aborted.to_string()))
        });

        (identifier, outcome, role)
    }
}

/// One unit of work: permit, freshness re-check, fetch-with-retry, cache
/// write.
///
/// Runs on its own task, so it completes and releases its permit even when
/// every caller waiting on it is dropped.
async fn run_unit<F, D, E>(inner: Arc<PrefetchInner<F, D, E>>, item: ResolvedAsset) -> UnitOutcome
where
    F: AssetFetcher,
    D: AssetDecoder,
    E: Environment,
{
    // The semaphore is never closed, so acquire cannot fail
    let Ok(_permit) = inner.permits.acquire().await else {
        return UnitOutcome::Failed(FetchError::Transport("prefetcher shut down".to_string()));
    };

    // Another call may have cached this URL between resolution and now
    if !inner.cache.has_changed(item.reference.source_url(), &item.identifier) {
        tracing::debug!(identifier = %item.identifier, "asset already fresh");
        return UnitOutcome::AlreadyFresh;
    }

    let max_attempts = inner.config.max_attempts.max(1);
    let started = inner.env.now();
    let mut attempt = 1;

    loop {
        match fetch_and_decode(&inner, &item.reference).await {
            Ok(asset) => {
                tracing::debug!(
                    identifier = %item.identifier,
                    attempt,
                    elapsed = ?(inner.env.now() - started),
                    "asset cached"
                );
                inner.cache.put(item.identifier, asset, item.reference.source_url());
                return UnitOutcome::Cached;
            },
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                tracing::debug!(
                    identifier = %item.identifier,
                    attempt,
                    category = error.category(),
                    %error,
                    "asset fetch failed, retrying"
                );
                inner.env.sleep(inner.config.retry_backoff).await;
                attempt += 1;
            },
            Err(error) => {
                tracing::warn!(
                    identifier = %item.identifier,
                    attempts = attempt,
                    elapsed = ?(inner.env.now() - started),
                    category = error.category(),
                    %error,
                    "asset prefetch failed"
                );
                return UnitOutcome::Failed(error);
            },
        }
    }
}

async fn fetch_and_decode<F, D, E>(
    inner: &PrefetchInner<F, D, E>,
    reference: &AssetReference,
) -> Result<D::Asset, FetchError>
where
    F: AssetFetcher,
    D: AssetDecoder,
    E: Environment,
{
    let plaintext = inner.fetcher.fetch(reference).await?;

    let decoder = Arc::clone(&inner.decoder);
    tokio::task::spawn_blocking(move || decoder.decode(&plaintext))
        .await
        .map_err(|e| FetchError::Decode(format!("decode task failed: {e}")))?
}
