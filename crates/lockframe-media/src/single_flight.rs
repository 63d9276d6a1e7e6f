//! Per-key single-flight execution.
//!
//! At most one unit of work runs per key at any instant. Callers arriving
//! while a unit is in flight join it and receive a clone of its output
//! instead of starting their own.

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;

/// How a caller took part in a flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Started the unit of work
    Leader,
    /// Joined a unit already in flight
    Follower,
}

type FlightOutput<T> = Result<T, FlightAborted>;

struct Flight<T> {
    id: u64,
    future: Shared<BoxFuture<'static, FlightOutput<T>>>,
}

type FlightTable<K, T> = Arc<Mutex<HashMap<K, Flight<T>>>>;

/// A unit of work ended without producing output (it panicked, or the
/// runtime shut down under it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("in-flight unit aborted")]
pub struct FlightAborted;

/// Table of in-flight units of work keyed by `K`.
///
/// # Invariants
///
/// - At most one entry per key
/// - An entry is removed by its own unit of work on completion, whatever the
///   output (including a panic), so the next caller for that key starts a
///   fresh unit
/// - The table lock is never held across an await
///
/// Each unit runs on its own tokio task. Dropping every caller does not stop
/// it: the unit finishes, releases whatever it holds and leaves the table.
/// Must be used inside a tokio runtime.
pub struct SingleFlight<K, T> {
    flights: FlightTable<K, T>,
    next_id: AtomicU64,
}

impl<K, T> Default for SingleFlight<K, T> {
    fn default() -> Self {
        Self { flights: Arc::new(Mutex::new(HashMap::new())), next_id: AtomicU64::new(0) }
    }
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `make()` for `key` unless a unit for `key` is already in flight,
    /// in which case wait for that unit instead.
    ///
    /// `make` is only called by the leader, while the table lock is held, so
    /// it must only construct the future, not do work. The future is spawned
    /// and runs to completion even if this call is dropped.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> (FlightOutput<T>, Role)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (future, role) = {
            let mut flights = lock(&self.flights);

            if let Some(flight) = flights.get(&key) {
                (flight.future.clone(), Role::Follower)
            } else {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let guard = FinishGuard { table: Arc::clone(&self.flights), key: key.clone(), id };
                let work = make();

                let task = tokio::spawn(async move {
                    let _guard = guard;
                    work.await
                });

                let future = async move { task.await.map_err(|_| FlightAborted) }.boxed().shared();

                flights.insert(key, Flight { id, future: future.clone() });
                (future, Role::Leader)
            }
        };

        (future.await, role)
    }

    /// Check whether a unit is in flight for `key`.
    pub fn in_flight(&self, key: &K) -> bool {
        lock(&self.flights).contains_key(key)
    }

    /// Number of units in flight.
    pub fn len(&self) -> usize {
        lock(&self.flights).len()
    }

    /// Check if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        lock(&self.flights).is_empty()
    }
}

/// Removes the entry for `key` on drop if it still belongs to flight `id`.
struct FinishGuard<K: Eq + Hash, T> {
    table: FlightTable<K, T>,
    key: K,
    id: u64,
}

impl<K: Eq + Hash, T> Drop for FinishGuard<K, T> {
    fn drop(&mut self) {
        let mut flights = lock(&self.table);
        if flights.get(&self.key).is_some_and(|flight| flight.id == self.id) {
            flights.remove(&self.key);
        }
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
