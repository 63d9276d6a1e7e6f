//! Environment abstraction for deterministic testing.
//!
//! Decouples retry timing from the system clock. Production uses
//! [`crate::SystemEnv`] (tokio timers); tests substitute an environment that
//! records requested sleeps and returns immediately.

use std::time::Duration;

/// Abstract environment providing time and async sleeping.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `sleep()` completes; a sleep that never resolves stalls the unit of work
///   that requested it (and every caller joined to it)
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only the retry backoff suspends on this.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
