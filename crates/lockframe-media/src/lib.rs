//! Lockframe encrypted media prefetch.
//!
//! Keeps a local, observable cache of decrypted media assets (member avatars,
//! room images) consistent with the encrypted blobs referenced by room
//! membership data.
//!
//! # Architecture
//!
//! ```text
//! CandidateRecords ──→ resolver ──→ Prefetcher ──→ AssetFetcher ──→ AssetDecoder
//!                        │            │  (single-flight,   (GET + AEAD open)
//!                        │            │   bounded, retry)
//!                        ▼            ▼
//!                      CacheStore ◀───┘ put ──→ UrlChangeEvent subscribers
//! ```
//!
//! # Components
//!
//! - [`resolver`]: turns records into [`AssetReference`]s, drops invalid,
//!   duplicated and fresh entries
//! - [`AssetFetcher`]: fetch-and-decrypt capability, with
//!   [`DecryptingFetcher`] layered on any [`BlobSource`]
//! - [`AssetDecoder`]: plaintext bytes to displayable asset ([`ImageDecoder`])
//! - [`CacheStore`]: identifier-keyed store with change notifications
//! - [`SingleFlight`]: generic key → shared future table
//! - [`Prefetcher`]: the coordinator tying everything together
//!
//! Prefetching is best-effort: [`Prefetcher::prefetch_all`] never fails.
//! Per-asset failures are logged through `tracing` and listed in the returned
//! [`PrefetchReport`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod cache;
mod decoder;
pub mod env;
mod error;
mod fetcher;
#[cfg(feature = "http")]
pub mod http;
mod prefetcher;
mod reference;
pub mod resolver;
mod single_flight;
mod system_env;

pub use cache::{CacheEntry, CacheStore, DEFAULT_EVENT_CAPACITY, UrlChangeEvent};
pub use decoder::{AssetDecoder, ImageDecoder};
pub use error::{FetchError, ReferenceError};
pub use fetcher::{AssetFetcher, BlobSource, DecryptingFetcher, MemoryBlobSource};
#[cfg(feature = "http")]
pub use http::{HttpBlobSource, HttpConfig};
pub use prefetcher::{PrefetchConfig, PrefetchFailure, PrefetchReport, Prefetcher};
pub use reference::{AssetReference, CandidateRecord, GroupKey};
pub use resolver::ResolvedAsset;
pub use single_flight::{FlightAborted, Role, SingleFlight};
pub use system_env::SystemEnv;
