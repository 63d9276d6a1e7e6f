//! Candidate record resolution.
//!
//! Filters a batch of records down to the assets that actually need a fetch:
//! the reference must be valid, the identifier must not repeat within the
//! batch, and the cache must be missing or stale for it.

use std::collections::HashSet;

use crate::{
    cache::CacheStore,
    reference::{AssetReference, CandidateRecord, GroupKey},
};

/// A record that needs fetching, with its validated reference.
#[derive(Debug, Clone)]
pub struct ResolvedAsset {
    /// Cache identifier
    pub identifier: String,
    /// Validated reference
    pub reference: AssetReference,
}

/// Resolve `candidates` into the work set for one prefetch pass.
///
/// Single pass, order preserving. The first record with a valid reference
/// claims its identifier; later records for the same identifier are skipped
/// even if they point elsewhere. Invalid references are skipped silently
/// (logged at debug) and do not claim the identifier.
pub fn resolve<A>(
    candidates: &[CandidateRecord],
    group_key: &GroupKey,
    cache: &CacheStore<A>,
) -> Vec<ResolvedAsset> {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut work = Vec::new();

    for record in candidates {
        if seen.contains(record.identifier.as_str()) {
            tracing::trace!(identifier = %record.identifier, "duplicate candidate skipped");
            continue;
        }

        let reference = match AssetReference::from_record(record, group_key) {
            Ok(reference) => reference,
            Err(error) => {
                tracing::debug!(identifier = %record.identifier, %error, "invalid asset reference");
                continue;
            },
        };

        seen.insert(record.identifier.as_str());

        if !cache.has_changed(reference.source_url(), &record.identifier) {
            continue;
        }

        work.push(ResolvedAsset { identifier: record.identifier.clone(), reference });
    }

    work
}
