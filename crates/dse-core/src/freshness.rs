//! Freshness policy for cached snapshots.
//!
//! A pure decision function: given a cache document's write timestamp and
//! the current time, decide whether a read may be served from cache or must
//! trigger a fetch. Archive data has no TTL; its freshness is presence-based
//! and handled by the reconciler.

use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

use crate::types::CacheDocument;

/// Default freshness window for the live/index caches.
///
/// Matches the scheduled refresh cadence, so under normal operation reads
/// never trigger an inline fetch.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Decides whether a cached snapshot may still be served.
#[derive(Clone, Copy, Debug)]
pub struct FreshnessPolicy {
    ttl: Duration,
}

impl FreshnessPolicy {
    /// Creates a policy with the given freshness window.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Returns the freshness window.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A document is fresh iff it exists and `now - written_at < ttl`.
    ///
    /// Pure; no side effects. Two callers simultaneously observing "stale"
    /// and both fetching is tolerated by design, since cache writes are
    /// idempotent overwrites.
    #[must_use]
    pub fn is_fresh(&self, doc: Option<&CacheDocument>, now: DateTime<Utc>) -> bool {
        let Some(doc) = doc else {
            return false;
        };
        let age = now.signed_duration_since(doc.written_at);
        age < TimeDelta::from_std(self.ttl).unwrap_or(TimeDelta::MAX)
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
