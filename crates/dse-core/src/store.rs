//! Store traits for cached snapshots and the day-end archive.
//!
//! Both stores are the only shared mutable resources in the system. They are
//! relied upon for concurrency safety: per-key upserts are atomic, and the
//! service layer performs no in-process locking around them.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::types::{ArchiveRecord, CacheDocument, CacheKind, DateRange, InstrumentCode};

/// Keyed document store holding exactly one current snapshot per
/// [`CacheKind`].
///
/// `put` replaces the prior document wholesale and atomically: no reader
/// observes a payload without its matching `written_at`. No history is
/// retained.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Retrieves the current document for a kind, or `None` before the first
    /// successful fetch.
    async fn get(&self, kind: CacheKind) -> Result<Option<CacheDocument>>;

    /// Upserts the document for a kind.
    ///
    /// `written_at` must be the moment the payload was fetched, not the
    /// moment of this call.
    async fn put(
        &self,
        kind: CacheKind,
        payload: serde_json::Value,
        written_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Upsert store of historical per-instrument-per-day records.
///
/// Records are keyed by the `(date, code)` pair; the store enforces
/// uniqueness on that pair, so inserting an existing key overwrites rather
/// than erroring or duplicating.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Bulk-upserts records keyed by `(date, code)`; last write wins on
    /// conflict. Returns the number of records written.
    async fn upsert_many(&self, records: &[ArchiveRecord]) -> Result<usize>;

    /// Queries all records with date inside the inclusive range, sorted by
    /// date ascending then code ascending.
    async fn query_range(&self, range: DateRange) -> Result<Vec<ArchiveRecord>>;

    /// Queries records for one instrument inside the inclusive range, sorted
    /// by date ascending.
    async fn query_range_for_code(
        &self,
        code: &InstrumentCode,
        range: DateRange,
    ) -> Result<Vec<ArchiveRecord>>;

    /// Returns the most recent record by date (ties broken by code
    /// descending), or `None` when the archive is empty.
    async fn latest(&self) -> Result<Option<ArchiveRecord>>;

    /// Counts records stored under one `(date, code)` key.
    ///
    /// With the uniqueness constraint in place this is at most 1; the count
    /// is exposed as a diagnostic for the `/archive/latest` endpoint.
    async fn count_for_key(&self, date: NaiveDate, code: &InstrumentCode) -> Result<u64>;
}
