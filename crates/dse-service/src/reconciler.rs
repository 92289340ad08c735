//! Archive reconciler: incremental gap detection and backfill.
//!
//! Gap detection is per-day, not per-instrument: a day is missing only when
//! the archive holds *zero* rows for it. Missing days need not be
//! contiguous; the reconciler fetches the single span from the earliest to
//! the latest missing day in one call, over-fetching any present days
//! interleaved inside the span. The overwrite-on-upsert keeps that correct;
//! a stricter implementation could fetch only the exact missing days at the
//! cost of more remote calls.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use dse_core::{ArchiveRecord, ArchiveStore, DateRange, InstrumentCode, MarketFetcher, Result};

/// The most recent archive record plus a duplicate-count diagnostic for its
/// `(date, code)` key. The store's uniqueness constraint should keep the
/// count at 1; anything higher indicates a constraint violation worth
/// surfacing.
#[derive(Clone, Debug, Serialize)]
pub struct LatestArchive {
    /// The most recent record by date.
    pub record: ArchiveRecord,
    /// How many rows share the record's `(date, code)` key.
    pub duplicate_count: u64,
}

/// Computes the calendar days inside `range` that have no presence in
/// `present`, ascending.
#[must_use]
pub fn missing_days(range: DateRange, present: &BTreeSet<NaiveDate>) -> Vec<NaiveDate> {
    range.days().filter(|day| !present.contains(day)).collect()
}

/// Reconciles requested archive ranges against persisted history, fetching
/// only what is missing.
pub struct ArchiveReconciler {
    fetcher: Arc<dyn MarketFetcher>,
    archive: Arc<dyn ArchiveStore>,
}

impl std::fmt::Debug for ArchiveReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReconciler")
            .field("fetcher", &self.fetcher.name())
            .finish_non_exhaustive()
    }
}

impl ArchiveReconciler {
    /// Creates a reconciler over the given adapter and archive store.
    #[must_use]
    pub fn new(fetcher: Arc<dyn MarketFetcher>, archive: Arc<dyn ArchiveStore>) -> Self {
        Self { fetcher, archive }
    }

    /// Returns every archive record in the inclusive range, backfilling
    /// missing days from the exchange first.
    ///
    /// Result is sorted by date ascending, then code. An inverted range
    /// yields an empty result without touching the network. An empty fetch
    /// for the gap (holiday, off day) is not a fault: whatever already
    /// existed is returned.
    #[instrument(skip(self), fields(range = %range))]
    pub async fn get_range(&self, range: DateRange) -> Result<Vec<ArchiveRecord>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }

        let existing = self.archive.query_range(range).await?;
        let present: BTreeSet<NaiveDate> = existing.iter().map(|r| r.date).collect();
        let missing = missing_days(range, &present);

        let (Some(span_start), Some(span_end)) =
            (missing.first().copied(), missing.last().copied())
        else {
            debug!(rows = existing.len(), "Range fully present, no fetch");
            return Ok(existing);
        };

        info!(
            missing = missing.len(),
            span = %DateRange::new(span_start, span_end),
            "Backfilling archive gap"
        );
        let fetched = self.fetcher.fetch_archive(span_start, span_end).await?;
        if fetched.is_empty() {
            // Legitimate for holidays and off days; serve what we have.
            warn!(span = %DateRange::new(span_start, span_end), "Gap fetch returned no rows");
            return Ok(existing);
        }

        self.archive.upsert_many(&fetched).await?;

        // Re-query post-merge so the caller sees the combined, sorted range.
        self.archive.query_range(range).await
    }

    /// Returns persisted records for one instrument inside the range.
    ///
    /// A pure filtered read: never triggers reconciliation, regardless of
    /// store contents. Code-scoped queries are assumed to follow a prior
    /// range-scoped warming call.
    #[instrument(skip(self), fields(code = %code, range = %range))]
    pub async fn get_range_for_code(
        &self,
        code: &InstrumentCode,
        range: DateRange,
    ) -> Result<Vec<ArchiveRecord>> {
        self.archive.query_range_for_code(code, range).await
    }

    /// Returns the most recent record with its duplicate-count diagnostic,
    /// or `None` while the archive is still empty.
    #[instrument(skip(self))]
    pub async fn latest(&self) -> Result<Option<LatestArchive>> {
        let Some(record) = self.archive.latest().await? else {
            return Ok(None);
        };
        let duplicate_count = self.archive.count_for_key(record.date, &record.code).await?;
        Ok(Some(LatestArchive {
            record,
            duplicate_count,
        }))
    }

    /// Fetches and upserts the whole range unconditionally, bypassing gap
    /// detection. The explicit-force escape hatch for completed days that
    /// must be re-scraped.
    #[instrument(skip(self), fields(range = %range))]
    pub async fn force_refresh(&self, range: DateRange) -> Result<usize> {
        if range.is_empty() {
            return Ok(0);
        }
        let fetched = self.fetcher.fetch_archive(range.start, range.end).await?;
        if fetched.is_empty() {
            warn!("Forced refresh returned no rows");
            return Ok(0);
        }
        self.archive.upsert_many(&fetched).await
    }
}
