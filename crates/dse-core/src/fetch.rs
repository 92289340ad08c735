//! Fetch adapter trait for pulling data from the exchange website.
//!
//! The service core treats fetching as an opaque, typed operation: each
//! method returns a fully shaped snapshot or fails. Adapters may legitimately
//! return empty collections (holidays, off days, empty boards); callers must
//! not treat an empty result as a fault.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Debug;

use crate::error::Result;
use crate::types::{ArchiveRecord, BoardQuote, LiveQuote, MarketSummary, NewsArticle};

/// Adapter producing typed snapshots from the exchange website.
///
/// Implementations are black boxes to the service core: they may fail or
/// return partial/empty results, and they enforce no freshness semantics of
/// their own.
#[async_trait]
pub trait MarketFetcher: Send + Sync + Debug {
    /// Returns the name of this fetcher (e.g. "dsebd.org").
    fn name(&self) -> &str;

    /// Fetches the live share price board.
    async fn fetch_live(&self) -> Result<Vec<LiveQuote>>;

    /// Fetches the DSE30 index constituent board.
    async fn fetch_dse30(&self) -> Result<Vec<BoardQuote>>;

    /// Fetches the Top 20 traded shares board.
    async fn fetch_top20(&self) -> Result<Vec<BoardQuote>>;

    /// Fetches homepage market indices and totals.
    async fn fetch_indices(&self) -> Result<MarketSummary>;

    /// Fetches the latest business news articles.
    async fn fetch_news(&self) -> Result<Vec<NewsArticle>>;

    /// Fetches day-end archive rows for the inclusive `[start, end]` span.
    ///
    /// One blocking round-trip against the archive page; no chunking.
    async fn fetch_archive(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ArchiveRecord>>;
}
