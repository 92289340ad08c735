#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the DSE market data service.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`MarketFetcher`](fetch::MarketFetcher) - Opaque fetch adapter for the
//!   exchange website
//! - [`CacheStore`](store::CacheStore) - Singleton snapshot documents keyed
//!   by [`CacheKind`](types::CacheKind)
//! - [`ArchiveStore`](store::ArchiveStore) - Day-end history keyed by
//!   `(date, code)`
//! - [`FreshnessPolicy`](freshness::FreshnessPolicy) - Pure staleness
//!   decision for cached snapshots

/// Error types for market data operations.
pub mod error;
/// Fetch adapter trait for the exchange website.
pub mod fetch;
/// Freshness policy for cached snapshots.
pub mod freshness;
/// Store traits for snapshots and the archive.
pub mod store;
/// Core data types (codes, records, snapshots).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{DseError, Result};
pub use fetch::MarketFetcher;
pub use freshness::{DEFAULT_TTL, FreshnessPolicy};
pub use store::{ArchiveStore, CacheStore};
pub use types::{
    ArchiveRecord, BoardQuote, CacheDocument, CacheKind, DateRange, IndexValue, InstrumentCode,
    LiveQuote, MarketSummary, MarketTotals, NewsArticle,
};
