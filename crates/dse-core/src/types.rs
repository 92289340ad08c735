//! Core data types for exchange market data.
//!
//! This module defines the fundamental data structures:
//!
//! - [`InstrumentCode`] - Exchange ticker for a tradable security
//! - [`CacheKind`] - The four singleton snapshot caches
//! - [`CacheDocument`] - One cached snapshot with its write timestamp
//! - [`ArchiveRecord`] - Day-end row for one instrument on one trading day
//! - [`DateRange`] - Inclusive calendar day range used for archive queries
//! - Snapshot shapes returned by fetch adapters ([`LiveQuote`],
//!   [`BoardQuote`], [`MarketSummary`], [`NewsArticle`])

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DseError;

/// An exchange ticker identifying a tradable security.
///
/// Codes are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentCode(String);

impl InstrumentCode {
    /// Creates a new code from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstrumentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstrumentCode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for InstrumentCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for InstrumentCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The four singleton snapshot caches.
///
/// Each kind holds exactly one current [`CacheDocument`] at any time,
/// replaced wholesale on refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    /// Live share prices for the whole board.
    Live,
    /// DSE30 index constituents.
    Dse30,
    /// Top 20 traded shares.
    Top20,
    /// Homepage market indices and totals.
    Indices,
}

impl CacheKind {
    /// All cache kinds, in short-cycle refresh order.
    pub const ALL: [Self; 4] = [Self::Live, Self::Dse30, Self::Top20, Self::Indices];

    /// Returns the storage key for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Dse30 => "dse30",
            Self::Top20 => "top20",
            Self::Indices => "indices",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheKind {
    type Err = DseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Self::Live),
            "dse30" => Ok(Self::Dse30),
            "top20" => Ok(Self::Top20),
            "indices" => Ok(Self::Indices),
            other => Err(DseError::Parse(format!("Unknown cache kind: {other}"))),
        }
    }
}

/// One cached snapshot document.
///
/// `written_at` reflects the moment the payload was fetched from the
/// exchange, not the moment it was queried.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheDocument {
    /// Which singleton cache this document belongs to.
    pub kind: CacheKind,
    /// Opaque snapshot payload, serialized by the producing adapter.
    pub payload: serde_json::Value,
    /// When the payload was fetched.
    pub written_at: DateTime<Utc>,
}

/// Day-end archive row for one instrument on one trading day.
///
/// Identity is the `(date, code)` pair; a second record for the same pair
/// overwrites fields via upsert, never duplicates. Numeric fields are
/// nullable because the archive page renders blanks and dashes for
/// instruments that did not trade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    /// Trading day, exchange-local.
    pub date: NaiveDate,
    /// Instrument code, uppercase.
    pub code: InstrumentCode,
    /// Last traded price.
    pub ltp: Option<f64>,
    /// Day high.
    pub high: Option<f64>,
    /// Day low.
    pub low: Option<f64>,
    /// Opening price.
    pub open: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Yesterday's closing price.
    pub ycp: Option<f64>,
    /// Number of trades.
    pub trades: Option<i64>,
    /// Traded value in millions.
    pub value: Option<f64>,
    /// Traded volume in shares.
    pub volume: Option<i64>,
}

impl ArchiveRecord {
    /// Creates a record with the identity pair set and all prices null.
    #[must_use]
    pub fn new(date: NaiveDate, code: impl Into<InstrumentCode>) -> Self {
        Self {
            date,
            code: code.into(),
            ltp: None,
            high: None,
            low: None,
            open: None,
            close: None,
            ycp: None,
            trades: None,
            value: None,
            volume: None,
        }
    }
}

/// Inclusive calendar day range used as an archive query parameter.
///
/// Never persisted. A range with `start > end` is empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day, inclusive.
    pub start: NaiveDate,
    /// Last day, inclusive.
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new inclusive range.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Creates a single-day range.
    #[must_use]
    pub const fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Returns true if the range contains no days (`start > end`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Iterates every calendar day in the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// One row of the live share price board.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Last traded price.
    pub ltp: Option<f64>,
    /// Day high.
    pub high: Option<f64>,
    /// Day low.
    pub low: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Yesterday's closing price.
    pub ycp: Option<f64>,
    /// Price change since yesterday's close.
    pub change: Option<f64>,
    /// Number of trades so far today.
    pub trades: Option<i64>,
    /// Traded value in millions.
    pub value_mn: Option<f64>,
    /// Traded volume in shares.
    pub volume: Option<i64>,
    /// Lower circuit-breaker price limit.
    pub lower_limit: Option<f64>,
    /// Upper circuit-breaker price limit.
    pub upper_limit: Option<f64>,
}

/// One constituent row of an index board (DSE30 or Top 20).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardQuote {
    /// Instrument code.
    pub code: InstrumentCode,
    /// Last traded price.
    pub ltp: Option<f64>,
    /// Day high.
    pub high: Option<f64>,
    /// Day low.
    pub low: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Yesterday's closing price.
    pub ycp: Option<f64>,
    /// Percent change since yesterday's close, where the board shows one.
    pub change_percent: Option<f64>,
    /// Number of trades so far today.
    pub trades: Option<i64>,
    /// Traded value in millions.
    pub value_mn: Option<f64>,
    /// Traded volume in shares.
    pub volume: Option<i64>,
}

/// One market index reading from the exchange homepage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexValue {
    /// Index name (e.g. "DSEX").
    pub name: String,
    /// Current index value.
    pub value: Option<f64>,
    /// Point change since yesterday.
    pub change: Option<f64>,
    /// Percent change since yesterday.
    pub change_percent: Option<f64>,
}

/// Market-wide totals from the exchange homepage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketTotals {
    /// Total number of trades.
    pub total_trades: Option<i64>,
    /// Total traded volume in shares.
    pub total_volume: Option<i64>,
    /// Total traded value in millions.
    pub total_value_mn: Option<f64>,
    /// Issues that advanced.
    pub issues_advanced: Option<i64>,
    /// Issues that declined.
    pub issues_declined: Option<i64>,
    /// Issues that closed unchanged.
    pub issues_unchanged: Option<i64>,
}

/// Homepage indices snapshot: index readings plus market totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    /// Index readings, in homepage order.
    pub indices: Vec<IndexValue>,
    /// Market-wide totals.
    pub totals: MarketTotals,
}

/// A business news article scraped from the exchange news page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Article headline.
    pub title: String,
    /// Publication date, where the page shows one.
    pub published: Option<NaiveDate>,
    /// Link to the full article.
    pub url: Option<String>,
    /// Article summary or lead paragraph.
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_code_uppercases() {
        assert_eq!(InstrumentCode::new("grameenphone").as_str(), "GRAMEENPHONE");
        assert_eq!(InstrumentCode::new(" acbank ").as_str(), "ACBANK");
    }

    #[test]
    fn cache_kind_round_trips() {
        for kind in CacheKind::ALL {
            assert_eq!(kind.as_str().parse::<CacheKind>().unwrap(), kind);
        }
        assert!("nope".parse::<CacheKind>().is_err());
    }

    #[test]
    fn date_range_days_inclusive() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        );
        let days: Vec<_> = range.days().collect();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0], range.start);
        assert_eq!(days[2], range.end);
    }

    #[test]
    fn inverted_date_range_is_empty() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        assert!(range.is_empty());
        assert_eq!(range.days().count(), 0);
    }
}
