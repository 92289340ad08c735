//! Test doubles shared by the service tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use dse_core::{
    ArchiveRecord, BoardQuote, CacheDocument, CacheKind, CacheStore, DseError, IndexValue,
    InstrumentCode, LiveQuote, MarketFetcher, MarketSummary, NewsArticle, Result,
};

/// Scripted fetch adapter recording its calls.
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    live: Vec<LiveQuote>,
    fail_live: bool,
    fail_all: bool,
    live_calls: AtomicUsize,
    archive_responses: Mutex<VecDeque<Vec<ArchiveRecord>>>,
    archive_calls: Mutex<Vec<(NaiveDate, NaiveDate)>>,
}

impl MockFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A fetcher serving live quotes for the given codes and single-row
    /// boards.
    pub(crate) fn with_live(codes: Vec<&str>) -> Self {
        Self {
            live: codes
                .into_iter()
                .map(|code| LiveQuote {
                    code: InstrumentCode::new(code),
                    ltp: Some(10.0),
                    ..LiveQuote::default()
                })
                .collect(),
            ..Self::default()
        }
    }

    /// A fetcher whose every method fails with a network error.
    pub(crate) fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Makes only the live fetch fail.
    pub(crate) fn failing_live(mut self) -> Self {
        self.fail_live = true;
        self
    }

    /// Queues one archive response; consumed in call order. With the queue
    /// exhausted the fetcher returns no rows.
    pub(crate) fn with_archive_response(self, records: Vec<ArchiveRecord>) -> Self {
        self.archive_responses
            .lock()
            .expect("mock poisoned")
            .push_back(records);
        self
    }

    pub(crate) fn live_calls(&self) -> usize {
        self.live_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn archive_calls(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.archive_calls.lock().expect("mock poisoned").clone()
    }

    fn down(&self) -> DseError {
        DseError::Network("mock adapter down".to_string())
    }
}

#[async_trait]
impl MarketFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_live(&self) -> Result<Vec<LiveQuote>> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || self.fail_live {
            return Err(self.down());
        }
        Ok(self.live.clone())
    }

    async fn fetch_dse30(&self) -> Result<Vec<BoardQuote>> {
        if self.fail_all {
            return Err(self.down());
        }
        Ok(vec![BoardQuote {
            code: InstrumentCode::new("GP"),
            ..BoardQuote::default()
        }])
    }

    async fn fetch_top20(&self) -> Result<Vec<BoardQuote>> {
        if self.fail_all {
            return Err(self.down());
        }
        Ok(vec![BoardQuote {
            code: InstrumentCode::new("ACBANK"),
            ..BoardQuote::default()
        }])
    }

    async fn fetch_indices(&self) -> Result<MarketSummary> {
        if self.fail_all {
            return Err(self.down());
        }
        Ok(MarketSummary {
            indices: vec![IndexValue {
                name: "DSEX".to_string(),
                value: Some(5432.1),
                ..IndexValue::default()
            }],
            ..MarketSummary::default()
        })
    }

    async fn fetch_news(&self) -> Result<Vec<NewsArticle>> {
        if self.fail_all {
            return Err(self.down());
        }
        Ok(vec![NewsArticle {
            title: "Market rises".to_string(),
            ..NewsArticle::default()
        }])
    }

    async fn fetch_archive(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ArchiveRecord>> {
        self.archive_calls
            .lock()
            .expect("mock poisoned")
            .push((start, end));
        if self.fail_all {
            return Err(self.down());
        }
        Ok(self
            .archive_responses
            .lock()
            .expect("mock poisoned")
            .pop_front()
            .unwrap_or_default())
    }
}

/// Cache store whose writes always fail; reads see nothing.
#[derive(Debug, Default)]
pub(crate) struct FailingCacheStore;

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _kind: CacheKind) -> Result<Option<CacheDocument>> {
        Ok(None)
    }

    async fn put(
        &self,
        _kind: CacheKind,
        _payload: serde_json::Value,
        _written_at: DateTime<Utc>,
    ) -> Result<()> {
        Err(DseError::Store("cache store unavailable".to_string()))
    }
}
