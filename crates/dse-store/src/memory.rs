//! In-memory store implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dse_core::{
    ArchiveRecord, ArchiveStore, CacheDocument, CacheKind, CacheStore, DateRange, InstrumentCode,
    Result,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

/// Archive key: date first so a `BTreeMap` range scan walks the requested
/// span in date order, with codes sorted inside each day.
type ArchiveKey = (NaiveDate, InstrumentCode);

/// Simple in-memory store for testing and no-persistence runs.
///
/// Data is held in `RwLock`-protected maps and lost on drop. Documents and
/// records are cloned on get/put.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cache: RwLock<HashMap<CacheKind, CacheDocument>>,
    archive: RwLock<BTreeMap<ArchiveKey, ArchiveRecord>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, kind: CacheKind) -> Result<Option<CacheDocument>> {
        let cache = self.cache.read().await;
        Ok(cache.get(&kind).cloned())
    }

    async fn put(
        &self,
        kind: CacheKind,
        payload: serde_json::Value,
        written_at: DateTime<Utc>,
    ) -> Result<()> {
        let doc = CacheDocument {
            kind,
            payload,
            written_at,
        };
        let mut cache = self.cache.write().await;
        cache.insert(kind, doc);
        debug!(kind = %kind, "Cache document replaced");
        Ok(())
    }
}

#[async_trait]
impl ArchiveStore for MemoryStore {
    async fn upsert_many(&self, records: &[ArchiveRecord]) -> Result<usize> {
        let mut archive = self.archive.write().await;
        for record in records {
            archive.insert((record.date, record.code.clone()), record.clone());
        }
        debug!("Upserted {} archive records", records.len());
        Ok(records.len())
    }

    async fn query_range(&self, range: DateRange) -> Result<Vec<ArchiveRecord>> {
        if range.is_empty() {
            return Ok(Vec::new());
        }
        let archive = self.archive.read().await;
        let lo = (range.start, InstrumentCode::default());
        Ok(archive
            .range(lo..)
            .take_while(|((date, _), _)| *date <= range.end)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn query_range_for_code(
        &self,
        code: &InstrumentCode,
        range: DateRange,
    ) -> Result<Vec<ArchiveRecord>> {
        let rows = self.query_range(range).await?;
        Ok(rows.into_iter().filter(|r| &r.code == code).collect())
    }

    async fn latest(&self) -> Result<Option<ArchiveRecord>> {
        let archive = self.archive.read().await;
        Ok(archive.values().next_back().cloned())
    }

    async fn count_for_key(&self, date: NaiveDate, code: &InstrumentCode) -> Result<u64> {
        let archive = self.archive.read().await;
        Ok(u64::from(archive.contains_key(&(date, code.clone()))))
    }
}
