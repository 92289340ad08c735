//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dse_core::{
    ArchiveRecord, ArchiveStore, CacheDocument, CacheKind, CacheStore, DateRange, DseError,
    InstrumentCode, Result,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, instrument};

/// SQLite-backed cache and archive store.
///
/// Stores data in a single database file, providing persistence across
/// restarts. Snapshot payloads are kept as JSON text; archive rows are
/// relational with a primary key on `(date, code)`, so an insert on an
/// existing key is an overwrite, never a duplicate.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new SQLite store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation
    /// fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| DseError::Store(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DseError::Store(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| DseError::Store(e.to_string()))?;

        // One row per cache kind; put replaces the whole row in one
        // statement, so payload and written_at always change together.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS snapshot_cache (
                kind TEXT NOT NULL PRIMARY KEY,
                payload TEXT NOT NULL,
                written_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| DseError::Store(e.to_string()))?;

        // The (date, code) primary key is the uniqueness constraint the
        // reconciler relies on.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS archive (
                date TEXT NOT NULL,
                code TEXT NOT NULL,
                ltp REAL,
                high REAL,
                low REAL,
                open REAL,
                close REAL,
                ycp REAL,
                trades INTEGER,
                value REAL,
                volume INTEGER,
                PRIMARY KEY (date, code)
            )",
            [],
        )
        .map_err(|e| DseError::Store(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_archive_date ON archive(date)",
            [],
        )
        .map_err(|e| DseError::Store(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<(String, ArchiveRecord)> {
        let date_str: String = row.get(0)?;
        let code: String = row.get(1)?;
        let record = ArchiveRecord {
            date: NaiveDate::default(),
            code: InstrumentCode::new(&code),
            ltp: row.get(2)?,
            high: row.get(3)?,
            low: row.get(4)?,
            open: row.get(5)?,
            close: row.get(6)?,
            ycp: row.get(7)?,
            trades: row.get(8)?,
            value: row.get(9)?,
            volume: row.get(10)?,
        };
        Ok((date_str, record))
    }

    fn collect_records(rows: Vec<(String, ArchiveRecord)>) -> Result<Vec<ArchiveRecord>> {
        rows.into_iter()
            .map(|(date_str, mut record)| {
                record.date = date_str
                    .parse()
                    .map_err(|e| DseError::Parse(format!("Bad archive date {date_str}: {e}")))?;
                Ok(record)
            })
            .collect()
    }
}

const RECORD_COLUMNS: &str = "date, code, ltp, high, low, open, close, ycp, trades, value, volume";

#[async_trait]
impl CacheStore for SqliteStore {
    #[instrument(skip(self), fields(kind = %kind))]
    async fn get(&self, kind: CacheKind) -> Result<Option<CacheDocument>> {
        let conn = self.conn.lock().map_err(|e| DseError::Store(e.to_string()))?;

        let result = conn
            .query_row(
                "SELECT payload, written_at FROM snapshot_cache WHERE kind = ?1",
                params![kind.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| DseError::Store(e.to_string()))?;

        match result {
            Some((payload_json, written_at)) => {
                let payload = serde_json::from_str(&payload_json)
                    .map_err(|e| DseError::Parse(e.to_string()))?;
                let written_at = DateTime::parse_from_rfc3339(&written_at)
                    .map_err(|e| DseError::Parse(format!("Bad written_at: {e}")))?
                    .with_timezone(&Utc);
                debug!("Cache hit");
                Ok(Some(CacheDocument {
                    kind,
                    payload,
                    written_at,
                }))
            }
            None => {
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, payload), fields(kind = %kind))]
    async fn put(
        &self,
        kind: CacheKind,
        payload: serde_json::Value,
        written_at: DateTime<Utc>,
    ) -> Result<()> {
        let payload_json =
            serde_json::to_string(&payload).map_err(|e| DseError::Parse(e.to_string()))?;

        let conn = self.conn.lock().map_err(|e| DseError::Store(e.to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO snapshot_cache (kind, payload, written_at)
             VALUES (?1, ?2, ?3)",
            params![kind.as_str(), payload_json, written_at.to_rfc3339()],
        )
        .map_err(|e| DseError::Store(e.to_string()))?;

        debug!("Cache document replaced");
        Ok(())
    }
}

#[async_trait]
impl ArchiveStore for SqliteStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_many(&self, records: &[ArchiveRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let conn = self.conn.lock().map_err(|e| DseError::Store(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| DseError::Store(e.to_string()))?;

        for record in records {
            tx.execute(
                "INSERT OR REPLACE INTO archive
                 (date, code, ltp, high, low, open, close, ycp, trades, value, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.date.to_string(),
                    record.code.as_str(),
                    record.ltp,
                    record.high,
                    record.low,
                    record.open,
                    record.close,
                    record.ycp,
                    record.trades,
                    record.value,
                    record.volume
                ],
            )
            .map_err(|e| DseError::Store(e.to_string()))?;
        }

        tx.commit().map_err(|e| DseError::Store(e.to_string()))?;
        debug!("Upserted {} archive records", records.len());
        Ok(records.len())
    }

    #[instrument(skip(self), fields(range = %range))]
    async fn query_range(&self, range: DateRange) -> Result<Vec<ArchiveRecord>> {
        let conn = self.conn.lock().map_err(|e| DseError::Store(e.to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM archive
                 WHERE date >= ?1 AND date <= ?2
                 ORDER BY date ASC, code ASC"
            ))
            .map_err(|e| DseError::Store(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![range.start.to_string(), range.end.to_string()],
                Self::row_to_record,
            )
            .map_err(|e| DseError::Store(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| DseError::Store(e.to_string()))?;

        debug!("Found {} archive rows", rows.len());
        Self::collect_records(rows)
    }

    #[instrument(skip(self), fields(code = %code, range = %range))]
    async fn query_range_for_code(
        &self,
        code: &InstrumentCode,
        range: DateRange,
    ) -> Result<Vec<ArchiveRecord>> {
        let conn = self.conn.lock().map_err(|e| DseError::Store(e.to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM archive
                 WHERE code = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC"
            ))
            .map_err(|e| DseError::Store(e.to_string()))?;

        let rows = stmt
            .query_map(
                params![
                    code.as_str(),
                    range.start.to_string(),
                    range.end.to_string()
                ],
                Self::row_to_record,
            )
            .map_err(|e| DseError::Store(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| DseError::Store(e.to_string()))?;

        debug!("Found {} archive rows for {}", rows.len(), code);
        Self::collect_records(rows)
    }

    #[instrument(skip(self))]
    async fn latest(&self) -> Result<Option<ArchiveRecord>> {
        let conn = self.conn.lock().map_err(|e| DseError::Store(e.to_string()))?;

        let row = conn
            .query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM archive
                     ORDER BY date DESC, code DESC LIMIT 1"
                ),
                [],
                Self::row_to_record,
            )
            .optional()
            .map_err(|e| DseError::Store(e.to_string()))?;

        match row {
            Some(pair) => Ok(Self::collect_records(vec![pair])?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(date = %date, code = %code))]
    async fn count_for_key(&self, date: NaiveDate, code: &InstrumentCode) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| DseError::Store(e.to_string()))?;

        let count: u64 = conn
            .query_row(
                "SELECT COUNT(*) FROM archive WHERE date = ?1 AND code = ?2",
                params![date.to_string(), code.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| DseError::Store(e.to_string()))?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn record(d: u32, code: &str, close: f64) -> ArchiveRecord {
        ArchiveRecord {
            close: Some(close),
            ..ArchiveRecord::new(day(d), code)
        }
    }

    #[tokio::test]
    async fn store_initializes() {
        assert!(SqliteStore::in_memory().is_ok());
    }

    #[tokio::test]
    async fn cache_put_then_get_returns_exact_document() {
        let store = SqliteStore::in_memory().unwrap();
        let written_at = Utc::now();
        let payload = serde_json::json!([{"code": "ACBANK", "ltp": 12.5}]);

        assert!(store.get(CacheKind::Live).await.unwrap().is_none());

        store
            .put(CacheKind::Live, payload.clone(), written_at)
            .await
            .unwrap();

        let doc = store.get(CacheKind::Live).await.unwrap().unwrap();
        assert_eq!(doc.kind, CacheKind::Live);
        assert_eq!(doc.payload, payload);
        assert_eq!(doc.written_at, written_at);
    }

    #[tokio::test]
    async fn cache_kinds_do_not_collide() {
        let store = SqliteStore::in_memory().unwrap();
        let now = Utc::now();

        store
            .put(CacheKind::Live, serde_json::json!("live"), now)
            .await
            .unwrap();
        store
            .put(CacheKind::Top20, serde_json::json!("top20"), now)
            .await
            .unwrap();

        let live = store.get(CacheKind::Live).await.unwrap().unwrap();
        assert_eq!(live.payload, serde_json::json!("live"));
        assert!(store.get(CacheKind::Dse30).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cache_put_replaces_wholesale_last_write_wins() {
        let store = SqliteStore::in_memory().unwrap();
        let t1 = Utc::now();
        let t2 = t1 + TimeDelta::seconds(30);

        // The write carrying the later fetch timestamp lands first; the
        // older fetch still physically executes last and wins.
        store
            .put(CacheKind::Live, serde_json::json!("newer"), t2)
            .await
            .unwrap();
        store
            .put(CacheKind::Live, serde_json::json!("older"), t1)
            .await
            .unwrap();

        let doc = store.get(CacheKind::Live).await.unwrap().unwrap();
        assert_eq!(doc.payload, serde_json::json!("older"));
        assert_eq!(doc.written_at, t1);
    }

    #[tokio::test]
    async fn archive_upsert_is_idempotent() {
        let store = SqliteStore::in_memory().unwrap();
        let first = record(3, "acbank", 10.0);

        store.upsert_many(std::slice::from_ref(&first)).await.unwrap();
        store.upsert_many(&[first.clone()]).await.unwrap();

        assert_eq!(
            store.count_for_key(day(3), &first.code).await.unwrap(),
            1
        );

        // Same key with different fields overwrites, never duplicates.
        let updated = record(3, "ACBANK", 11.5);
        store.upsert_many(&[updated]).await.unwrap();

        let rows = store
            .query_range(DateRange::single(day(3)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].close, Some(11.5));
    }

    #[tokio::test]
    async fn query_range_sorts_by_date_then_code() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_many(&[
                record(5, "ZEALBANGLA", 1.0),
                record(3, "BEXIMCO", 2.0),
                record(5, "ACBANK", 3.0),
                record(7, "GP", 4.0),
            ])
            .await
            .unwrap();

        let rows = store
            .query_range(DateRange::new(day(3), day(6)))
            .await
            .unwrap();
        let keys: Vec<_> = rows
            .iter()
            .map(|r| (r.date, r.code.as_str().to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (day(3), "BEXIMCO".to_string()),
                (day(5), "ACBANK".to_string()),
                (day(5), "ZEALBANGLA".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn query_range_for_code_filters_exactly() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_many(&[
                record(1, "ACBANK", 1.0),
                record(2, "ACBANK", 2.0),
                record(2, "GP", 9.0),
                record(9, "ACBANK", 3.0),
            ])
            .await
            .unwrap();

        let rows = store
            .query_range_for_code(&InstrumentCode::new("acbank"), DateRange::new(day(1), day(5)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.code.as_str() == "ACBANK"));
        assert_eq!(rows[0].date, day(1));
        assert_eq!(rows[1].date, day(2));
    }

    #[tokio::test]
    async fn latest_returns_most_recent_by_date() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.latest().await.unwrap().is_none());

        store
            .upsert_many(&[
                record(1, "GP", 1.0),
                record(9, "ACBANK", 2.0),
                record(4, "BEXIMCO", 3.0),
            ])
            .await
            .unwrap();

        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.date, day(9));
        assert_eq!(latest.code.as_str(), "ACBANK");
    }

    #[tokio::test]
    async fn nullable_fields_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let mut rec = ArchiveRecord::new(day(2), "NAVANACNG");
        rec.trades = Some(120);
        rec.volume = None;
        rec.value = Some(3.25);

        store.upsert_many(&[rec]).await.unwrap();
        let rows = store
            .query_range(DateRange::single(day(2)))
            .await
            .unwrap();
        assert_eq!(rows[0].trades, Some(120));
        assert_eq!(rows[0].volume, None);
        assert_eq!(rows[0].ltp, None);
        assert_eq!(rows[0].value, Some(3.25));
    }
}
