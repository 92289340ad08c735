//! Snapshot service: freshness-aware cached reads and write-through refresh.
//!
//! Read path: a fresh cache document is served as-is; a stale or missing one
//! triggers a fetch that is written through before responding. Two readers
//! simultaneously observing "stale" may both fetch; the resulting double
//! write is an idempotent overwrite and is tolerated rather than prevented.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use dse_core::{
    CacheDocument, CacheKind, CacheStore, DseError, FreshnessPolicy, LiveQuote, MarketFetcher,
    NewsArticle, Result,
};

/// Freshness-aware facade over the cache store and the fetch adapter.
pub struct SnapshotService {
    fetcher: Arc<dyn MarketFetcher>,
    cache: Arc<dyn CacheStore>,
    policy: FreshnessPolicy,
}

impl std::fmt::Debug for SnapshotService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotService")
            .field("fetcher", &self.fetcher.name())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl SnapshotService {
    /// Creates a service over the given adapter and cache store.
    #[must_use]
    pub fn new(
        fetcher: Arc<dyn MarketFetcher>,
        cache: Arc<dyn CacheStore>,
        policy: FreshnessPolicy,
    ) -> Self {
        Self {
            fetcher,
            cache,
            policy,
        }
    }

    /// Serves the current document for a kind, fetching inline when the
    /// cache is stale or empty.
    ///
    /// On a stale-or-missing cache the snapshot is fetched, stamped with the
    /// fetch time, and written through. A write-back failure on this
    /// request-bound path is logged and the freshly fetched payload is still
    /// returned; the read path is not blocked by cache durability. When the
    /// fetch itself fails but a stale document exists, the stale document is
    /// served (a failed remote cycle means "no new data", not "no data").
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn get_or_refresh(&self, kind: CacheKind) -> Result<CacheDocument> {
        let cached = match self.cache.get(kind).await? {
            Some(doc) if self.policy.is_fresh(Some(&doc), Utc::now()) => {
                debug!("Serving fresh cache document");
                return Ok(doc);
            }
            other => other,
        };

        match self.fetch_payload(kind).await {
            Ok((payload, items)) => {
                let written_at = Utc::now();
                if let Err(e) = self.cache.put(kind, payload.clone(), written_at).await {
                    warn!(error = %e, "Cache write-back failed; serving fetched payload");
                }
                debug!(items, "Refreshed cache inline");
                Ok(CacheDocument {
                    kind,
                    payload,
                    written_at,
                })
            }
            Err(e) => match cached {
                Some(doc) => {
                    warn!(error = %e, "Fetch failed; serving stale cache document");
                    Ok(doc)
                }
                None => Err(e),
            },
        }
    }

    /// Unconditionally fetches a snapshot and writes it through.
    ///
    /// Returns the number of items in the snapshot. Unlike the request-bound
    /// path, a failed cache write here is an error: a scheduled refresh that
    /// fetched but could not persist must not report success.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn refresh(&self, kind: CacheKind) -> Result<usize> {
        let (payload, items) = self.fetch_payload(kind).await?;
        self.cache.put(kind, payload, Utc::now()).await?;
        Ok(items)
    }

    /// Fetches a single live quote directly from the exchange, bypassing the
    /// cache entirely.
    #[instrument(skip(self))]
    pub async fn live_quote(&self, code: &str) -> Result<LiveQuote> {
        let wanted = code.trim().to_uppercase();
        let quotes = self.fetcher.fetch_live().await?;
        quotes
            .into_iter()
            .find(|q| q.code.as_str() == wanted)
            .ok_or_else(|| DseError::NotFound(format!("Stock '{wanted}' not found")))
    }

    /// Fetches the latest business news directly; never cached.
    #[instrument(skip(self))]
    pub async fn news(&self) -> Result<Vec<NewsArticle>> {
        self.fetcher.fetch_news().await
    }

    /// Fetches and serializes the snapshot for a kind, returning the payload
    /// and its item count.
    async fn fetch_payload(&self, kind: CacheKind) -> Result<(serde_json::Value, usize)> {
        fn to_value<T: serde::Serialize>(snapshot: &T) -> Result<serde_json::Value> {
            serde_json::to_value(snapshot).map_err(|e| DseError::Parse(e.to_string()))
        }

        match kind {
            CacheKind::Live => {
                let quotes = self.fetcher.fetch_live().await?;
                Ok((to_value(&quotes)?, quotes.len()))
            }
            CacheKind::Dse30 => {
                let quotes = self.fetcher.fetch_dse30().await?;
                Ok((to_value(&quotes)?, quotes.len()))
            }
            CacheKind::Top20 => {
                let quotes = self.fetcher.fetch_top20().await?;
                Ok((to_value(&quotes)?, quotes.len()))
            }
            CacheKind::Indices => {
                let summary = self.fetcher.fetch_indices().await?;
                Ok((to_value(&summary)?, summary.indices.len()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingCacheStore, MockFetcher};
    use chrono::TimeDelta;
    use dse_store::MemoryStore;
    use std::time::Duration;

    fn service(fetcher: Arc<MockFetcher>, cache: Arc<MemoryStore>) -> SnapshotService {
        SnapshotService::new(fetcher, cache, FreshnessPolicy::new(Duration::from_secs(60)))
    }

    #[tokio::test]
    async fn cold_start_fetches_and_writes_through() {
        let fetcher = Arc::new(MockFetcher::with_live(vec!["ACBANK", "GP"]));
        let cache = Arc::new(MemoryStore::new());
        let svc = service(Arc::clone(&fetcher), Arc::clone(&cache));

        let doc = svc.get_or_refresh(CacheKind::Live).await.unwrap();
        assert_eq!(doc.kind, CacheKind::Live);
        assert_eq!(doc.payload.as_array().unwrap().len(), 2);
        assert_eq!(fetcher.live_calls(), 1);

        // The document is now persisted for subsequent readers.
        let stored = cache.get(CacheKind::Live).await.unwrap().unwrap();
        assert_eq!(stored.payload, doc.payload);
        assert_eq!(stored.written_at, doc.written_at);
    }

    #[tokio::test]
    async fn fresh_document_served_without_fetch() {
        let fetcher = Arc::new(MockFetcher::with_live(vec!["ACBANK"]));
        let cache = Arc::new(MemoryStore::new());
        let payload = serde_json::json!(["cached"]);
        cache
            .put(CacheKind::Live, payload.clone(), Utc::now())
            .await
            .unwrap();

        let svc = service(Arc::clone(&fetcher), cache);
        let doc = svc.get_or_refresh(CacheKind::Live).await.unwrap();
        assert_eq!(doc.payload, payload);
        assert_eq!(fetcher.live_calls(), 0);
    }

    #[tokio::test]
    async fn stale_document_triggers_refetch() {
        let fetcher = Arc::new(MockFetcher::with_live(vec!["ACBANK"]));
        let cache = Arc::new(MemoryStore::new());
        cache
            .put(
                CacheKind::Live,
                serde_json::json!(["old"]),
                Utc::now() - TimeDelta::seconds(120),
            )
            .await
            .unwrap();

        let svc = service(Arc::clone(&fetcher), cache);
        let doc = svc.get_or_refresh(CacheKind::Live).await.unwrap();
        assert_eq!(fetcher.live_calls(), 1);
        assert_ne!(doc.payload, serde_json::json!(["old"]));
    }

    #[tokio::test]
    async fn fetch_failure_serves_stale_document() {
        let fetcher = Arc::new(MockFetcher::failing());
        let cache = Arc::new(MemoryStore::new());
        let stale = serde_json::json!(["stale"]);
        cache
            .put(
                CacheKind::Live,
                stale.clone(),
                Utc::now() - TimeDelta::seconds(120),
            )
            .await
            .unwrap();

        let svc = service(fetcher, cache);
        let doc = svc.get_or_refresh(CacheKind::Live).await.unwrap();
        assert_eq!(doc.payload, stale);
    }

    #[tokio::test]
    async fn fetch_failure_with_empty_cache_propagates() {
        let fetcher = Arc::new(MockFetcher::failing());
        let cache = Arc::new(MemoryStore::new());
        let svc = service(fetcher, cache);

        let err = svc.get_or_refresh(CacheKind::Live).await.unwrap_err();
        assert!(matches!(err, DseError::Network(_)));
    }

    #[tokio::test]
    async fn request_bound_write_back_failure_still_serves_payload() {
        let fetcher = Arc::new(MockFetcher::with_live(vec!["ACBANK"]));
        let cache = Arc::new(FailingCacheStore::default());
        let svc = SnapshotService::new(
            fetcher,
            cache,
            FreshnessPolicy::new(Duration::from_secs(60)),
        );

        let doc = svc.get_or_refresh(CacheKind::Live).await.unwrap();
        assert_eq!(doc.payload.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn scheduled_refresh_fails_on_write_failure() {
        let fetcher = Arc::new(MockFetcher::with_live(vec!["ACBANK"]));
        let cache = Arc::new(FailingCacheStore::default());
        let svc = SnapshotService::new(
            fetcher,
            cache,
            FreshnessPolicy::new(Duration::from_secs(60)),
        );

        assert!(matches!(
            svc.refresh(CacheKind::Live).await.unwrap_err(),
            DseError::Store(_)
        ));
    }

    #[tokio::test]
    async fn live_quote_matches_case_insensitively() {
        let fetcher = Arc::new(MockFetcher::with_live(vec!["ACBANK", "GP"]));
        let cache = Arc::new(MemoryStore::new());
        let svc = service(fetcher, cache);

        let quote = svc.live_quote("gp").await.unwrap();
        assert_eq!(quote.code.as_str(), "GP");

        let err = svc.live_quote("NOPE").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
