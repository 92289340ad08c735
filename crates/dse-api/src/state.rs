//! Shared request-handler state.

use chrono_tz::Tz;
use std::sync::Arc;

use dse_service::{ArchiveReconciler, SnapshotService};

/// Everything the route handlers need, cheap to clone per request.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Freshness-aware snapshot reads.
    pub snapshots: Arc<SnapshotService>,
    /// Archive range queries with backfill.
    pub reconciler: Arc<ArchiveReconciler>,
    /// Exchange-local timezone used to render cache timestamps.
    pub exchange_tz: Tz,
}
