#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cache consistency, archive reconciliation, and scheduling.
//!
//! This crate is the service core sitting between the fetch adapter and the
//! stores:
//!
//! - [`SnapshotService`](snapshots::SnapshotService) - Freshness-aware
//!   cached reads with write-through refresh
//! - [`ArchiveReconciler`](reconciler::ArchiveReconciler) - Per-day gap
//!   detection and backfill over persisted history
//! - [`Scheduler`](scheduler::Scheduler) - Short-cycle refresh and the
//!   once-daily archive catch-up job

/// Archive reconciliation: gap detection and backfill.
pub mod reconciler;
/// Periodic refresh and daily archive scheduling.
pub mod scheduler;
/// Freshness-aware cached snapshot reads.
pub mod snapshots;

#[cfg(test)]
mod testing;

pub use reconciler::{ArchiveReconciler, LatestArchive, missing_days};
pub use scheduler::{Scheduler, SchedulerConfig, trading_date};
pub use snapshots::SnapshotService;
