//! Scheduler: short-cycle snapshot refresh and the daily archive job.
//!
//! Two independent repeating tasks with no shared mutable state beyond the
//! stores. Job failures are logged and contained; the next tick or day is
//! the retry mechanism. There is no cancellation of in-flight fetches: a
//! slow cycle simply completes after its deadline and still writes, so
//! overlapping cycles converge to the most-recently-completed write.

use chrono::{DateTime, Days, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use dse_core::{CacheKind, DateRange};

use crate::reconciler::ArchiveReconciler;
use crate::snapshots::SnapshotService;

/// Scheduling configuration.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Cadence of the short-cycle snapshot refresh.
    pub refresh_interval: Duration,
    /// Exchange-local timezone for the daily archive rules.
    pub exchange_tz: Tz,
    /// Exchange-local wall-clock time of the daily archive job.
    pub archive_trigger: NaiveTime,
    /// Exchange-local hour after which "the trading date to archive" is
    /// today rather than yesterday.
    pub archive_cutoff_hour: u32,
}

impl Default for SchedulerConfig {
    /// 60-second refresh; archive at 18:00 Dhaka time with a 16:00 cutoff,
    /// shortly after market close.
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(60),
            exchange_tz: chrono_tz::Asia::Dhaka,
            archive_trigger: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            archive_cutoff_hour: 16,
        }
    }
}

/// Computes the trading date the daily job should archive.
///
/// Past the cutoff hour in exchange-local time the job archives today;
/// before it, yesterday. This tolerates the job firing slightly before or
/// after the exact close.
#[must_use]
pub fn trading_date(now: DateTime<Utc>, tz: Tz, cutoff_hour: u32) -> chrono::NaiveDate {
    let local = now.with_timezone(&tz);
    let today = local.date_naive();
    if local.hour() >= cutoff_hour {
        today
    } else {
        today.checked_sub_days(Days::new(1)).unwrap_or(today)
    }
}

/// Drives the periodic refresh of the snapshot caches and the once-daily
/// archive catch-up job.
#[derive(Debug)]
pub struct Scheduler {
    snapshots: Arc<SnapshotService>,
    reconciler: Arc<ArchiveReconciler>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Creates a scheduler over the given services.
    #[must_use]
    pub fn new(
        snapshots: Arc<SnapshotService>,
        reconciler: Arc<ArchiveReconciler>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            snapshots,
            reconciler,
            config,
        }
    }

    /// Runs one short refresh cycle: all snapshot caches concurrently.
    ///
    /// Each fetch-then-write pair is isolated; a failure in one is logged
    /// and never blocks or fails the others.
    pub async fn refresh_all(&self) {
        tokio::join!(
            self.refresh_one(CacheKind::Live),
            self.refresh_one(CacheKind::Dse30),
            self.refresh_one(CacheKind::Top20),
            self.refresh_one(CacheKind::Indices),
        );
    }

    async fn refresh_one(&self, kind: CacheKind) {
        match self.snapshots.refresh(kind).await {
            Ok(items) => info!(kind = %kind, items, "Cache saved"),
            Err(e) => warn!(kind = %kind, error = %e, "Scheduled refresh failed"),
        }
    }

    /// Runs the daily archive job once, for the current trading date.
    pub async fn run_daily_archive(&self) {
        let date = trading_date(Utc::now(), self.config.exchange_tz, self.config.archive_cutoff_hour);
        info!(%date, "Starting daily archive job");
        match self.reconciler.get_range(DateRange::single(date)).await {
            Ok(rows) => info!(%date, rows = rows.len(), "Daily archive job finished"),
            Err(e) => error!(%date, error = %e, "Daily archive job failed"),
        }
    }

    /// The next exchange-local trigger instant strictly after `now`.
    fn next_trigger(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let tz = self.config.exchange_tz;
        let local_now = now.with_timezone(&tz);
        let mut day = local_now.date_naive();
        loop {
            let candidate = day.and_time(self.config.archive_trigger);
            if let Some(instant) = tz.from_local_datetime(&candidate).earliest() {
                let instant = instant.with_timezone(&Utc);
                if instant > now {
                    return instant;
                }
            }
            // Candidate already passed (or fell into a DST gap); try the
            // next day.
            day = day.checked_add_days(Days::new(1)).unwrap_or(day);
        }
    }

    /// Spawns the two independent periodic tasks and returns their handles.
    ///
    /// The short cycle runs once immediately at startup, then on every tick.
    pub fn spawn(self: &Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        let short = {
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(scheduler.config.refresh_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    scheduler.refresh_all().await;
                }
            })
        };

        let daily = {
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                loop {
                    let now = Utc::now();
                    let next = scheduler.next_trigger(now);
                    let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
                    info!(at = %next, "Daily archive job scheduled");
                    tokio::time::sleep(wait).await;
                    scheduler.run_daily_archive().await;
                }
            })
        };

        (short, daily)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use chrono::NaiveDate;
    use dse_core::{CacheStore, FreshnessPolicy};
    use dse_store::MemoryStore;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn trading_date_after_cutoff_is_today() {
        // 11:00 UTC = 17:00 in Dhaka (UTC+6), past the 16:00 cutoff.
        let date = trading_date(utc(2024, 6, 3, 11, 0), chrono_tz::Asia::Dhaka, 16);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
    }

    #[test]
    fn trading_date_before_cutoff_is_yesterday() {
        // 05:00 UTC = 11:00 in Dhaka, before the cutoff.
        let date = trading_date(utc(2024, 6, 3, 5, 0), chrono_tz::Asia::Dhaka, 16);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
    }

    #[test]
    fn trading_date_handles_the_date_line() {
        // 19:00 UTC on the 3rd = 01:00 on the 4th in Dhaka, before the
        // cutoff, so the job still archives the 3rd.
        let date = trading_date(utc(2024, 6, 3, 19, 0), chrono_tz::Asia::Dhaka, 16);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
    }

    fn scheduler_with(fetcher: Arc<MockFetcher>, store: Arc<MemoryStore>) -> Scheduler {
        let snapshots = Arc::new(SnapshotService::new(
            Arc::clone(&fetcher) as _,
            Arc::clone(&store) as _,
            FreshnessPolicy::default(),
        ));
        let reconciler = Arc::new(ArchiveReconciler::new(fetcher, store));
        Scheduler::new(snapshots, reconciler, SchedulerConfig::default())
    }

    #[tokio::test]
    async fn one_failing_target_does_not_block_the_others() {
        let fetcher = Arc::new(MockFetcher::with_live(vec!["ACBANK"]).failing_live());
        let store = Arc::new(MemoryStore::new());
        let scheduler = scheduler_with(fetcher, Arc::clone(&store));

        scheduler.refresh_all().await;

        assert!(store.get(CacheKind::Live).await.unwrap().is_none());
        assert!(store.get(CacheKind::Dse30).await.unwrap().is_some());
        assert!(store.get(CacheKind::Top20).await.unwrap().is_some());
        assert!(store.get(CacheKind::Indices).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn refresh_all_writes_every_cache() {
        let fetcher = Arc::new(MockFetcher::with_live(vec!["ACBANK", "GP"]));
        let store = Arc::new(MemoryStore::new());
        let scheduler = scheduler_with(fetcher, Arc::clone(&store));

        scheduler.refresh_all().await;

        for kind in CacheKind::ALL {
            assert!(store.get(kind).await.unwrap().is_some(), "{kind} missing");
        }
    }

    #[tokio::test]
    async fn daily_job_errors_are_contained() {
        let fetcher = Arc::new(MockFetcher::failing());
        let store = Arc::new(MemoryStore::new());
        let scheduler = scheduler_with(fetcher, store);

        // Must not panic or propagate.
        scheduler.run_daily_archive().await;
    }

    #[test]
    fn next_trigger_is_strictly_in_the_future() {
        let fetcher = Arc::new(MockFetcher::new());
        let store = Arc::new(MemoryStore::new());
        let scheduler = scheduler_with(fetcher, store);

        // 10:00 UTC = 16:00 Dhaka, before the 18:00 trigger: same day.
        let next = scheduler.next_trigger(utc(2024, 6, 3, 10, 0));
        assert_eq!(next, utc(2024, 6, 3, 12, 0));

        // 13:00 UTC = 19:00 Dhaka, past the trigger: next day.
        let next = scheduler.next_trigger(utc(2024, 6, 3, 13, 0));
        assert_eq!(next, utc(2024, 6, 4, 12, 0));
    }
}
