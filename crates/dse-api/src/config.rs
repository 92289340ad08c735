//! Process configuration from environment variables.

use chrono::NaiveTime;
use chrono_tz::Tz;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use dse_core::{DseError, Result};
use dse_service::SchedulerConfig;

/// Database path value selecting the non-persistent SQLite store.
pub const IN_MEMORY_DB: &str = ":memory:";

/// Runtime configuration, read once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// SQLite database path, or [`IN_MEMORY_DB`].
    pub db_path: String,
    /// Cadence of the short-cycle snapshot refresh.
    pub refresh_interval: Duration,
    /// Freshness window for cached snapshots.
    pub cache_ttl: Duration,
    /// Exchange-local timezone.
    pub exchange_tz: Tz,
    /// Exchange-local wall-clock time of the daily archive job.
    pub archive_trigger: NaiveTime,
    /// Exchange-local hour after which the daily job archives today rather
    /// than yesterday.
    pub archive_cutoff_hour: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            db_path: "dse.db".to_string(),
            refresh_interval: scheduler.refresh_interval,
            cache_ttl: dse_core::DEFAULT_TTL,
            exchange_tz: scheduler.exchange_tz,
            archive_trigger: scheduler.archive_trigger,
            archive_cutoff_hour: scheduler.archive_cutoff_hour,
        }
    }
}

impl AppConfig {
    /// Reads configuration from `DSE_*` environment variables, falling back
    /// to defaults for anything unset.
    ///
    /// # Errors
    /// Returns an error when a variable is set but unparsable.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: env_or("DSE_BIND_ADDR", defaults.bind_addr)?,
            db_path: std::env::var("DSE_DB_PATH").unwrap_or(defaults.db_path),
            refresh_interval: Duration::from_secs(env_or(
                "DSE_REFRESH_SECS",
                defaults.refresh_interval.as_secs(),
            )?),
            cache_ttl: Duration::from_secs(env_or(
                "DSE_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            exchange_tz: env_or("DSE_EXCHANGE_TZ", defaults.exchange_tz)?,
            archive_trigger: env_or_with("DSE_ARCHIVE_TRIGGER", defaults.archive_trigger, |s| {
                NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| e.to_string())
            })?,
            archive_cutoff_hour: env_or("DSE_ARCHIVE_CUTOFF_HOUR", defaults.archive_cutoff_hour)?,
        })
    }

    /// The scheduler's slice of this configuration.
    #[must_use]
    pub fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig {
            refresh_interval: self.refresh_interval,
            exchange_tz: self.exchange_tz,
            archive_trigger: self.archive_trigger,
            archive_cutoff_hour: self.archive_cutoff_hour,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_or_with(key, default, |s| s.parse().map_err(|e: T::Err| e.to_string()))
}

fn env_or_with<T>(
    key: &str,
    default: T,
    parse: impl Fn(&str) -> std::result::Result<T, String>,
) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => {
            parse(raw.trim()).map_err(|e| DseError::InvalidParameter(format!("{key}={raw}: {e}")))
        }
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_exchange() {
        let config = AppConfig::default();
        assert_eq!(config.exchange_tz, chrono_tz::Asia::Dhaka);
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.archive_cutoff_hour, 16);
    }

    #[test]
    fn trigger_parses_hours_and_minutes() {
        let parsed = env_or_with("DSE_TEST_UNSET_TRIGGER", NaiveTime::default(), |s| {
            NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| e.to_string())
        })
        .unwrap();
        assert_eq!(parsed, NaiveTime::default());
    }
}
