use std::net::IpAddr;

use chrono::Duration;

use crate::db::queue::{QueueLifetimes, DEFAULT_STALE_AFTER_HOURS};

/// Upper bound for retention windows (ten years).
pub const MAX_LIFETIME_DAYS: i64 = 3650;
/// Upper bound for the pending staleness threshold (one year).
pub const MAX_STALE_AFTER_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub admin_token: String,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub stale_after_hours: i64,
    pub retention: RetentionConfig,
    /// Seconds between janitor runs; 0 disables the janitor.
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetentionConfig {
    pub completed_lifetime_days: i64,
    pub failed_lifetime_days: i64,
    pub log_lifetime_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            completed_lifetime_days: 7,
            failed_lifetime_days: 60,
            log_lifetime_days: 30,
        }
    }
}

impl RetentionConfig {
    pub fn queue_lifetimes(&self) -> QueueLifetimes {
        QueueLifetimes {
            completed: Duration::days(self.completed_lifetime_days),
            failed: Duration::days(self.failed_lifetime_days),
        }
    }

    pub fn log_lifetime(&self) -> Duration {
        Duration::days(self.log_lifetime_days)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let admin_token = env_required("TXQUEUE_ADMIN_TOKEN")?;
        if admin_token.len() < 16 {
            return Err("TXQUEUE_ADMIN_TOKEN must be at least 16 characters".to_string());
        }

        let host: IpAddr = env_or("TXQUEUE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid TXQUEUE_HOST: {e}"))?;

        let port: u16 = env_or("TXQUEUE_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid TXQUEUE_PORT: {e}"))?;

        let log_level = env_or("TXQUEUE_LOG_LEVEL", "info");

        let stale_after_hours = parse_positive(
            "TXQUEUE_STALE_AFTER_HOURS",
            &env_or("TXQUEUE_STALE_AFTER_HOURS", &DEFAULT_STALE_AFTER_HOURS.to_string()),
            MAX_STALE_AFTER_HOURS,
        )?;

        let defaults = RetentionConfig::default();
        let retention = RetentionConfig {
            completed_lifetime_days: parse_positive(
                "TXQUEUE_COMPLETED_LIFETIME_DAYS",
                &env_or(
                    "TXQUEUE_COMPLETED_LIFETIME_DAYS",
                    &defaults.completed_lifetime_days.to_string(),
                ),
                MAX_LIFETIME_DAYS,
            )?,
            failed_lifetime_days: parse_positive(
                "TXQUEUE_FAILED_LIFETIME_DAYS",
                &env_or(
                    "TXQUEUE_FAILED_LIFETIME_DAYS",
                    &defaults.failed_lifetime_days.to_string(),
                ),
                MAX_LIFETIME_DAYS,
            )?,
            log_lifetime_days: parse_positive(
                "TXQUEUE_LOG_LIFETIME_DAYS",
                &env_or(
                    "TXQUEUE_LOG_LIFETIME_DAYS",
                    &defaults.log_lifetime_days.to_string(),
                ),
                MAX_LIFETIME_DAYS,
            )?,
        };

        let cleanup_interval_secs: u64 = env_or("TXQUEUE_CLEANUP_INTERVAL_SECS", "0")
            .parse()
            .map_err(|e| format!("Invalid TXQUEUE_CLEANUP_INTERVAL_SECS: {e}"))?;

        Ok(Config {
            database_url,
            admin_token,
            host,
            port,
            log_level,
            stale_after_hours,
            retention,
            cleanup_interval_secs,
        })
    }

    pub fn stale_after(&self) -> Duration {
        Duration::hours(self.stale_after_hours)
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_positive(key: &str, raw: &str, max: i64) -> Result<i64, String> {
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|e| format!("Invalid {key}: {e}"))?;
    if value <= 0 {
        return Err(format!("Invalid {key}: must be greater than zero"));
    }
    if value > max {
        return Err(format!("Invalid {key}: must be at most {max}"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_positive_rejects_zero_and_garbage() {
        assert_eq!(parse_positive("X", " 24 ", 100), Ok(24));
        assert!(parse_positive("X", "0", 100).is_err());
        assert!(parse_positive("X", "-3", 100).is_err());
        assert!(parse_positive("X", "a day", 100).unwrap_err().starts_with("Invalid X"));
    }

    #[test]
    fn parse_positive_caps_oversized_windows() {
        assert_eq!(parse_positive("X", "3650", MAX_LIFETIME_DAYS), Ok(3650));
        let err = parse_positive("TXQUEUE_LOG_LIFETIME_DAYS", "1000000000", MAX_LIFETIME_DAYS)
            .unwrap_err();
        assert_eq!(err, "Invalid TXQUEUE_LOG_LIFETIME_DAYS: must be at most 3650");
        assert!(parse_positive("X", "9000", MAX_STALE_AFTER_HOURS).is_err());
    }

    #[test]
    fn largest_allowed_windows_stay_subtractable() {
        let retention = RetentionConfig {
            completed_lifetime_days: MAX_LIFETIME_DAYS,
            failed_lifetime_days: MAX_LIFETIME_DAYS,
            log_lifetime_days: MAX_LIFETIME_DAYS,
        };
        let now = chrono::Utc::now();
        assert!(now.checked_sub_signed(retention.log_lifetime()).is_some());
        assert!(now
            .checked_sub_signed(Duration::hours(MAX_STALE_AFTER_HOURS))
            .is_some());
    }

    #[test]
    fn retention_defaults_convert_to_durations() {
        let retention = RetentionConfig::default();
        let lifetimes = retention.queue_lifetimes();
        assert_eq!(lifetimes.completed, Duration::days(7));
        assert_eq!(lifetimes.failed, Duration::days(60));
        assert_eq!(retention.log_lifetime(), Duration::days(30));
    }
}
