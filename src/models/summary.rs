use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Serialize, Serializer};

use super::QueueStatus;

/// Records that have sat in `pending` past the stale threshold.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow, Serialize)]
pub struct PendingSummary {
    pub count: i64,
    pub oldest_created_at: Option<DateTime<Utc>>,
    pub newest_updated_at: Option<DateTime<Utc>>,
}

/// An ISO-8601 week: Monday start, week 1 holds the year's first Thursday.
///
/// `year` is the ISO week-numbering year, which differs from the calendar
/// year for a few days around January 1st.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearWeek {
    pub year: i32,
    pub week: u32,
}

impl YearWeek {
    pub fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    /// Bucket a timestamp the same way the failure query does (in UTC).
    pub fn of(at: DateTime<Utc>) -> Self {
        let iso = at.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl fmt::Display for YearWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl Serialize for YearWeek {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueSummary {
    pub counts: BTreeMap<QueueStatus, i64>,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub pending_over_a_day: PendingSummary,
    pub failures_by_week: BTreeMap<YearWeek, i64>,
}
