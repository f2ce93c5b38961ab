pub mod logs;
pub mod queue;

use chrono::{DateTime, Duration, Utc};

/// `now - age`, or an encode error when the result falls outside chrono's range.
pub fn cutoff(now: DateTime<Utc>, age: Duration) -> Result<DateTime<Utc>, sqlx::Error> {
    now.checked_sub_signed(age).ok_or_else(|| {
        sqlx::Error::Encode(format!("cutoff {age} before {now} is out of range").into())
    })
}
