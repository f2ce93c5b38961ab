pub mod log_entry;
pub mod queue_record;
pub mod summary;

pub use log_entry::{LogEntry, LogLevel};
pub use queue_record::{QueueRecord, QueueStatus};
pub use summary::{PendingSummary, QueueSummary, YearWeek};
