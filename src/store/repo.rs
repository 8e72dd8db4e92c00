use anyhow::Result;
use chrono::NaiveDateTime;

use crate::domain::log_row::LogRow;

pub trait LogStore: Send + Sync {
    /// Rows whose response mentions `"ErrorCode":` and whose entry date is at
    /// or after `since`, newest first, at most `limit` of them.
    fn scan_recent(&self, since: NaiveDateTime, limit: u32) -> Result<Vec<LogRow>>;
}
