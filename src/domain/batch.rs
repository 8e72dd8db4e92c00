use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use crate::domain::log_row::{LogRow, LogRowId};

/// Wire format of `BatchEntry::timestamp`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The fields we read out of a decoded provider response.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    /// `None` when the key is missing or the payload is not an object.
    pub error_code: Option<Value>,
    pub message: Option<Value>,
}

impl ErrorPayload {
    pub fn from_json(v: &Value) -> Self {
        Self {
            error_code: v.get("ErrorCode").cloned(),
            message: v.get("Message").filter(|m| !m.is_null()).cloned(),
        }
    }

    /// Only the integer 0 counts as "no error"; `0.0`, `"0"` and a missing
    /// code are all reported.
    pub fn is_success(&self) -> bool {
        matches!(&self.error_code, Some(Value::Number(n)) if n.as_i64() == Some(0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntry {
    pub id: LogRowId,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub error_code: Value,
    pub message: Value,
    pub timestamp: String,
    pub domain: String,
}

impl BatchEntry {
    pub fn new(row: &LogRow, payload: ErrorPayload, domain: &str) -> Self {
        Self {
            id: row.id,
            from: row.from_address.clone(),
            to: row.to_address.clone(),
            subject: row.subject.clone(),
            error_code: payload.error_code.unwrap_or(Value::Null),
            message: payload
                .message
                .unwrap_or_else(|| Value::String(String::new())),
            timestamp: render_timestamp(&row.log_entry_date),
            domain: domain.to_string(),
        }
    }
}

/// Normalises a stored date to `TIMESTAMP_FORMAT`. Text that does not parse
/// is passed through unchanged.
pub fn render_timestamp(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Entries in scan order, newest first.
pub type Batch = Vec<BatchEntry>;

/// Request body posted to the webhook.
#[derive(Debug, Serialize)]
pub struct WebhookBody<'a> {
    pub entries: &'a [BatchEntry],
}
