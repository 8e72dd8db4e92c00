use log::debug;
use serde_json::Value;
use std::borrow::Cow;

use crate::domain::batch::{Batch, BatchEntry, ErrorPayload};
use crate::domain::log_row::LogRow;
use crate::forwarder::progress::{Progress, ProgressSink};

/// Per-reason counters for one pass over the scanned rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub queued: usize,
    pub invalid_json: usize,
    pub zero_code: usize,
}

/// Compatibility shim for rows the upstream logger stored double-encoded:
/// a value starting with `"` loses one surrounding quote layer and its
/// backslash escaping. Anything else is returned untouched.
pub fn normalize_response(raw: &str) -> Cow<'_, str> {
    match raw.strip_prefix('"') {
        Some(inner) => Cow::Owned(strip_slashes(inner.strip_suffix('"').unwrap_or(inner))),
        None => Cow::Borrowed(raw),
    }
}

/// Drops each backslash and keeps the character after it.
fn strip_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn decode_payload(raw: &str) -> serde_json::Result<ErrorPayload> {
    let normalized = normalize_response(raw);
    let value: Value = serde_json::from_str(&normalized)?;
    Ok(ErrorPayload::from_json(&value))
}

/// Turns scanned rows into the batch to report, keeping scan order.
pub fn collect_batch(
    rows: &[LogRow],
    domain: &str,
    progress: &mut dyn ProgressSink,
) -> (Batch, FilterStats) {
    let mut batch = Batch::with_capacity(rows.len());
    let mut stats = FilterStats::default();

    for row in rows {
        let payload = match decode_payload(&row.response) {
            Ok(p) => p,
            Err(e) => {
                debug!("row {}: invalid JSON response: {e}", row.id);
                stats.invalid_json += 1;
                progress.report(Progress::InvalidJson(row.id));
                continue;
            }
        };

        if payload.is_success() {
            debug!("row {}: ErrorCode 0", row.id);
            stats.zero_code += 1;
            progress.report(Progress::ZeroErrorCode(row.id));
            continue;
        }

        batch.push(BatchEntry::new(row, payload, domain));
        stats.queued += 1;
        progress.report(Progress::Queued(row.id));
    }

    (batch, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: i64, response: &str) -> LogRow {
        LogRow {
            id,
            from_address: "from@example.com".into(),
            to_address: "to@example.com".into(),
            subject: "hello".into(),
            response: response.into(),
            log_entry_date: "2026-10-16 22:00:00".into(),
        }
    }

    #[test]
    fn plain_json_is_not_touched() {
        let raw = r#"{"ErrorCode":406,"Message":"a \"quoted\" word"}"#;
        assert!(matches!(normalize_response(raw), Cow::Borrowed(s) if s == raw));
    }

    #[test]
    fn double_encoded_response_is_unwrapped() {
        let raw = r#""{\"ErrorCode\":300,\"Message\":\"Invalid email\"}""#;
        assert_eq!(
            normalize_response(raw),
            r#"{"ErrorCode":300,"Message":"Invalid email"}"#
        );

        let payload = decode_payload(raw).unwrap();
        assert_eq!(payload.error_code, Some(json!(300)));
        assert_eq!(payload.message, Some(json!("Invalid email")));
    }

    #[test]
    fn only_one_quote_layer_is_removed() {
        assert_eq!(normalize_response(r#"""x"""#), r#""x""#);
        assert_eq!(normalize_response("\""), "");
        assert_eq!(normalize_response(r#""abc\"#), "abc");
    }

    #[test]
    fn decoding_is_repeatable() {
        let raw = r#""{\"ErrorCode\":-4,\"Message\":\"x\"}""#;
        assert_eq!(decode_payload(raw).unwrap(), decode_payload(raw).unwrap());
    }

    #[test]
    fn keeps_everything_except_integer_zero() {
        let rows = vec![
            row(1, r#"{"ErrorCode":0}"#),
            row(2, r#"{"ErrorCode":406,"Message":"bad"}"#),
            row(3, "not json"),
            row(4, r#"{"ErrorCode":"422"}"#),
            row(5, r#"{"ErrorCode":-1}"#),
            row(6, r#"{"Message":"no code at all"}"#),
            row(7, ""),
            row(8, r#"{"ErrorCode":0,"Message":"OK"}"#),
        ];
        let mut events = Vec::new();

        let (batch, stats) = collect_batch(&rows, "https://site", &mut events);

        let ids: Vec<_> = batch.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 4, 5, 6]);
        assert_eq!(
            stats,
            FilterStats {
                queued: 4,
                invalid_json: 2,
                zero_code: 2,
            }
        );
        assert_eq!(batch[1].error_code, json!("422"));
        assert_eq!(batch[3].error_code, Value::Null);
        assert_eq!(batch[3].message, json!("no code at all"));
        assert!(batch.iter().all(|e| e.domain == "https://site"));

        assert_eq!(
            events,
            vec![
                Progress::ZeroErrorCode(1),
                Progress::Queued(2),
                Progress::InvalidJson(3),
                Progress::Queued(4),
                Progress::Queued(5),
                Progress::Queued(6),
                Progress::InvalidJson(7),
                Progress::ZeroErrorCode(8),
            ]
        );
    }

    #[test]
    fn progress_lines_read_naturally() {
        assert_eq!(Progress::InvalidJson(3).to_string(), "ID 3: Invalid JSON");
        assert_eq!(
            Progress::ZeroErrorCode(1).to_string(),
            "ID 1: ErrorCode 0, skipping"
        );
        assert_eq!(Progress::Queued(2).to_string(), "Queued ID 2");
    }
}
