pub type LogRowId = i64;

/// One row of the mail-delivery log, as written by the sending side.
#[derive(Debug, Clone)]
pub struct LogRow {
    pub id: LogRowId,
    pub from_address: String,
    pub to_address: String,
    pub subject: String,
    /// Raw provider response; JSON, or JSON wrapped in an extra quoted layer.
    pub response: String,
    /// Kept as stored; see `BatchEntry::new` for how it is rendered.
    pub log_entry_date: String,
}
