use anyhow::{Context, Result, anyhow};
use chrono::NaiveDateTime;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, params};
use std::path::Path;
use std::sync::Mutex;

use crate::domain::log_row::LogRow;
use crate::store::repo::LogStore;

pub struct SqliteLogStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteLogStore {
    /// Opens the log database read-only.
    pub fn open(path: &Path, table: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open log store: {}", path.display()))?;
        Self::with_connection(conn, table)
    }

    pub fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        check_identifier(table)?;
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }
}

/// The table name is spliced into SQL, so keep it to `[A-Za-z_][A-Za-z0-9_]*`.
fn check_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(anyhow!("Invalid log table name '{name}'"))
    }
}

/// Any storage class as text, so one odd date cannot fail the whole scan.
fn lenient_text(v: ValueRef<'_>) -> String {
    match v {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    }
}

impl LogStore for SqliteLogStore {
    fn scan_recent(&self, since: NaiveDateTime, limit: u32) -> Result<Vec<LogRow>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("log store connection poisoned"))?;

        let sql = format!(
            r#"
            SELECT id, fromaddress, toaddress, subject, response, log_entry_date
            FROM {}
            WHERE response LIKE '%"ErrorCode":%' AND log_entry_date >= ?1
            ORDER BY log_entry_date DESC
            LIMIT ?2
            "#,
            self.table
        );

        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("Failed to query log table {}", self.table))?;
        let limit = limit as i64;
        let mut rows = stmt.query(params![since, limit])?;
        let mut out = Vec::new();

        while let Some(r) = rows.next()? {
            out.push(LogRow {
                id: r.get(0)?,
                from_address: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                to_address: r.get::<_, Option<String>>(2)?.unwrap_or_default(),
                subject: r.get::<_, Option<String>>(3)?.unwrap_or_default(),
                response: r.get::<_, Option<String>>(4)?.unwrap_or_default(),
                log_entry_date: lenient_text(r.get_ref(5)?),
            });
        }
        Ok(out)
    }
}
