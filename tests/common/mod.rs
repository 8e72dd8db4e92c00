#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, params};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use mail_error_forwarder::clock::FixedClock;
use mail_error_forwarder::forwarder::Forwarder;
use mail_error_forwarder::store::sqlite::SqliteLogStore;
use mail_error_forwarder::webhook::WebhookClient;

pub const TABLE: &str = "wp_postmark_log";
pub const SITE: &str = "https://shop.example.com";

pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 17)
        .unwrap()
        .and_hms_opt(3, 33, 0)
        .unwrap()
}

/// A mail log database on disk, shaped like the one the sending side writes.
pub struct MailLog {
    _dir: TempDir,
    path: PathBuf,
}

impl MailLog {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mail_log.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE {TABLE} (
                id              INTEGER PRIMARY KEY,
                fromaddress     TEXT,
                toaddress       TEXT,
                subject         TEXT,
                response        TEXT,
                log_entry_date  TEXT NOT NULL
            );
            "#
        ))
        .unwrap();
        Self { _dir: dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert(&self, id: i64, response: &str, at: NaiveDateTime) {
        self.insert_dated(id, response, &at.format("%Y-%m-%d %H:%M:%S%.f").to_string());
    }

    /// Inserts a row with `log_entry_date` stored exactly as given.
    pub fn insert_dated(&self, id: i64, response: &str, date: &str) {
        let conn = Connection::open(&self.path).unwrap();
        conn.execute(
            &format!("INSERT INTO {TABLE} VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
            params![
                id,
                "noreply@shop.example.com",
                format!("customer{id}@example.org"),
                format!("Order #{id}"),
                response,
                date
            ],
        )
        .unwrap();
    }

    pub fn forwarder(&self, webhook_url: &str) -> Forwarder {
        Forwarder::new(
            Box::new(SqliteLogStore::open(&self.path, TABLE).unwrap()),
            Box::new(WebhookClient::new(webhook_url).unwrap()),
            Box::new(FixedClock(now())),
            SITE,
        )
    }
}
