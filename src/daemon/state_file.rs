use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Pending scheduled run, stored as e.g. ~/.config/mail_error_forwarder/schedule.json
#[derive(Debug, Serialize, Deserialize)]
struct ScheduleState {
    next_run: Option<NaiveDateTime>,
}

pub struct ScheduleFile {
    path: PathBuf,
}

impl ScheduleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The stored pending run, if any.
    pub fn load(&self) -> Result<Option<NaiveDateTime>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&self.path)?;
        let state: ScheduleState = serde_json::from_str(&s)
            .with_context(|| format!("Corrupt schedule state: {}", self.path.display()))?;
        Ok(state.next_run)
    }

    pub fn save(&self, next_run: NaiveDateTime) -> Result<()> {
        let state = ScheduleState {
            next_run: Some(next_run),
        };
        let s = serde_json::to_string_pretty(&state)?;
        fs::write(&self.path, s)?;
        Ok(())
    }
}
