use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "mail_error_forwarder";

const DEFAULT_LOG_TABLE: &str = "postmark_log";
const DEFAULT_RUN_AT: &str = "03:33";
const DEFAULT_TRIGGER_ADDR: &str = "127.0.0.1:8383";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub webhook_url: Option<String>,
    /// Identity of this installation, copied into every reported entry.
    pub site_url: Option<String>,
    pub db_path: Option<String>,
    pub log_table: Option<String>,
    /// Daily run time, "HH:MM" local.
    pub run_at: Option<String>,
    pub trigger_addr: Option<String>,

    /// Directory the config was loaded from; state and the default database
    /// live next to it.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow!("no config dir available"))?
        .join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

/// Reads the config at `path`, writing a template there first if it is missing.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        let sample = Config {
            webhook_url: Some("https://hooks.example.com/mail-errors".to_string()),
            site_url: Some("https://www.example.com".to_string()),
            db_path: None,
            log_table: Some(DEFAULT_LOG_TABLE.to_string()),
            run_at: Some(DEFAULT_RUN_AT.to_string()),
            trigger_addr: Some(DEFAULT_TRIGGER_ADDR.to_string()),
            base_dir: None,
        };
        let tom = toml::to_string_pretty(&sample)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, tom)?;
        return Err(anyhow!(
            "Created template config at {}; edit it and run again",
            path.display()
        ));
    }
    let s = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let mut cfg: Config = toml::from_str(&s).context("Failed to parse config")?;
    cfg.base_dir = path.parent().map(Path::to_path_buf);
    Ok(cfg)
}

impl Config {
    pub fn webhook_url(&self) -> Result<&str> {
        self.webhook_url
            .as_deref()
            .ok_or_else(|| anyhow!("webhook_url not set in config"))
    }

    pub fn site_url(&self) -> Result<&str> {
        self.site_url
            .as_deref()
            .ok_or_else(|| anyhow!("site_url not set in config"))
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(p) = &self.db_path {
            Ok(PathBuf::from(p))
        } else {
            self.file_in_base("mail_log.db")
        }
    }

    pub fn schedule_state_path(&self) -> Result<PathBuf> {
        self.file_in_base("schedule.json")
    }

    fn file_in_base(&self, name: &str) -> Result<PathBuf> {
        let mut p = match &self.base_dir {
            Some(dir) => dir.clone(),
            None => config_dir()?,
        };
        fs::create_dir_all(&p)?;
        p.push(name);
        Ok(p)
    }

    pub fn log_table(&self) -> &str {
        self.log_table.as_deref().unwrap_or(DEFAULT_LOG_TABLE)
    }

    pub fn run_at(&self) -> Result<NaiveTime> {
        let raw = self.run_at.as_deref().unwrap_or(DEFAULT_RUN_AT);
        NaiveTime::parse_from_str(raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .map_err(|e| anyhow!("Invalid run_at '{raw}': {e}"))
    }

    pub fn trigger_addr(&self) -> &str {
        self.trigger_addr.as_deref().unwrap_or(DEFAULT_TRIGGER_ADDR)
    }
}
