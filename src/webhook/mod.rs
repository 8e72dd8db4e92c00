use anyhow::Result;
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Duration;

use crate::domain::batch::{BatchEntry, WebhookBody};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of handing a batch to the webhook. Failures here never abort a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Empty batch, no request made.
    Skipped,
    Delivered(usize),
    /// The webhook answered with something other than 200.
    Rejected(u16),
    /// No usable response (DNS, connect, timeout, ...).
    Failed(String),
}

impl Delivery {
    pub fn sent_count(&self) -> usize {
        match self {
            Delivery::Delivered(n) => *n,
            _ => 0,
        }
    }
}

pub trait Dispatcher: Send + Sync {
    fn deliver(&self, entries: &[BatchEntry]) -> Delivery;
}

pub struct WebhookClient {
    url: String,
    http: Client,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }
}

impl Dispatcher for WebhookClient {
    fn deliver(&self, entries: &[BatchEntry]) -> Delivery {
        if entries.is_empty() {
            return Delivery::Skipped;
        }

        debug!("posting {} entries to {}", entries.len(), self.url);

        // single attempt, no retry
        let result = self
            .http
            .post(&self.url)
            .json(&WebhookBody { entries })
            .send();

        match result {
            Ok(response) if response.status() == StatusCode::OK => {
                Delivery::Delivered(entries.len())
            }
            Ok(response) => {
                let status = response.status();
                warn!("webhook answered {status}");
                Delivery::Rejected(status.as_u16())
            }
            Err(e) => {
                warn!("webhook request failed: {e}");
                Delivery::Failed(e.to_string())
            }
        }
    }
}
