//! HTTP webhook notifier.
//!
//! POSTs a JSON `run_completed` event after every run. Delivery is best effort: the
//! orchestrator logs failures and carries on.

use crate::domain::error::PipelineError;
use crate::domain::summary::{RunSummary, TickerSummary};
use crate::ports::notify_port::NotifyPort;
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
pub struct RunCompletedEvent<'a> {
    pub event: &'static str,
    pub run_timestamp: DateTime<Utc>,
    pub run_id: &'a str,
    pub tickers: Vec<&'a str>,
    pub period: &'a str,
    pub interval: &'a str,
    pub summaries: &'a [TickerSummary],
}

impl<'a> RunCompletedEvent<'a> {
    pub fn from_summary(summary: &'a RunSummary) -> Self {
        Self {
            event: "run_completed",
            run_timestamp: summary.finished_utc,
            run_id: &summary.run_id,
            tickers: summary.tickers.iter().map(|t| t.ticker.as_str()).collect(),
            period: &summary.period,
            interval: &summary.interval,
            summaries: &summary.tickers,
        }
    }
}

pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Notification {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

impl NotifyPort for WebhookNotifier {
    fn notify(&self, summary: &RunSummary) -> Result<(), PipelineError> {
        let event = RunCompletedEvent::from_summary(summary);
        let response = self
            .client
            .post(&self.url)
            .json(&event)
            .send()
            .map_err(|e| PipelineError::Notification {
                reason: format!("POST {} failed: {}", self.url, e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Notification {
                reason: format!("POST {} returned {}", self.url, status),
            });
        }
        debug!(url = %self.url, %status, "webhook delivered");
        Ok(())
    }
}
