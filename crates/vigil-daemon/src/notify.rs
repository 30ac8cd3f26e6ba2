//! Notification sinks for cycle reports

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::NotifyConfig;
use crate::error::{DaemonError, DaemonResult, NotifyError, NotifyResult};

/// Destination for rendered reports.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one report. Called at most once per cycle.
    async fn deliver(&self, report: &str) -> NotifyResult<()>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}

/// Build the sink selected by configuration.
pub fn sink_from_config(config: &NotifyConfig) -> DaemonResult<Arc<dyn NotificationSink>> {
    match config {
        NotifyConfig::Log => Ok(Arc::new(LogSink)),
        NotifyConfig::Webhook { url, timeout_secs } => {
            let sink = WebhookSink::new(url.clone(), Duration::from_secs(*timeout_secs))
                .map_err(|e| DaemonError::Config(format!("Failed to build webhook client: {}", e)))?;
            Ok(Arc::new(sink))
        }
    }
}

/// Writes reports to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, report: &str) -> NotifyResult<()> {
        info!(target: "vigil::report", "\n{}", report);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    text: &'a str,
}

/// Posts reports to a chat webhook as `{"text": ...}`.
#[derive(Debug, Clone)]
pub struct WebhookSink {
    http: Client,
    url: String,
}

impl WebhookSink {
    /// Create a webhook sink with the given request timeout
    pub fn new(url: impl Into<String>, timeout: Duration) -> NotifyResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, report: &str) -> NotifyResult<()> {
        let response = self
            .http
            .post(&self.url)
            .json(&WebhookMessage { text: report })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "Webhook accepted report");
        Ok(())
    }

    fn name(&self) -> &str {
        "webhook"
    }
}
