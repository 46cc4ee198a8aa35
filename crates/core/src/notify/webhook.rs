use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::Serialize;

use crate::errors::{Error, Result};
use crate::ingestion::{Notifier, RunReport};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Payload posted to the webhook: the report plus a ready-made subject line.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WebhookPayload<'a> {
    subject: String,
    #[serde(flatten)]
    report: &'a RunReport,
}

/// Posts each run report as JSON to a configured URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl WebhookNotifier {
    pub fn new(url: &str) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| Error::InvalidConfigValue(format!("webhook url '{}': {}", url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Notification(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, report: &RunReport) -> Result<()> {
        let payload = WebhookPayload {
            subject: report.summary(),
            report,
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Notification(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Notification(format!(
                "Webhook returned HTTP {}",
                status.as_u16()
            )));
        }

        debug!("Delivered run {} report to webhook", report.run_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        let result = WebhookNotifier::new("not a url");
        assert!(matches!(result, Err(Error::InvalidConfigValue(_))));
    }

    #[test]
    fn test_accepts_https_url() {
        assert!(WebhookNotifier::new("https://hooks.example.com/ratiofeed").is_ok());
    }
}
