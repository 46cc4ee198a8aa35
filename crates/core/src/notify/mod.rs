//! Notification collaborators.
//!
//! The ingestion service hands every run's [`RunReport`] to exactly one
//! [`Notifier`]. Use [`MultiNotifier`] to fan out to several sinks.

mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info, warn};

use crate::errors::{Error, Result};
use crate::ingestion::{Notifier, RunReport, RunStatus};

pub use webhook::WebhookNotifier;

/// Writes the report to the application log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, report: &RunReport) -> Result<()> {
        match report.status {
            RunStatus::Success => info!("{}", report.summary()),
            RunStatus::Partial => warn!("{}", report.summary()),
            RunStatus::Failed => error!(
                "{}: {}",
                report.summary(),
                report.error_message.as_deref().unwrap_or("unknown error")
            ),
        }
        for issue in &report.validation_issues {
            warn!("  {} [{:?}] {}", issue.kind, issue.severity, issue.detail);
        }
        Ok(())
    }
}

/// Delivers to every inner notifier, even when an earlier one fails.
pub struct MultiNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn notify(&self, report: &RunReport) -> Result<()> {
        let mut failures = Vec::new();
        for notifier in &self.notifiers {
            if let Err(e) = notifier.notify(report).await {
                failures.push(e.to_string());
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Notification(failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ratiofeed_provider::FieldSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for Counting {
        async fn notify(&self, _report: &RunReport) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Notification("down".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn report() -> RunReport {
        RunReport {
            run_id: "run-1".to_string(),
            field_set: FieldSet::Basic,
            triggered_by: "test".to_string(),
            status: RunStatus::Success,
            fetched_count: 2,
            inserted_count: 2,
            skipped_duplicate_count: 0,
            skipped_invalid_count: 0,
            new_entry_count: 2,
            validation_issues: vec![],
            error_message: None,
        }
    }

    #[tokio::test]
    async fn test_multi_notifier_reaches_all_sinks() {
        let failing = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let healthy = Arc::new(Counting {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let multi = MultiNotifier::new(vec![failing.clone(), healthy.clone()]);

        let result = multi.notify(&report()).await;

        assert!(matches!(result, Err(Error::Notification(_))));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let mut failed = report();
        failed.status = RunStatus::Failed;
        failed.error_message = Some(format!("timeout at {}", Utc::now()));
        assert!(LogNotifier.notify(&failed).await.is_ok());
    }
}
