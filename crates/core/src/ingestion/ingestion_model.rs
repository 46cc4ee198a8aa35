//! Ingestion run domain models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ratiofeed_provider::{FieldSet, Metrics};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::reconcile::ReconciledRecord;
use crate::validation::ValidationIssue;

/// A validated, non-duplicate record ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedRecord {
    pub record: ReconciledRecord,
    pub fingerprint: String,
}

impl AcceptedRecord {
    /// Projects the record's metrics onto `fields`: unlisted metrics are
    /// dropped and missing ones become explicit nulls.
    pub fn new(mut record: ReconciledRecord, fields: &[&str], fingerprint: String) -> Self {
        let metrics: Metrics = fields
            .iter()
            .map(|field| {
                let value = record.metrics.get(*field).copied().flatten();
                (field.to_string(), value)
            })
            .collect();
        record.metrics = metrics;
        Self {
            record,
            fingerprint,
        }
    }
}

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Partial => "PARTIAL",
            RunStatus::Failed => "FAILED",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RunStatus::Failed)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(RunStatus::Success),
            "PARTIAL" => Ok(RunStatus::Partial),
            "FAILED" => Ok(RunStatus::Failed),
            other => Err(format!("Unknown run status: {}", other)),
        }
    }
}

/// Orchestrator states, in the order a successful run visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Started,
    Fetching,
    Reconciling,
    Validating,
    Deduping,
    Persisting,
    Logging,
    Notifying,
    Done,
    Failed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

/// Immutable summary of one run, persisted exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: RunStatus,
    pub fetched_count: i64,
    pub inserted_count: i64,
    pub skipped_duplicate_count: i64,
    pub skipped_invalid_count: i64,
    pub new_entry_count: i64,
    pub error_message: Option<String>,
    pub triggered_by: String,
    pub data_source: String,
    pub fetch_attempts: i64,
    pub provider_response_time_ms: Option<i64>,
    pub insert_time_ms: Option<i64>,
    pub execution_details: serde_json::Value,
}

impl ExecutionLog {
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }
}

/// The one structured message sent to the notifier per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub field_set: FieldSet,
    pub triggered_by: String,
    pub status: RunStatus,
    pub fetched_count: i64,
    pub inserted_count: i64,
    pub skipped_duplicate_count: i64,
    pub skipped_invalid_count: i64,
    pub new_entry_count: i64,
    pub validation_issues: Vec<ValidationIssue>,
    pub error_message: Option<String>,
}

impl RunReport {
    pub fn new(log: &ExecutionLog, field_set: FieldSet, issues: Vec<ValidationIssue>) -> Self {
        Self {
            run_id: log.run_id.clone(),
            field_set,
            triggered_by: log.triggered_by.clone(),
            status: log.status,
            fetched_count: log.fetched_count,
            inserted_count: log.inserted_count,
            skipped_duplicate_count: log.skipped_duplicate_count,
            skipped_invalid_count: log.skipped_invalid_count,
            new_entry_count: log.new_entry_count,
            validation_issues: issues,
            error_message: log.error_message.clone(),
        }
    }

    /// One-line human summary, used as notification subject and log line.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {} run {}: fetched={} inserted={} duplicates={} invalid={} new={}",
            self.status,
            self.field_set,
            self.run_id,
            self.fetched_count,
            self.inserted_count,
            self.skipped_duplicate_count,
            self.skipped_invalid_count,
            self.new_entry_count
        )
    }
}

/// Mutable bookkeeping for a run in flight. Finalized into an [`ExecutionLog`].
#[derive(Debug)]
pub(crate) struct RunTracker {
    pub run_id: String,
    pub field_set: FieldSet,
    pub triggered_by: String,
    pub start_time: DateTime<Utc>,
    pub trail: Vec<RunState>,
    pub failed_at: Option<RunState>,
    pub fetched_count: i64,
    pub inserted_count: i64,
    pub skipped_duplicate_count: i64,
    pub skipped_invalid_count: i64,
    pub new_entry_count: i64,
    pub fetch_attempts: i64,
    pub provider_response_time_ms: Option<i64>,
    pub insert_time_ms: Option<i64>,
    pub count_mismatch: bool,
    pub empty_response: bool,
    pub error_message: Option<String>,
    pub issues: Vec<ValidationIssue>,
    pub rejections: BTreeMap<String, i64>,
}

impl RunTracker {
    pub fn start(field_set: FieldSet, triggered_by: &str) -> Self {
        Self {
            run_id: Uuid::now_v7().to_string(),
            field_set,
            triggered_by: triggered_by.to_string(),
            start_time: Utc::now(),
            trail: vec![RunState::Started],
            failed_at: None,
            fetched_count: 0,
            inserted_count: 0,
            skipped_duplicate_count: 0,
            skipped_invalid_count: 0,
            new_entry_count: 0,
            fetch_attempts: 0,
            provider_response_time_ms: None,
            insert_time_ms: None,
            count_mismatch: false,
            empty_response: false,
            error_message: None,
            issues: Vec::new(),
            rejections: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.trail.last().copied().unwrap_or(RunState::Started)
    }

    /// Moves forward. States are never re-entered.
    pub fn enter(&mut self, next: RunState) {
        let current = self.state();
        debug_assert!(
            next > current && !current.is_terminal(),
            "illegal transition {:?} -> {:?}",
            current,
            next
        );
        log::debug!("Run {}: {:?} -> {:?}", self.run_id, current, next);
        self.trail.push(next);
    }

    /// Records the failure and the state it happened in. Later failures
    /// are appended to the message; the first state is kept.
    pub fn fail(&mut self, message: String) {
        if self.failed_at.is_none() {
            self.failed_at = Some(self.state());
        }
        self.error_message = Some(match self.error_message.take() {
            Some(previous) => format!("{}; {}", previous, message),
            None => message,
        });
    }

    pub fn status(&self) -> RunStatus {
        if self.failed_at.is_some() {
            RunStatus::Failed
        } else if self.skipped_invalid_count > 0 || self.count_mismatch || self.empty_response {
            RunStatus::Partial
        } else {
            RunStatus::Success
        }
    }

    pub fn finish(&self) -> ExecutionLog {
        let execution_details = json!({
            "fieldSet": self.field_set,
            "table": self.field_set.table_name(),
            "states": self.trail,
            "failedAt": self.failed_at,
            "countMismatch": self.count_mismatch,
            "emptyResponse": self.empty_response,
            "validationIssues": self.issues,
            "rejections": self.rejections,
        });

        ExecutionLog {
            run_id: self.run_id.clone(),
            start_time: self.start_time,
            end_time: Utc::now(),
            status: self.status(),
            fetched_count: self.fetched_count,
            inserted_count: self.inserted_count,
            skipped_duplicate_count: self.skipped_duplicate_count,
            skipped_invalid_count: self.skipped_invalid_count,
            new_entry_count: self.new_entry_count,
            error_message: self.error_message.clone(),
            triggered_by: self.triggered_by.clone(),
            data_source: self.field_set.data_source().to_string(),
            fetch_attempts: self.fetch_attempts,
            provider_response_time_ms: self.provider_response_time_ms,
            insert_time_ms: self.insert_time_ms,
            execution_details,
        }
    }
}
