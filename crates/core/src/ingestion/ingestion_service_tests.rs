//! Tests for the ingestion service, driven by in-memory collaborators.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ratiofeed_provider::{
    FieldSet, Identifier, IdentifierSet, Metrics, ProviderClient, ProviderError, RawProviderRow,
    RetryPolicy,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::Semaphore;

use super::*;
use crate::config::{PipelineConfig, ValidatorConfig};
use crate::errors::{DatabaseError, Error, Result};
use crate::reconcile::ReconciledRecord;
use crate::validation::ValidationIssueKind;

// ============================================================================
// Mock provider
// ============================================================================

enum Script {
    Rows(Vec<RawProviderRow>),
    AlwaysTimeout,
    AuthFailure,
    TimeoutThenRows(usize, Vec<RawProviderRow>),
}

struct MockProvider {
    script: Script,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl MockProvider {
    fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    fn gated(script: Script, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(script)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn id(&self) -> &'static str {
        "MOCK"
    }

    async fn fetch(
        &self,
        _identifiers: &[Identifier],
        _field_set: FieldSet,
    ) -> std::result::Result<Vec<RawProviderRow>, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.map_err(|e| ProviderError::Connection {
                provider: "MOCK".to_string(),
                message: e.to_string(),
            })?;
        }

        let timeout = || ProviderError::Timeout {
            provider: "MOCK".to_string(),
        };
        match &self.script {
            Script::Rows(rows) => Ok(rows.clone()),
            Script::AlwaysTimeout => Err(timeout()),
            Script::AuthFailure => Err(ProviderError::Authentication {
                provider: "MOCK".to_string(),
                message: "invalid client credentials".to_string(),
            }),
            Script::TimeoutThenRows(failures, rows) => {
                if call <= *failures {
                    Err(timeout())
                } else {
                    Ok(rows.clone())
                }
            }
        }
    }
}

// ============================================================================
// Mock stores and notifier
// ============================================================================

#[derive(Default)]
struct MemoryRecordStore {
    rows: Mutex<Vec<AcceptedRecord>>,
    fail_inserts: AtomicBool,
}

impl MemoryRecordStore {
    fn symbols(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.record.derived_symbol.clone())
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_batch(
        &self,
        _field_set: FieldSet,
        records: Vec<AcceptedRecord>,
    ) -> Result<usize> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "disk I/O error".to_string(),
            )));
        }
        let count = records.len();
        self.rows.lock().unwrap().extend(records);
        Ok(count)
    }

    fn fetch_existing(&self, _field_set: FieldSet) -> Result<Vec<ReconciledRecord>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.record.clone())
            .collect())
    }

    fn count_records(&self, _field_set: FieldSet) -> Result<i64> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }
}

#[derive(Default)]
struct MemoryLogStore {
    logs: Mutex<Vec<ExecutionLog>>,
    fail_writes: AtomicBool,
}

#[async_trait]
impl ExecutionLogStore for MemoryLogStore {
    async fn write_log(&self, log: ExecutionLog) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Database(DatabaseError::ConnectionFailed(
                "database is locked".to_string(),
            )));
        }
        self.logs.lock().unwrap().push(log);
        Ok(())
    }

    fn last_run(&self, field_set: Option<FieldSet>) -> Result<Option<ExecutionLog>> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|l| field_set.map_or(true, |fs| l.data_source == fs.data_source()))
            .cloned())
    }

    fn history(&self, limit: i64) -> Result<Vec<ExecutionLog>> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    reports: Mutex<Vec<RunReport>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    fn reports(&self) -> Vec<RunReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, report: &RunReport) -> Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Notification("SMTP relay refused".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

struct Harness {
    provider: Arc<MockProvider>,
    records: Arc<MemoryRecordStore>,
    logs: Arc<MemoryLogStore>,
    notifier: Arc<RecordingNotifier>,
    service: Arc<IngestionService>,
}

fn harness_with(provider: MockProvider, identifiers: Vec<Identifier>) -> Harness {
    let provider = Arc::new(provider);
    let records = Arc::new(MemoryRecordStore::default());
    let logs = Arc::new(MemoryLogStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let config = PipelineConfig {
        validator: ValidatorConfig::default(),
        retry: RetryPolicy::immediate(3),
    };
    let service = Arc::new(IngestionService::new(
        provider.clone(),
        IdentifierSet::new(identifiers),
        records.clone(),
        logs.clone(),
        notifier.clone(),
        config,
    ));
    Harness {
        provider,
        records,
        logs,
        notifier,
        service,
    }
}

fn aapl_msft() -> Vec<Identifier> {
    vec![
        Identifier::ticker("AAPL US Equity"),
        Identifier::ticker("MSFT US Equity"),
    ]
}

fn basic_row(position: usize, cur_ratio: Decimal) -> RawProviderRow {
    let mut metrics: Metrics = FieldSet::Basic
        .fields()
        .iter()
        .map(|f| (f.to_string(), Some(dec!(12.5))))
        .collect();
    metrics.insert("CUR_RATIO".to_string(), Some(cur_ratio));
    RawProviderRow::new(position, metrics, None)
}

fn two_rows() -> Vec<RawProviderRow> {
    vec![basic_row(0, dec!(0.87)), basic_row(1, dec!(1.84))]
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_end_to_end_success() {
    let h = harness_with(MockProvider::new(Script::Rows(two_rows())), aapl_msft());

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "manual")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(log.fetched_count, 2);
    assert_eq!(log.inserted_count, 2);
    assert_eq!(log.new_entry_count, 2);
    assert_eq!(log.skipped_duplicate_count, 0);
    assert_eq!(log.skipped_invalid_count, 0);
    assert_eq!(log.fetch_attempts, 1);
    assert_eq!(log.triggered_by, "manual");
    assert_eq!(log.data_source, "BLOOMBERG_BASIC");
    assert!(log.error_message.is_none());

    assert_eq!(h.records.symbols(), vec!["AAPL", "MSFT"]);
    let stored = h.records.rows.lock().unwrap();
    assert_eq!(stored[0].record.metrics["CUR_RATIO"], Some(dec!(0.87)));
    assert_eq!(stored[1].record.metrics["CUR_RATIO"], Some(dec!(1.84)));
    drop(stored);

    assert_eq!(h.logs.logs.lock().unwrap().len(), 1);
    let reports = h.notifier.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, RunStatus::Success);
    assert_eq!(reports[0].run_id, log.run_id);
}

#[tokio::test]
async fn test_second_run_inserts_nothing() {
    let h = harness_with(MockProvider::new(Script::Rows(two_rows())), aapl_msft());

    let first = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();
    let second = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(first.inserted_count, 2);
    assert_eq!(second.inserted_count, 0);
    assert_eq!(second.new_entry_count, 0);
    assert_eq!(second.skipped_duplicate_count, 2);
    assert_eq!(second.status, RunStatus::Success);
    assert_eq!(h.records.rows.lock().unwrap().len(), 2);
    assert_ne!(first.run_id, second.run_id);

    let history = h.service.history(10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].run_id, second.run_id);
}

#[tokio::test]
async fn test_updated_value_is_not_a_duplicate() {
    let h = harness_with(MockProvider::new(Script::Rows(two_rows())), aapl_msft());
    h.service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    let updated = harness_with(
        MockProvider::new(Script::Rows(vec![
            basic_row(0, dec!(0.87)),
            basic_row(1, dec!(1.85)),
        ])),
        aapl_msft(),
    );
    updated
        .records
        .rows
        .lock()
        .unwrap()
        .extend(h.records.rows.lock().unwrap().iter().cloned());

    let log = updated
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.inserted_count, 1);
    assert_eq!(log.skipped_duplicate_count, 1);
}

#[tokio::test]
async fn test_retry_exhaustion_fails_after_configured_attempts() {
    let h = harness_with(MockProvider::new(Script::AlwaysTimeout), aapl_msft());

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Failed);
    assert_eq!(h.provider.calls(), 3);
    assert_eq!(log.fetch_attempts, 3);
    let message = log.error_message.clone().unwrap();
    assert_eq!(message, "Timeout: MOCK");
    assert_eq!(log.execution_details["failedAt"], "FETCHING");

    assert_eq!(h.logs.logs.lock().unwrap().len(), 1);
    let reports = h.notifier.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, RunStatus::Failed);
    assert_eq!(reports[0].error_message, Some(message));
}

#[tokio::test]
async fn test_authentication_failure_is_not_retried() {
    let h = harness_with(MockProvider::new(Script::AuthFailure), aapl_msft());

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "manual")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Failed);
    assert_eq!(h.provider.calls(), 1);
    assert!(log
        .error_message
        .unwrap()
        .contains("invalid client credentials"));
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let h = harness_with(
        MockProvider::new(Script::TimeoutThenRows(2, two_rows())),
        aapl_msft(),
    );

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "manual")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(h.provider.calls(), 3);
    assert_eq!(log.fetch_attempts, 3);
    assert_eq!(log.inserted_count, 2);
}

#[tokio::test]
async fn test_count_mismatch_is_partial_not_failed() {
    let mut ids = aapl_msft();
    ids.push(Identifier::isin("US02079K3059"));
    let h = harness_with(MockProvider::new(Script::Rows(two_rows())), ids);

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Partial);
    assert_eq!(log.fetched_count, 2);
    assert_eq!(log.inserted_count, 2);
    assert_eq!(log.execution_details["countMismatch"], true);

    let report = &h.notifier.reports()[0];
    let mismatch = report
        .validation_issues
        .iter()
        .find(|i| i.kind == ValidationIssueKind::CountMismatch)
        .unwrap();
    assert!(mismatch.record_ref.is_none());
}

#[tokio::test]
async fn test_empty_response_is_partial() {
    let h = harness_with(MockProvider::new(Script::Rows(vec![])), aapl_msft());

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Partial);
    assert_eq!(log.inserted_count, 0);
    let report = &h.notifier.reports()[0];
    assert_eq!(
        report.validation_issues[0].kind,
        ValidationIssueKind::EmptyResponse
    );
}

#[tokio::test]
async fn test_empty_identifier_set_is_not_an_empty_response() {
    let h = harness_with(MockProvider::new(Script::Rows(vec![])), vec![]);

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(log.fetched_count, 0);
    assert_eq!(log.execution_details["emptyResponse"], false);
    assert!(h.notifier.reports()[0].validation_issues.is_empty());
}

#[tokio::test]
async fn test_invalid_records_are_skipped() {
    let mut bad = basic_row(1, dec!(1.84));
    bad.error_code = Some(10);
    let h = harness_with(
        MockProvider::new(Script::Rows(vec![basic_row(0, dec!(0.87)), bad])),
        aapl_msft(),
    );

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Partial);
    assert_eq!(log.skipped_invalid_count, 1);
    assert_eq!(log.inserted_count, 1);
    assert_eq!(h.records.symbols(), vec!["AAPL"]);
    assert_eq!(log.execution_details["rejections"]["PROVIDER_ERROR"], 1);

    let issue = &h.notifier.reports()[0].validation_issues[0];
    assert_eq!(issue.kind, ValidationIssueKind::ProviderError);
    assert_eq!(issue.record_ref.as_ref().unwrap().derived_symbol, "MSFT");
}

#[tokio::test]
async fn test_repeated_rows_within_a_run_are_deduplicated() {
    let ids = vec![
        Identifier::ticker("AAPL US Equity"),
        Identifier::ticker("AAPL US Equity"),
    ];
    let h = harness_with(
        MockProvider::new(Script::Rows(vec![
            basic_row(0, dec!(0.87)),
            basic_row(1, dec!(0.87)),
        ])),
        ids,
    );

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.inserted_count, 1);
    assert_eq!(log.skipped_duplicate_count, 1);
}

#[tokio::test]
async fn test_persistence_failure_fails_run() {
    let h = harness_with(MockProvider::new(Script::Rows(two_rows())), aapl_msft());
    h.records.fail_inserts.store(true, Ordering::SeqCst);

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Failed);
    assert_eq!(log.inserted_count, 0);
    assert!(log.error_message.unwrap().contains("disk I/O error"));
    assert_eq!(log.execution_details["failedAt"], "PERSISTING");
    assert_eq!(h.logs.logs.lock().unwrap().len(), 1);
    assert_eq!(h.notifier.reports().len(), 1);
}

#[tokio::test]
async fn test_notifier_failure_does_not_fail_run() {
    let h = harness_with(MockProvider::new(Script::Rows(two_rows())), aapl_msft());
    h.notifier.fail.store(true, Ordering::SeqCst);

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(h.notifier.reports().len(), 1);
    assert_eq!(h.logs.logs.lock().unwrap()[0].status, RunStatus::Success);
}

#[tokio::test]
async fn test_log_write_failure_still_notifies() {
    let h = harness_with(MockProvider::new(Script::Rows(two_rows())), aapl_msft());
    h.logs.fail_writes.store(true, Ordering::SeqCst);

    let log = h
        .service
        .run_ingestion(FieldSet::Basic, "scheduler")
        .await
        .unwrap();

    assert_eq!(log.status, RunStatus::Failed);
    assert!(log
        .error_message
        .unwrap()
        .contains("Failed to write execution log"));
    let reports = h.notifier.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, RunStatus::Failed);
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness_with(
        MockProvider::gated(Script::Rows(two_rows()), gate.clone()),
        aapl_msft(),
    );

    let service = h.service.clone();
    let first = tokio::spawn(async move { service.run_ingestion(FieldSet::Basic, "scheduler").await });

    while h.provider.calls() == 0 {
        tokio::task::yield_now().await;
    }

    let second = h.service.run_ingestion(FieldSet::Basic, "manual").await;
    assert!(matches!(second, Err(Error::RunInProgress)));

    gate.add_permits(1);
    let log = first.await.unwrap().unwrap();
    assert_eq!(log.status, RunStatus::Success);
    assert_eq!(h.provider.calls(), 1);
    assert_eq!(h.logs.logs.lock().unwrap().len(), 1);
}
