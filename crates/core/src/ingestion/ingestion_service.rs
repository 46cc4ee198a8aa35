use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use ratiofeed_provider::{FieldSet, IdentifierSet, ProviderClient};
use tokio::sync::Mutex;

use super::ingestion_model::{AcceptedRecord, ExecutionLog, RunReport, RunState, RunTracker};
use super::ingestion_traits::{ExecutionLogStore, Notifier, RecordStore};
use crate::config::PipelineConfig;
use crate::dedup::DuplicateIndex;
use crate::errors::{Error, Result};
use crate::reconcile::reconcile;
use crate::validation::QualityValidator;

/// Sequences one ingestion run end to end.
///
/// At most one run is in flight per service; a second concurrent call is
/// refused with [`Error::RunInProgress`] rather than racing on the
/// duplicate snapshot.
pub struct IngestionService {
    provider: Arc<dyn ProviderClient>,
    identifiers: IdentifierSet,
    record_store: Arc<dyn RecordStore>,
    log_store: Arc<dyn ExecutionLogStore>,
    notifier: Arc<dyn Notifier>,
    config: PipelineConfig,
    run_guard: Mutex<()>,
}

impl IngestionService {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        identifiers: IdentifierSet,
        record_store: Arc<dyn RecordStore>,
        log_store: Arc<dyn ExecutionLogStore>,
        notifier: Arc<dyn Notifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            provider,
            identifiers,
            record_store,
            log_store,
            notifier,
            config,
            run_guard: Mutex::new(()),
        }
    }

    pub fn identifiers(&self) -> &IdentifierSet {
        &self.identifiers
    }

    /// Runs the pipeline once for `field_set`.
    ///
    /// Pipeline failures do not surface as `Err`: they end the run as
    /// `FAILED` and are reported through the returned log. `Err` is only
    /// returned when the run could not start.
    pub async fn run_ingestion(
        &self,
        field_set: FieldSet,
        triggered_by: &str,
    ) -> Result<ExecutionLog> {
        let _guard = self.run_guard.try_lock().map_err(|_| Error::RunInProgress)?;

        let mut run = RunTracker::start(field_set, triggered_by);
        info!(
            "Starting {} ingestion run {} for {} identifiers (triggered by {})",
            field_set,
            run.run_id,
            self.identifiers.len(),
            triggered_by
        );

        if let Err(e) = self.execute(&mut run).await {
            error!("Run {} failed in {:?}: {}", run.run_id, run.state(), e);
            run.fail(failure_message(&e));
        }

        let log = self.record_log(&mut run).await;
        self.send_report(&mut run, &log).await;

        run.enter(if log.status.is_failure() {
            RunState::Failed
        } else {
            RunState::Done
        });

        Ok(log)
    }

    /// Most recent run, optionally for one field set.
    pub fn last_run(&self, field_set: Option<FieldSet>) -> Result<Option<ExecutionLog>> {
        self.log_store.last_run(field_set)
    }

    pub fn history(&self, limit: i64) -> Result<Vec<ExecutionLog>> {
        self.log_store.history(limit)
    }

    /// Everything from fetching to persisting. Any error is fatal for the run.
    async fn execute(&self, run: &mut RunTracker) -> Result<()> {
        let field_set = run.field_set;
        let fields = field_set.fields();
        let identifiers = self.identifiers.as_slice();
        let provider = self.provider.as_ref();

        run.enter(RunState::Fetching);
        let started = Instant::now();
        let outcome = self
            .config
            .retry
            .run(|attempt| async move {
                debug!(
                    "Fetching {} from {} (attempt {})",
                    field_set,
                    provider.id(),
                    attempt
                );
                let rows = provider.fetch(identifiers, field_set).await?;
                let reconciliation = reconcile(&rows, identifiers);
                Ok::<_, Error>((rows.len(), reconciliation))
            })
            .await;
        run.fetch_attempts = i64::from(outcome.attempts);
        run.provider_response_time_ms = Some(elapsed_ms(started));
        let (row_count, reconciliation) = outcome.result?;

        run.enter(RunState::Reconciling);
        run.fetched_count = row_count as i64;
        // Nothing requested and nothing returned is not an empty response.
        let mismatch = reconciliation.mismatch();
        run.empty_response = mismatch.is_some_and(|m| m.row_count == 0);
        run.count_mismatch = mismatch.is_some_and(|m| m.row_count > 0);

        let validator = QualityValidator::new(self.config.validator.clone(), fields.iter().copied());
        run.issues.extend(validator.run_issues(&reconciliation));

        run.enter(RunState::Validating);
        let (records, _) = reconciliation.into_parts();
        let report = validator.validate_batch(records);
        run.skipped_invalid_count = report.rejected_count() as i64;
        for (_, kind) in &report.rejected {
            *run.rejections.entry(kind.to_string()).or_default() += 1;
        }
        run.issues.extend(report.issues);

        run.enter(RunState::Deduping);
        let existing = self.record_store.fetch_existing(field_set)?;
        let mut index = DuplicateIndex::build(fields, &existing);
        let mut accepted = Vec::with_capacity(report.accepted.len());
        for record in report.accepted {
            match index.check_and_insert(&record) {
                Some(fingerprint) => accepted.push(AcceptedRecord::new(record, fields, fingerprint)),
                None => {
                    debug!("Skipping duplicate record for {}", record.identifier);
                    run.skipped_duplicate_count += 1;
                }
            }
        }

        run.enter(RunState::Persisting);
        let before = self.record_store.count_records(field_set)?;
        if !accepted.is_empty() {
            let started = Instant::now();
            let inserted = self.record_store.insert_batch(field_set, accepted).await?;
            run.insert_time_ms = Some(elapsed_ms(started));
            run.inserted_count = inserted as i64;
        }
        let after = self.record_store.count_records(field_set)?;
        run.new_entry_count = after - before;

        Ok(())
    }

    /// Finalizes and persists the log. A write failure turns the returned
    /// log into a FAILED one, which is then reported but not persisted.
    async fn record_log(&self, run: &mut RunTracker) -> ExecutionLog {
        run.enter(RunState::Logging);
        let log = run.finish();

        match self.log_store.write_log(log.clone()).await {
            Ok(()) => log,
            Err(e) => {
                error!("Failed to write execution log for run {}: {}", run.run_id, e);
                run.fail(format!("Failed to write execution log: {}", e));
                run.finish()
            }
        }
    }

    async fn send_report(&self, run: &mut RunTracker, log: &ExecutionLog) {
        run.enter(RunState::Notifying);
        let report = RunReport::new(log, run.field_set, std::mem::take(&mut run.issues));
        info!("{}", report.summary());

        if let Err(e) = self.notifier.notify(&report).await {
            warn!("Notification for run {} failed: {}", run.run_id, e);
        }
    }
}

/// Provider errors are recorded without the wrapping prefix.
fn failure_message(err: &Error) -> String {
    match err {
        Error::Provider(inner) => inner.to_string(),
        other => other.to_string(),
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
