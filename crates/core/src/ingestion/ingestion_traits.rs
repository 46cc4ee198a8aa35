//! Storage and notification boundaries consumed by the ingestion service.
//!
//! These traits carry no database types so the pipeline can run against
//! SQLite, an in-memory fake, or anything else.

use async_trait::async_trait;
use ratiofeed_provider::FieldSet;

use super::ingestion_model::{AcceptedRecord, ExecutionLog, RunReport};
use crate::errors::Result;
use crate::reconcile::ReconciledRecord;

/// Persistence writer for ratio records. One logical table per [`FieldSet`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts all records atomically. Either every row lands or none does.
    ///
    /// Returns the number of inserted rows.
    async fn insert_batch(&self, field_set: FieldSet, records: Vec<AcceptedRecord>)
        -> Result<usize>;

    /// Every persisted row of the table, used to build the duplicate index.
    fn fetch_existing(&self, field_set: FieldSet) -> Result<Vec<ReconciledRecord>>;

    /// Total number of rows in the table.
    fn count_records(&self, field_set: FieldSet) -> Result<i64>;
}

/// Append-only store of execution logs, keyed by run id.
#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    async fn write_log(&self, log: ExecutionLog) -> Result<()>;

    /// Most recent run, optionally restricted to one field set.
    fn last_run(&self, field_set: Option<FieldSet>) -> Result<Option<ExecutionLog>>;

    /// Most recent runs first.
    fn history(&self, limit: i64) -> Result<Vec<ExecutionLog>>;
}

/// Receives exactly one report per run. Delivery is best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, report: &RunReport) -> Result<()>;
}
