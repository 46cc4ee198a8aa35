//! ratiofeed core - the ingestion reconciliation and validation pipeline.
//!
//! This crate turns identifier-less provider rows into identifier-tagged,
//! quality-checked, deduplicated records. It is database-agnostic and
//! defines the storage and notification traits that the `storage-sqlite`
//! crate and the CLI implement.

pub mod config;
pub mod dedup;
pub mod errors;
pub mod ingestion;
pub mod notify;
pub mod reconcile;
pub mod validation;

pub use config::{PipelineConfig, RangeRule, ValidatorConfig};
pub use ingestion::{
    AcceptedRecord, ExecutionLog, ExecutionLogStore, IngestionService, Notifier, RecordStore,
    RunReport, RunState, RunStatus,
};
pub use reconcile::{reconcile, ReconciledRecord, Reconciliation, ReconciliationError};
pub use validation::{QualityValidator, ValidationIssue, ValidationIssueKind, ValidationSeverity};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
