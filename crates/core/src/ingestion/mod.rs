//! Ingestion orchestration: fetch, reconcile, validate, dedup, persist, log, notify.

mod ingestion_model;
mod ingestion_service;
mod ingestion_traits;

#[cfg(test)]
mod ingestion_service_tests;

pub use ingestion_model::{AcceptedRecord, ExecutionLog, RunReport, RunState, RunStatus};
pub use ingestion_service::IngestionService;
pub use ingestion_traits::{ExecutionLogStore, Notifier, RecordStore};
