//! Reconciler: tags identifier-less provider rows with their request identifier.

mod reconcile_model;
mod reconciler;

pub use reconcile_model::{CountMismatch, ReconciledRecord, ReconciliationError};
pub use reconciler::{reconcile, Reconciliation};
