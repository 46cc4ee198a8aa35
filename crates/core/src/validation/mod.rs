//! Quality validation of reconciled records.

mod validation_model;
mod validator;

pub use validation_model::{
    RecordRef, ValidationIssue, ValidationIssueKind, ValidationOutcome, ValidationReport,
    ValidationSeverity,
};
pub use validator::QualityValidator;
