use ratiofeed_provider::Identifier;
use serde::{Deserialize, Serialize};

use crate::reconcile::ReconciledRecord;

/// What a validation issue is about.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationIssueKind {
    /// The provider returned no rows at all.
    EmptyResponse,
    /// Row and identifier counts differ; the tail may be misaligned.
    CountMismatch,
    /// The row carries a non-zero provider error code.
    ProviderError,
    /// A whitelisted metric is outside its plausible bounds.
    OutOfRange,
    /// Too many expected metrics are null.
    MissingRatioExcess,
}

impl ValidationIssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationIssueKind::EmptyResponse => "EMPTY_RESPONSE",
            ValidationIssueKind::CountMismatch => "COUNT_MISMATCH",
            ValidationIssueKind::ProviderError => "PROVIDER_ERROR",
            ValidationIssueKind::OutOfRange => "OUT_OF_RANGE",
            ValidationIssueKind::MissingRatioExcess => "MISSING_RATIO_EXCESS",
        }
    }
}

impl std::fmt::Display for ValidationIssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation severity levels.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationSeverity {
    /// Hard failure - the record is excluded from persistence.
    Hard,
    /// Soft warning - the record is kept, the issue is reported.
    Soft,
}

/// Points an issue back at the record that raised it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    pub position: usize,
    pub identifier: Identifier,
    pub derived_symbol: String,
}

impl From<&ReconciledRecord> for RecordRef {
    fn from(record: &ReconciledRecord) -> Self {
        Self {
            position: record.position,
            identifier: record.identifier.clone(),
            derived_symbol: record.derived_symbol.clone(),
        }
    }
}

/// One finding of the quality validator. Never persisted to the record store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// `None` for run-level issues.
    pub record_ref: Option<RecordRef>,
    pub kind: ValidationIssueKind,
    pub severity: ValidationSeverity,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub null_fields: Vec<String>,
    /// Full record, kept for completeness rejections so operators can review it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<ReconciledRecord>,
}

impl ValidationIssue {
    pub fn run_level(kind: ValidationIssueKind, detail: impl Into<String>) -> Self {
        Self {
            record_ref: None,
            kind,
            severity: ValidationSeverity::Soft,
            detail: detail.into(),
            null_fields: Vec::new(),
            record: None,
        }
    }

    pub fn for_record(
        record: &ReconciledRecord,
        kind: ValidationIssueKind,
        severity: ValidationSeverity,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            record_ref: Some(RecordRef::from(record)),
            kind,
            severity,
            detail: detail.into(),
            null_fields: Vec::new(),
            record: None,
        }
    }

    pub fn is_hard(&self) -> bool {
        self.severity == ValidationSeverity::Hard
    }
}

/// Verdict for one record.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationOutcome {
    pub accepted: bool,
    /// Kind of the first hard rule that fired.
    pub rejection: Option<ValidationIssueKind>,
    /// Every issue found, including those after the rejecting rule.
    pub issues: Vec<ValidationIssue>,
}

/// Verdicts for a whole batch.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub accepted: Vec<ReconciledRecord>,
    pub rejected: Vec<(ReconciledRecord, ValidationIssueKind)>,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}
