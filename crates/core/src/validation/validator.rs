//! Record quality validation.
//!
//! Rules per record:
//! - Non-zero provider error code (hard)
//! - Completeness of expected metrics against the configured threshold (hard)
//! - Plausible bounds for whitelisted metrics (soft)
//!
//! All rules are evaluated so the run report lists every issue; the first
//! hard rule that fires decides the rejection kind.

use log::{debug, warn};

use super::validation_model::{
    ValidationIssue, ValidationIssueKind, ValidationOutcome, ValidationReport, ValidationSeverity,
};
use crate::config::ValidatorConfig;
use crate::reconcile::{ReconciledRecord, Reconciliation};

/// Quality validator for reconciled records.
pub struct QualityValidator {
    config: ValidatorConfig,
    expected_fields: Vec<String>,
}

impl QualityValidator {
    /// Create a validator for the given expected metric list.
    pub fn new<I, S>(config: ValidatorConfig, expected_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            config,
            expected_fields: expected_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate one record.
    pub fn validate(&self, record: &ReconciledRecord) -> ValidationOutcome {
        let mut issues: Vec<ValidationIssue> = Vec::new();

        self.check_provider_error(record, &mut issues);
        self.check_completeness(record, &mut issues);
        self.check_ranges(record, &mut issues);

        let rejection = issues.iter().find(|i| i.is_hard()).map(|i| i.kind);

        for issue in issues.iter().filter(|i| !i.is_hard()) {
            warn!(
                "Validation warning for {}: {}",
                record.identifier, issue.detail
            );
        }

        ValidationOutcome {
            accepted: rejection.is_none(),
            rejection,
            issues,
        }
    }

    /// Validate all records, splitting them into accepted and rejected.
    pub fn validate_batch(&self, records: Vec<ReconciledRecord>) -> ValidationReport {
        let mut report = ValidationReport::default();

        for record in records {
            let outcome = self.validate(&record);
            report.issues.extend(outcome.issues);
            match outcome.rejection {
                None => report.accepted.push(record),
                Some(kind) => {
                    debug!("Rejected {} ({})", record.identifier, kind);
                    report.rejected.push((record, kind));
                }
            }
        }

        report
    }

    /// Run-level issues: empty response and row/identifier count mismatch.
    pub fn run_issues(&self, reconciliation: &Reconciliation) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if reconciliation.outcomes().is_empty() {
            return issues;
        }

        if let Some(mismatch) = reconciliation.mismatch() {
            if mismatch.row_count == 0 {
                issues.push(ValidationIssue::run_level(
                    ValidationIssueKind::EmptyResponse,
                    format!(
                        "Provider returned no rows for {} identifiers",
                        mismatch.identifier_count
                    ),
                ));
            } else {
                let unpaired: Vec<String> =
                    reconciliation.errors().map(|e| e.to_string()).collect();
                issues.push(ValidationIssue::run_level(
                    ValidationIssueKind::CountMismatch,
                    format!(
                        "Provider returned {} rows for {} identifiers; {}",
                        mismatch.row_count,
                        mismatch.identifier_count,
                        unpaired.join("; ")
                    ),
                ));
            }
        }

        issues
    }

    fn check_provider_error(&self, record: &ReconciledRecord, issues: &mut Vec<ValidationIssue>) {
        if let Some(code) = record.provider_error_code.filter(|c| *c != 0) {
            issues.push(ValidationIssue::for_record(
                record,
                ValidationIssueKind::ProviderError,
                ValidationSeverity::Hard,
                format!("Provider error code {} for {}", code, record.identifier),
            ));
        }
    }

    /// Missing keys count as null. An empty expected list is always complete.
    fn check_completeness(&self, record: &ReconciledRecord, issues: &mut Vec<ValidationIssue>) {
        if self.expected_fields.is_empty() {
            return;
        }

        let null_fields: Vec<String> = self
            .expected_fields
            .iter()
            .filter(|field| !matches!(record.metrics.get(field.as_str()), Some(Some(_))))
            .cloned()
            .collect();

        let total = self.expected_fields.len();
        let present = total - null_fields.len();
        let ratio = present as f64 / total as f64;

        if ratio + f64::EPSILON >= self.config.completeness_threshold {
            return;
        }

        let mut issue = ValidationIssue::for_record(
            record,
            ValidationIssueKind::MissingRatioExcess,
            ValidationSeverity::Hard,
            format!(
                "{} of {} expected metrics present ({:.1}%), below threshold {:.1}%",
                present,
                total,
                ratio * 100.0,
                self.config.completeness_threshold * 100.0
            ),
        );
        issue.null_fields = null_fields;
        issue.record = Some(record.clone());
        issues.push(issue);
    }

    fn check_ranges(&self, record: &ReconciledRecord, issues: &mut Vec<ValidationIssue>) {
        for rule in &self.config.range_rules {
            let Some(Some(value)) = record.metrics.get(&rule.metric) else {
                continue;
            };
            if !rule.contains(*value) {
                issues.push(ValidationIssue::for_record(
                    record,
                    ValidationIssueKind::OutOfRange,
                    ValidationSeverity::Soft,
                    format!(
                        "{} = {} outside [{}, {}]",
                        rule.metric, value, rule.min, rule.max
                    ),
                ));
            }
        }
    }
}
