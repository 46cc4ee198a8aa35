//! Positional reconciliation of provider rows with request identifiers.
//!
//! The provider answers in request order and never echoes identifiers, so
//! row `i` is attributed to identifier `i`. This is a trust boundary: the
//! order is guaranteed by the [`ProviderClient`](ratiofeed_provider::ProviderClient)
//! contract, not verified here.

use log::warn;
use ratiofeed_provider::{Identifier, RawProviderRow};

use super::reconcile_model::{CountMismatch, ReconciledRecord, ReconciliationError};

/// Per-position outcome of one reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    outcomes: Vec<Result<ReconciledRecord, ReconciliationError>>,
    mismatch: Option<CountMismatch>,
}

impl Reconciliation {
    /// Every position of the longer sequence, tagged.
    pub fn outcomes(&self) -> &[Result<ReconciledRecord, ReconciliationError>] {
        &self.outcomes
    }

    /// Successfully reconciled records (the overlapping prefix).
    pub fn records(&self) -> impl Iterator<Item = &ReconciledRecord> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    /// Positions that could not be paired.
    pub fn errors(&self) -> impl Iterator<Item = &ReconciliationError> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }

    pub fn mismatch(&self) -> Option<CountMismatch> {
        self.mismatch
    }

    pub fn into_parts(self) -> (Vec<ReconciledRecord>, Vec<ReconciliationError>) {
        let mut records = Vec::with_capacity(self.outcomes.len());
        let mut errors = Vec::new();
        for outcome in self.outcomes {
            match outcome {
                Ok(record) => records.push(record),
                Err(err) => errors.push(err),
            }
        }
        (records, errors)
    }
}

/// Zips `rows` with `identifiers` by position.
///
/// Metrics and error codes are copied verbatim. When the lengths differ the
/// overlapping prefix is still reconciled and the tail is reported as
/// [`ReconciliationError`]s plus a [`CountMismatch`].
pub fn reconcile(rows: &[RawProviderRow], identifiers: &[Identifier]) -> Reconciliation {
    let longest = rows.len().max(identifiers.len());
    let mut outcomes = Vec::with_capacity(longest);

    for position in 0..longest {
        let outcome = match (rows.get(position), identifiers.get(position)) {
            (Some(row), Some(identifier)) => Ok(ReconciledRecord::new(
                position,
                identifier.clone(),
                row.metrics.clone(),
                row.error_code,
            )),
            (None, Some(identifier)) => Err(ReconciliationError::MissingRow {
                position,
                identifier: identifier.clone(),
            }),
            (Some(_), None) => Err(ReconciliationError::UnmatchedRow { position }),
            (None, None) => unreachable!("position is below the longer length"),
        };
        outcomes.push(outcome);
    }

    let mismatch = (rows.len() != identifiers.len()).then(|| CountMismatch {
        identifier_count: identifiers.len(),
        row_count: rows.len(),
    });

    if let Some(m) = mismatch {
        warn!(
            "Provider returned {} rows for {} identifiers; only the first {} are reconciled and alignment of the tail is not guaranteed",
            m.row_count,
            m.identifier_count,
            m.reconciled_count()
        );
    }

    Reconciliation { outcomes, mismatch }
}
