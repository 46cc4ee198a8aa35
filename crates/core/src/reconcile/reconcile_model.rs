use ratiofeed_provider::{Identifier, Metrics};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A provider row tagged with the identifier that requested it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledRecord {
    /// Position in the request (or in the store listing for persisted rows).
    pub position: usize,
    pub identifier: Identifier,
    pub derived_symbol: String,
    pub metrics: Metrics,
    pub provider_error_code: Option<i64>,
}

impl ReconciledRecord {
    pub fn new(
        position: usize,
        identifier: Identifier,
        metrics: Metrics,
        provider_error_code: Option<i64>,
    ) -> Self {
        let derived_symbol = identifier.derived_symbol();
        Self {
            position,
            identifier,
            derived_symbol,
            metrics,
            provider_error_code,
        }
    }
}

/// Why a position could not be reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationError {
    /// The request had an identifier here but the provider sent no row.
    #[error("No provider row for identifier {identifier} at position {position}")]
    MissingRow {
        position: usize,
        identifier: Identifier,
    },

    /// The provider sent a row with no identifier left to pair it with.
    #[error("Provider row at position {position} has no matching identifier")]
    UnmatchedRow { position: usize },
}

/// Lengths of the two sequences when they disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountMismatch {
    pub identifier_count: usize,
    pub row_count: usize,
}

impl CountMismatch {
    pub fn reconciled_count(&self) -> usize {
        self.identifier_count.min(self.row_count)
    }
}
