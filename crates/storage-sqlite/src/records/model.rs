//! Database model for persisted ratio records.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use diesel::prelude::*;
use ratiofeed_core::{AcceptedRecord, ReconciledRecord};
use ratiofeed_provider::{FieldSet, Identifier, IdentifierType, Metrics};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::StorageError;

/// One row of `financial_records`.
///
/// Metrics are stored as a JSON object of decimal strings so that values
/// round-trip without float conversion.
#[derive(Queryable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::financial_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct FinancialRecordDB {
    pub id: String,
    pub dataset: String,
    pub identifier_type: String,
    pub identifier_value: String,
    pub ticker: String,
    pub metrics: String,
    pub fingerprint: String,
    pub created_at: String,
}

impl FinancialRecordDB {
    pub fn from_accepted(
        field_set: FieldSet,
        accepted: &AcceptedRecord,
    ) -> Result<Self, StorageError> {
        let record = &accepted.record;
        let metrics: BTreeMap<&str, Option<String>> = record
            .metrics
            .iter()
            .map(|(name, value)| (name.as_str(), value.map(|v| v.to_string())))
            .collect();

        Ok(Self {
            id: Uuid::now_v7().to_string(),
            dataset: field_set.table_name().to_string(),
            identifier_type: record.identifier.kind.as_str().to_string(),
            identifier_value: record.identifier.value.clone(),
            ticker: record.derived_symbol.clone(),
            metrics: serde_json::to_string(&metrics)?,
            fingerprint: accepted.fingerprint.clone(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        })
    }

    /// Rebuilds the record as the pipeline sees it. `position` is the
    /// row's index in the listing.
    pub fn into_reconciled(self, position: usize) -> Result<ReconciledRecord, StorageError> {
        let kind = IdentifierType::from_str(&self.identifier_type)
            .map_err(StorageError::SerializationError)?;
        let stored: BTreeMap<String, Option<String>> = serde_json::from_str(&self.metrics)?;

        let mut metrics = Metrics::new();
        for (name, value) in stored {
            let value = match value {
                Some(raw) => Some(Decimal::from_str(&raw).map_err(|e| {
                    StorageError::SerializationError(format!(
                        "metric {} of record {}: {}",
                        name, self.id, e
                    ))
                })?),
                None => None,
            };
            metrics.insert(name, value);
        }

        Ok(ReconciledRecord {
            position,
            identifier: Identifier::new(kind, self.identifier_value),
            derived_symbol: self.ticker,
            metrics,
            provider_error_code: None,
        })
    }
}
