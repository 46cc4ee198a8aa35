//! Database model for execution logs.

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use ratiofeed_core::{ExecutionLog, RunStatus};
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;

#[derive(
    Queryable, Identifiable, Selectable, Insertable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::ingestion_logs)]
#[diesel(primary_key(run_id))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct IngestionLogDB {
    pub run_id: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub fetched_count: i64,
    pub inserted_count: i64,
    pub skipped_duplicate_count: i64,
    pub skipped_invalid_count: i64,
    pub new_entry_count: i64,
    pub error_message: Option<String>,
    pub triggered_by: String,
    pub data_source: String,
    pub fetch_attempts: i64,
    pub provider_response_time_ms: Option<i64>,
    pub insert_time_ms: Option<i64>,
    pub execution_details: String,
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::SerializationError(format!("timestamp '{}': {}", raw, e)))
}

impl From<ExecutionLog> for IngestionLogDB {
    fn from(log: ExecutionLog) -> Self {
        Self {
            run_id: log.run_id,
            start_time: format_time(&log.start_time),
            end_time: format_time(&log.end_time),
            status: log.status.as_str().to_string(),
            fetched_count: log.fetched_count,
            inserted_count: log.inserted_count,
            skipped_duplicate_count: log.skipped_duplicate_count,
            skipped_invalid_count: log.skipped_invalid_count,
            new_entry_count: log.new_entry_count,
            error_message: log.error_message,
            triggered_by: log.triggered_by,
            data_source: log.data_source,
            fetch_attempts: log.fetch_attempts,
            provider_response_time_ms: log.provider_response_time_ms,
            insert_time_ms: log.insert_time_ms,
            execution_details: log.execution_details.to_string(),
        }
    }
}

impl TryFrom<IngestionLogDB> for ExecutionLog {
    type Error = StorageError;

    fn try_from(db: IngestionLogDB) -> Result<Self, Self::Error> {
        Ok(Self {
            start_time: parse_time(&db.start_time)?,
            end_time: parse_time(&db.end_time)?,
            status: db
                .status
                .parse::<RunStatus>()
                .map_err(StorageError::SerializationError)?,
            execution_details: serde_json::from_str(&db.execution_details)?,
            run_id: db.run_id,
            fetched_count: db.fetched_count,
            inserted_count: db.inserted_count,
            skipped_duplicate_count: db.skipped_duplicate_count,
            skipped_invalid_count: db.skipped_invalid_count,
            new_entry_count: db.new_entry_count,
            error_message: db.error_message,
            triggered_by: db.triggered_by,
            data_source: db.data_source,
            fetch_attempts: db.fetch_attempts,
            provider_response_time_ms: db.provider_response_time_ms,
            insert_time_ms: db.insert_time_ms,
        })
    }
}
