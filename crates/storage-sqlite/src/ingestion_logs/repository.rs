use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use ratiofeed_core::{ExecutionLog, ExecutionLogStore, Result};
use ratiofeed_provider::FieldSet;

use super::model::IngestionLogDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::ingestion_logs;
use crate::schema::ingestion_logs::dsl as logs_dsl;

pub struct IngestionLogRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl IngestionLogRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        IngestionLogRepository { pool, writer }
    }

    pub fn load_logs_impl(
        &self,
        source: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ExecutionLog>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = logs_dsl::ingestion_logs
            .select(IngestionLogDB::as_select())
            .order((logs_dsl::start_time.desc(), logs_dsl::run_id.desc()))
            .limit(limit.max(0))
            .into_boxed();
        if let Some(source) = source {
            query = query.filter(logs_dsl::data_source.eq(source.to_string()));
        }

        let rows = query
            .load::<IngestionLogDB>(&mut conn)
            .map_err(StorageError::from)?;
        let logs = rows
            .into_iter()
            .map(ExecutionLog::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}

#[async_trait]
impl ExecutionLogStore for IngestionLogRepository {
    async fn write_log(&self, log: ExecutionLog) -> Result<()> {
        let row = IngestionLogDB::from(log);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(ingestion_logs::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    fn last_run(&self, field_set: Option<FieldSet>) -> Result<Option<ExecutionLog>> {
        let source = field_set.map(|fs| fs.data_source());
        Ok(self.load_logs_impl(source, 1)?.into_iter().next())
    }

    fn history(&self, limit: i64) -> Result<Vec<ExecutionLog>> {
        self.load_logs_impl(None, limit)
    }
}
