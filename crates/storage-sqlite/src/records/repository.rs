use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;
use log::debug;
use ratiofeed_core::{AcceptedRecord, RecordStore, ReconciledRecord, Result};
use ratiofeed_provider::FieldSet;

use super::model::FinancialRecordDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::financial_records;
use crate::schema::financial_records::dsl as records_dsl;

pub struct RecordRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl RecordRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        RecordRepository { pool, writer }
    }

    pub fn load_records_impl(&self, table: &str) -> Result<Vec<ReconciledRecord>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = records_dsl::financial_records
            .filter(records_dsl::dataset.eq(table))
            .order(records_dsl::id.asc())
            .select(FinancialRecordDB::as_select())
            .load::<FinancialRecordDB>(&mut conn)
            .map_err(StorageError::from)?;

        let records = rows
            .into_iter()
            .enumerate()
            .map(|(position, row)| row.into_reconciled(position))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn count_records_impl(&self, table: &str) -> Result<i64> {
        let mut conn = get_connection(&self.pool)?;
        let count = records_dsl::financial_records
            .filter(records_dsl::dataset.eq(table))
            .count()
            .get_result::<i64>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(count)
    }
}

#[async_trait]
impl RecordStore for RecordRepository {
    async fn insert_batch(
        &self,
        field_set: FieldSet,
        records: Vec<AcceptedRecord>,
    ) -> Result<usize> {
        let rows = records
            .iter()
            .map(|record| FinancialRecordDB::from_accepted(field_set, record))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let inserted = self
            .writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut inserted = 0;
                for row in &rows {
                    inserted += diesel::insert_into(financial_records::table)
                        .values(row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(inserted)
            })
            .await?;

        debug!("Inserted {} rows into {}", inserted, field_set.table_name());
        Ok(inserted)
    }

    fn fetch_existing(&self, field_set: FieldSet) -> Result<Vec<ReconciledRecord>> {
        self.load_records_impl(field_set.table_name())
    }

    fn count_records(&self, field_set: FieldSet) -> Result<i64> {
        self.count_records_impl(field_set.table_name())
    }
}
