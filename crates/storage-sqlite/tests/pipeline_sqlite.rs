//! Runs the full ingestion pipeline against a real SQLite database.

use std::io::Write;
use std::sync::Arc;

use ratiofeed_core::notify::LogNotifier;
use ratiofeed_core::{IngestionService, PipelineConfig, RecordStore, RunStatus};
use ratiofeed_provider::{FieldSet, Identifier, IdentifierSet, ReplayProvider, RetryPolicy};
use ratiofeed_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, IngestionLogRepository, RecordRepository,
};
use tempfile::{tempdir, NamedTempFile};

const RESPONSE: &str = r#"[
  {"TOT_DEBT_TO_TOT_ASSET": 31.2, "CASH_DVD_COVERAGE": 6.8, "TOT_DEBT_TO_EBITDA": 0.86,
   "CUR_RATIO": 0.87, "QUICK_RATIO": 0.71, "GROSS_MARGIN": 46.2,
   "INTEREST_COVERAGE_RATIO": 29.1, "EBITDA_MARGIN": 34.1,
   "TOT_LIAB_AND_EQY": 364980, "NET_DEBT_TO_SHRHLDR_EQTY": 86.2},
  {"TOT_DEBT_TO_TOT_ASSET": 18.4, "CASH_DVD_COVERAGE": 3.9, "TOT_DEBT_TO_EBITDA": 0.42,
   "CUR_RATIO": 1.84, "QUICK_RATIO": 1.62, "GROSS_MARGIN": 69.8,
   "INTEREST_COVERAGE_RATIO": 51.7, "EBITDA_MARGIN": 52.3,
   "TOT_LIAB_AND_EQY": 512163, "NET_DEBT_TO_SHRHLDR_EQTY": -12.5}
]"#;

#[tokio::test]
async fn test_pipeline_is_idempotent_on_sqlite() {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("data").join("ratiofeed.db");
    let db_path = init(&db_path.to_string_lossy()).expect("Failed to init database");

    let pool = create_pool(&db_path).expect("Failed to create pool");
    run_migrations(&pool).expect("Failed to run migrations");
    let writer = spawn_writer((*pool).clone());
    let records = Arc::new(RecordRepository::new(pool.clone(), writer.clone()));
    let logs = Arc::new(IngestionLogRepository::new(pool.clone(), writer));

    let mut response = NamedTempFile::new().unwrap();
    response.write_all(RESPONSE.as_bytes()).unwrap();

    let service = IngestionService::new(
        Arc::new(ReplayProvider::new(response.path())),
        IdentifierSet::new(vec![
            Identifier::ticker("AAPL US Equity"),
            Identifier::ticker("MSFT US Equity"),
        ]),
        records.clone(),
        logs,
        Arc::new(LogNotifier),
        PipelineConfig {
            retry: RetryPolicy::immediate(1),
            ..PipelineConfig::default()
        },
    );

    let first = service
        .run_ingestion(FieldSet::Basic, "integration-test")
        .await
        .unwrap();
    assert_eq!(first.status, RunStatus::Success);
    assert_eq!(first.inserted_count, 2);
    assert_eq!(first.new_entry_count, 2);

    let second = service
        .run_ingestion(FieldSet::Basic, "integration-test")
        .await
        .unwrap();
    assert_eq!(second.status, RunStatus::Success);
    assert_eq!(second.inserted_count, 0);
    assert_eq!(second.skipped_duplicate_count, 2);
    assert_eq!(records.count_records(FieldSet::Basic).unwrap(), 2);

    let history = service.history(10).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].run_id, second.run_id);

    let last = service.last_run(Some(FieldSet::Basic)).unwrap().unwrap();
    assert_eq!(last.run_id, second.run_id);
    assert!(service.last_run(Some(FieldSet::Advanced)).unwrap().is_none());
}
