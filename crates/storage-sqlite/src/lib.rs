//! SQLite storage for ratiofeed.
//!
//! Implements the `RecordStore` and `ExecutionLogStore` traits of
//! `ratiofeed-core` with Diesel over SQLite:
//! - Connection pooling and WAL setup
//! - Embedded Diesel migrations
//! - A single writer actor so every batch lands in one immediate transaction
//!
//! ```text
//!   ratiofeed-core (traits)
//!           │
//!           ▼
//!   storage-sqlite (this crate)
//!           │
//!           ▼
//!       SQLite DB
//! ```

pub mod db;
pub mod errors;
pub mod schema;

// Repository implementations
pub mod ingestion_logs;
pub mod records;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use ingestion_logs::IngestionLogRepository;
pub use records::RecordRepository;

// Re-export from ratiofeed-core for convenience
pub use ratiofeed_core::errors::{DatabaseError, Error, Result};
