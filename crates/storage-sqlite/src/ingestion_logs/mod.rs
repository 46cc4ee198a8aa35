mod model;
mod repository;

pub use model::IngestionLogDB;
pub use repository::IngestionLogRepository;
