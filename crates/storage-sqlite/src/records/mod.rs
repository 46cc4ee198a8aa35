mod model;
mod repository;

pub use model::FinancialRecordDB;
pub use repository::RecordRepository;
