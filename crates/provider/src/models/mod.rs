//! Data types shared between the provider clients and the pipeline.

mod field_set;
mod identifier;
mod row;

pub use field_set::{FieldSet, ADVANCED_FIELDS, BASIC_FIELDS};
pub use identifier::{Identifier, IdentifierSet, IdentifierType};
pub use row::{normalize_metric, parse_rows, Metrics, RawProviderRow, METRIC_SCALE};
