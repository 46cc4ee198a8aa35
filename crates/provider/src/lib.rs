//! ratiofeed provider crate
//!
//! Everything needed to ask the external financial-data provider for
//! ratios and get back positional rows:
//!
//! - [`Identifier`] / [`IdentifierSet`] - the ordered request universe
//! - [`FieldSet`] - named metric groups (`basic`, `advanced`) and their tables
//! - [`RawProviderRow`] - identifier-less response rows
//! - [`ProviderClient`] - the fetch boundary, with HTTP and replay clients
//! - [`RetryPolicy`] - bounded exponential backoff driven by [`Retryable`]
//!
//! ```text
//! IdentifierSet + FieldSet
//!          |
//!          v
//!   +----------------+      RetryPolicy wraps the call
//!   | ProviderClient |  <-- retries only Retryable errors
//!   +----------------+
//!          |
//!          v
//!   Vec<RawProviderRow>   (request order, no identifiers)
//! ```

pub mod errors;
pub mod models;
pub mod provider;
pub mod retry;

pub use errors::{ProviderError, RetryClass, Retryable};
pub use models::{
    normalize_metric, FieldSet, Identifier, IdentifierSet, IdentifierType, Metrics,
    RawProviderRow,
};
pub use provider::{HttpProviderConfig, HttpRatioProvider, ProviderClient, ReplayProvider};
pub use retry::{RetryOutcome, RetryPolicy, MAX_RETRY_WAIT};
