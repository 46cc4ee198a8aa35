//! Provider client trait definition.

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::models::{FieldSet, Identifier, RawProviderRow};

/// Trait for financial-data providers.
///
/// # Ordering contract
///
/// Implementations MUST return rows in the same order as `identifiers`:
/// row `i` answers identifier `i`. The provider never echoes identifiers
/// back, so this order is the only link between a row and the company it
/// describes. An implementation that cannot guarantee it (for example a
/// provider that silently drops unknown identifiers) must fail with
/// [`ProviderError::InvalidResponse`] instead of returning a shifted
/// sequence. Fewer rows than identifiers is allowed and is reported by the
/// reconciler as a count mismatch on the tail.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use ratiofeed_provider::provider::ProviderClient;
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl ProviderClient for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     async fn fetch(
///         &self,
///         identifiers: &[Identifier],
///         field_set: FieldSet,
///     ) -> Result<Vec<RawProviderRow>, ProviderError> {
///         // ...
///     }
/// }
/// ```
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Unique identifier for this provider, used in logs and errors.
    fn id(&self) -> &'static str;

    /// Fetches one row per identifier, in request order.
    async fn fetch(
        &self,
        identifiers: &[Identifier],
        field_set: FieldSet,
    ) -> Result<Vec<RawProviderRow>, ProviderError>;
}
