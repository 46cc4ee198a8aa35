//! Replays a saved provider response from disk.
//!
//! Used to re-run the pipeline offline against a response captured earlier,
//! e.g. when investigating a past run.

use std::path::PathBuf;

use async_trait::async_trait;
use log::info;
use serde_json::Value;

use crate::errors::ProviderError;
use crate::models::{parse_rows, FieldSet, Identifier, RawProviderRow};
use crate::provider::ProviderClient;

const PROVIDER_ID: &str = "REPLAY";

pub struct ReplayProvider {
    path: PathBuf,
}

impl ReplayProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProviderClient for ReplayProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch(
        &self,
        identifiers: &[Identifier],
        field_set: FieldSet,
    ) -> Result<Vec<RawProviderRow>, ProviderError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ProviderError::Configuration(format!(
                "Cannot read replay file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let body: Value = serde_json::from_str(&raw).map_err(|e| ProviderError::InvalidResponse {
            provider: PROVIDER_ID.to_string(),
            message: e.to_string(),
        })?;

        let rows = parse_rows(PROVIDER_ID, &body, field_set.fields())?;
        info!(
            "Replayed {} rows from {} for {} identifiers",
            rows.len(),
            self.path.display(),
            identifiers.len()
        );
        Ok(rows)
    }
}
