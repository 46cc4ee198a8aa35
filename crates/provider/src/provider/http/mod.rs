//! HTTP provider implementation.
//!
//! Talks to a Bloomberg-style data-license REST endpoint:
//!
//! - Token: `POST {oauth_endpoint}` with `grant_type=client_credentials`
//!   and HTTP basic auth, returning `{"access_token", "expires_in"}`.
//! - Data: `POST {api_host}/v1/financials/request` with a Bearer token and
//!   `{"identifiers": [...], "fields": [...]}`, returning one JSON object per
//!   identifier in request order.
//!
//! # Status mapping
//!
//! | HTTP | Error |
//! |------|-------|
//! | 401, 403 | `Authentication` |
//! | 400, 404, 422 | `MalformedRequest` |
//! | 408, 429, 5xx | `TransientRuntime` |

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::errors::ProviderError;
use crate::models::{parse_rows, FieldSet, Identifier, RawProviderRow};
use crate::provider::ProviderClient;

const PROVIDER_ID: &str = "BLOOMBERG";
const DATA_PATH: &str = "/v1/financials/request";

/// Default HTTP request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh the token this long before the provider says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Connection settings for [`HttpRatioProvider`].
#[derive(Clone, Debug)]
pub struct HttpProviderConfig {
    pub api_host: String,
    pub oauth_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Serialize)]
struct DataRequest<'a> {
    identifiers: &'a [Identifier],
    fields: &'a [&'static str],
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Authenticated HTTP client for the financial-ratio endpoint.
pub struct HttpRatioProvider {
    client: Client,
    config: HttpProviderConfig,
    token: Mutex<Option<CachedToken>>,
}

impl HttpRatioProvider {
    pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
        if config.client_id.trim().is_empty() || config.client_secret.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "Provider client id and secret are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            config,
            token: Mutex::new(None),
        })
    }

    fn data_url(&self) -> String {
        format!("{}{}", self.config.api_host.trim_end_matches('/'), DATA_PATH)
    }

    /// Returns a cached token or fetches a fresh one.
    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting new access token from {}", self.config.oauth_endpoint);
        let response = self
            .client
            .post(&self.config.oauth_endpoint)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER_ID, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderError::Authentication {
                        provider: PROVIDER_ID.to_string(),
                        message: format!("Token request rejected ({}): {}", status, body),
                    }
                }
                _ => classify_status(status, body),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER_ID, e))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        let expires_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        *guard = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    /// Forget the cached token so the next call re-authenticates.
    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }
}

#[async_trait]
impl ProviderClient for HttpRatioProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch(
        &self,
        identifiers: &[Identifier],
        field_set: FieldSet,
    ) -> Result<Vec<RawProviderRow>, ProviderError> {
        if identifiers.is_empty() {
            return Err(ProviderError::MalformedRequest {
                provider: PROVIDER_ID.to_string(),
                message: "Request contains no identifiers".to_string(),
            });
        }

        let token = self.access_token().await?;
        let fields = field_set.fields();

        info!(
            "Requesting {} fields for {} identifiers from {}",
            fields.len(),
            identifiers.len(),
            PROVIDER_ID
        );

        let response = self
            .client
            .post(self.data_url())
            .bearer_auth(token)
            .json(&DataRequest {
                identifiers,
                fields,
            })
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER_ID, e))?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.invalidate_token().await;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::from_transport(PROVIDER_ID, e))?;

        parse_rows(PROVIDER_ID, &body, fields)
    }
}

/// Maps a non-success HTTP status onto the provider error taxonomy.
fn classify_status(status: StatusCode, body: String) -> ProviderError {
    let message = if body.trim().is_empty() {
        format!("HTTP error: {}", status)
    } else {
        format!("HTTP error: {} - {}", status, body.trim())
    };
    let provider = PROVIDER_ID.to_string();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Authentication { provider, message }
        }
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::MalformedRequest { provider, message }
        }
        StatusCode::REQUEST_TIMEOUT => ProviderError::Timeout { provider },
        s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => {
            ProviderError::TransientRuntime { provider, message }
        }
        _ => ProviderError::InvalidResponse { provider, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HttpProviderConfig {
        HttpProviderConfig {
            api_host: "https://api.example.com/".to_string(),
            oauth_endpoint: "https://auth.example.com/token".to_string(),
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let result = HttpRatioProvider::new(HttpProviderConfig {
            client_secret: String::new(),
            ..config()
        });
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn test_data_url_trims_trailing_slash() {
        let provider = HttpRatioProvider::new(config()).unwrap();
        assert_eq!(
            provider.data_url(),
            "https://api.example.com/v1/financials/request"
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, String::new()),
            ProviderError::Authentication { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, "bad field".to_string()),
            ProviderError::MalformedRequest { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ProviderError::TransientRuntime { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            ProviderError::TransientRuntime { .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::REQUEST_TIMEOUT, String::new()),
            ProviderError::Timeout { .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_request_is_malformed() {
        let provider = HttpRatioProvider::new(config()).unwrap();
        let result = provider.fetch(&[], FieldSet::Basic).await;
        assert!(matches!(result, Err(ProviderError::MalformedRequest { .. })));
    }
}
