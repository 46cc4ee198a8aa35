use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use ratiofeed_core::{PipelineConfig, ValidatorConfig};
use ratiofeed_provider::{HttpProviderConfig, RetryPolicy, MAX_RETRY_WAIT};

const DEFAULT_API_HOST: &str = "https://api.bloomberg.com";
const DEFAULT_OAUTH_ENDPOINT: &str = "https://bsso.blpprofessional.com/ext/api/as/token.oauth2";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

pub struct Config {
    pub db_path: String,
    pub identifiers_file: PathBuf,
    pub api_host: String,
    pub oauth_endpoint: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub request_timeout: Duration,
    pub pipeline: PipelineConfig,
    pub webhook_url: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_ms: u64 = parse_or(&get, "RF_REQUEST_TIMEOUT_MS", 30_000)?;
        let threshold: f64 = parse_or(
            &get,
            "RF_COMPLETENESS_THRESHOLD",
            ratiofeed_core::config::DEFAULT_COMPLETENESS_THRESHOLD,
        )?;
        let validator = ValidatorConfig::with_threshold(threshold)
            .context("Invalid RF_COMPLETENESS_THRESHOLD")?;

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: parse_or(&get, "RF_RETRY_MAX_ATTEMPTS", defaults.max_attempts)?,
            min_wait: wait_secs(&get, "RF_RETRY_MIN_WAIT_SECS", defaults.min_wait)?,
            max_wait: wait_secs(&get, "RF_RETRY_MAX_WAIT_SECS", defaults.max_wait)?,
            ..defaults
        };
        if retry.max_attempts == 0 {
            return Err(anyhow!("RF_RETRY_MAX_ATTEMPTS must be at least 1"));
        }

        let log_format = match get("RF_LOG_FORMAT").as_deref().map(str::to_ascii_lowercase) {
            None => LogFormat::Text,
            Some(f) if f == "text" => LogFormat::Text,
            Some(f) if f == "json" => LogFormat::Json,
            Some(other) => return Err(anyhow!("Invalid RF_LOG_FORMAT '{}' (json|text)", other)),
        };

        Ok(Self {
            db_path: get("RF_DB_PATH").unwrap_or_else(|| "./db/ratiofeed.db".into()),
            identifiers_file: get("RF_IDENTIFIERS_FILE")
                .unwrap_or_else(|| "data/identifiers.json".into())
                .into(),
            api_host: get("RF_PROVIDER_API_HOST").unwrap_or_else(|| DEFAULT_API_HOST.into()),
            oauth_endpoint: get("RF_PROVIDER_OAUTH_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_OAUTH_ENDPOINT.into()),
            client_id: get("RF_PROVIDER_CLIENT_ID"),
            client_secret: get("RF_PROVIDER_CLIENT_SECRET"),
            request_timeout: Duration::from_millis(timeout_ms),
            pipeline: PipelineConfig { validator, retry },
            webhook_url: get("RF_NOTIFY_WEBHOOK_URL"),
            log_format,
        })
    }

    /// Settings for the live provider. Every missing credential is named.
    pub fn http_provider(&self) -> anyhow::Result<HttpProviderConfig> {
        let mut missing = Vec::new();
        if self.client_id.is_none() {
            missing.push("RF_PROVIDER_CLIENT_ID");
        }
        if self.client_secret.is_none() {
            missing.push("RF_PROVIDER_CLIENT_SECRET");
        }
        if !missing.is_empty() {
            return Err(anyhow!(
                "Missing provider configuration: {}",
                missing.join(", ")
            ));
        }

        Ok(HttpProviderConfig {
            api_host: self.api_host.clone(),
            oauth_endpoint: self.oauth_endpoint.clone(),
            client_id: self.client_id.clone().unwrap_or_default(),
            client_secret: self.client_secret.clone().unwrap_or_default(),
            request_timeout: self.request_timeout,
        })
    }
}

/// Retry waits in whole seconds, at most [`MAX_RETRY_WAIT`].
fn wait_secs<G>(get: &G, key: &str, default: Duration) -> anyhow::Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(get, key, default.as_secs())?;
    if secs > MAX_RETRY_WAIT.as_secs() {
        return Err(anyhow!(
            "Invalid {} '{}': must be at most {} seconds",
            key,
            secs,
            MAX_RETRY_WAIT.as_secs()
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} '{}': {}", key, raw, e)),
    }
}
