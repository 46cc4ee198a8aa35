//! Raw provider rows and response decoding.
//!
//! The provider answers with one JSON object per requested identifier, in
//! request order, without echoing the identifier back. Field placement is
//! not stable across endpoints, so values are searched at the top level and
//! then inside the usual container objects.

use std::collections::BTreeMap;
use std::str::FromStr;

use log::warn;
use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ProviderError;

/// Metric name -> value (`None` when the provider returned null or nothing).
pub type Metrics = BTreeMap<String, Option<Decimal>>;

/// Scale of persisted metric values (`DECIMAL(18,6)`).
pub const METRIC_SCALE: u32 = 6;

const NESTED_CONTAINERS: &[&str] = &["fields", "data", "values", "results"];
const ERROR_CODE_KEYS: &[&str] = &["errorCode", "error_code"];
const ROW_ARRAY_KEYS: &[&str] = &["data", "rows", "results"];

/// One provider answer, identified only by its position in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProviderRow {
    pub position: usize,
    pub metrics: Metrics,
    pub error_code: Option<i64>,
}

impl RawProviderRow {
    pub fn new(position: usize, metrics: Metrics, error_code: Option<i64>) -> Self {
        Self {
            position,
            metrics,
            error_code,
        }
    }

    /// Decodes one row, extracting exactly the requested `fields`.
    pub fn from_json(
        provider: &str,
        position: usize,
        row: &Value,
        fields: &[&str],
    ) -> Result<Self, ProviderError> {
        let object = row.as_object().ok_or_else(|| ProviderError::InvalidResponse {
            provider: provider.to_string(),
            message: format!("Row {} is not an object", position),
        })?;

        let metrics = fields
            .iter()
            .map(|field| {
                let value = lookup_field(object, field).and_then(|v| parse_metric(field, v));
                (field.to_string(), value)
            })
            .collect();

        let error_code = ERROR_CODE_KEYS
            .iter()
            .find_map(|key| find_key(object, key))
            .and_then(parse_error_code);

        Ok(Self::new(position, metrics, error_code))
    }
}

/// Decodes a full response body into positional rows.
///
/// Accepts a bare array or an object wrapping the array under `data`,
/// `rows` or `results`.
pub fn parse_rows(
    provider: &str,
    body: &Value,
    fields: &[&str],
) -> Result<Vec<RawProviderRow>, ProviderError> {
    let rows = match body {
        Value::Array(rows) => rows,
        Value::Object(object) => ROW_ARRAY_KEYS
            .iter()
            .find_map(|key| find_key(object, key).and_then(Value::as_array))
            .ok_or_else(|| ProviderError::InvalidResponse {
                provider: provider.to_string(),
                message: "Response object has no row array".to_string(),
            })?,
        _ => {
            return Err(ProviderError::InvalidResponse {
                provider: provider.to_string(),
                message: "Response is neither an array nor an object".to_string(),
            })
        }
    };

    rows.iter()
        .enumerate()
        .map(|(position, row)| RawProviderRow::from_json(provider, position, row, fields))
        .collect()
}

/// Normalizes a metric to the persisted scale.
pub fn normalize_metric(value: Decimal) -> Decimal {
    value.round_dp(METRIC_SCALE).normalize()
}

fn lookup_field<'a>(object: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    if let Some(value) = find_key(object, field) {
        return Some(value);
    }
    NESTED_CONTAINERS.iter().find_map(|container| {
        find_key(object, container)
            .and_then(Value::as_object)
            .and_then(|nested| find_key(nested, field))
    })
}

/// Exact key match first, then case-insensitive.
fn find_key<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    object.get(key).or_else(|| {
        object
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Finite numbers beyond the decimal range saturate; they never become null.
fn parse_metric(field: &str, value: &Value) -> Option<Decimal> {
    let parsed = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => n.as_f64().and_then(|f| saturating_decimal(field, f)),
        },
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .and_then(|f| saturating_decimal(field, f))
                })
        }
        _ => None,
    };
    parsed.map(normalize_metric)
}

fn saturating_decimal(field: &str, raw: f64) -> Option<Decimal> {
    if !raw.is_finite() {
        return None;
    }
    Decimal::from_f64(raw).or_else(|| {
        let clamped = if raw.abs() < 1.0 {
            Decimal::ZERO
        } else if raw.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        };
        warn!(
            "{} = {} is outside the decimal range, clamped to {}",
            field, raw, clamped
        );
        Some(clamped)
    })
}

fn parse_error_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
