//! Immutable pipeline configuration.
//!
//! Thresholds and range bounds are handed to the validator at construction
//! time so tests can run the pipeline with any settings.

use ratiofeed_provider::RetryPolicy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Default minimum fraction of non-null metrics for a record to be accepted.
pub const DEFAULT_COMPLETENESS_THRESHOLD: f64 = 0.70;

/// Plausible bounds for one metric. Values outside are flagged, not rejected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeRule {
    pub metric: String,
    pub min: Decimal,
    pub max: Decimal,
}

impl RangeRule {
    pub fn new(metric: impl Into<String>, min: Decimal, max: Decimal) -> Self {
        Self {
            metric: metric.into(),
            min,
            max,
        }
    }

    pub fn contains(&self, value: Decimal) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Quality validator configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatorConfig {
    /// Inclusive lower bound on the non-null fraction of expected metrics.
    pub completeness_threshold: f64,
    /// Whitelist of metrics with known plausible ranges.
    pub range_rules: Vec<RangeRule>,
}

impl ValidatorConfig {
    pub fn with_threshold(threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) || threshold.is_nan() {
            return Err(Error::InvalidConfigValue(format!(
                "completeness threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        Ok(Self {
            completeness_threshold: threshold,
            ..Self::default()
        })
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        let liquidity = |metric: &str| RangeRule::new(metric, Decimal::ZERO, Decimal::from(100));
        let margin =
            |metric: &str| RangeRule::new(metric, Decimal::from(-200), Decimal::from(200));

        Self {
            completeness_threshold: DEFAULT_COMPLETENESS_THRESHOLD,
            range_rules: vec![
                liquidity("CUR_RATIO"),
                liquidity("QUICK_RATIO"),
                margin("GROSS_MARGIN"),
                margin("EBITDA_MARGIN"),
                margin("OPER_MARGIN"),
                margin("PROF_MARGIN"),
            ],
        }
    }
}

/// Everything the orchestrator needs besides its collaborators.
#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub validator: ValidatorConfig,
    pub retry: RetryPolicy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_validator_config() {
        let config = ValidatorConfig::default();
        assert_eq!(config.completeness_threshold, 0.70);
        let cur = config
            .range_rules
            .iter()
            .find(|r| r.metric == "CUR_RATIO")
            .unwrap();
        assert!(cur.contains(dec!(0)));
        assert!(cur.contains(dec!(100)));
        assert!(!cur.contains(dec!(100.01)));
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(ValidatorConfig::with_threshold(0.5).is_ok());
        assert!(ValidatorConfig::with_threshold(1.5).is_err());
        assert!(ValidatorConfig::with_threshold(f64::NAN).is_err());
    }
}
