//! Structural fingerprint of a record.
//!
//! Two records share a fingerprint exactly when every persisted field is
//! equal: identifier type and value, derived symbol, and each expected
//! metric (null included). Store identity and insertion time are not part
//! of it, so a snapshot repeated across runs collides while an updated
//! value for the same company does not.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::reconcile::ReconciledRecord;

/// SHA-256 over the record projected onto `fields`, hex encoded.
///
/// Metrics not listed in `fields` are ignored; listed metrics that are
/// missing hash the same as explicit nulls.
pub fn record_fingerprint(record: &ReconciledRecord, fields: &[&str]) -> String {
    let mut hasher = Sha256::new();

    hasher.update(record.identifier.kind.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(record.identifier.value.as_bytes());
    hasher.update(b"|");
    hasher.update(record.derived_symbol.as_bytes());

    for field in fields {
        hasher.update(b"|");
        hasher.update(field.as_bytes());
        hasher.update(b"=");
        match record.metrics.get(*field) {
            Some(Some(value)) => hasher.update(normalize_decimal(*value).as_bytes()),
            // distinct from any number
            _ => hasher.update(b"~"),
        }
    }

    hex::encode(hasher.finalize())
}

/// Trailing zeros removed so 1.50 and 1.5 hash alike.
fn normalize_decimal(d: Decimal) -> String {
    d.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratiofeed_provider::{Identifier, Metrics};
    use rust_decimal_macros::dec;

    const FIELDS: &[&str] = &["CUR_RATIO", "QUICK_RATIO"];

    fn record(id: Identifier, cur: Option<Decimal>, quick: Option<Decimal>) -> ReconciledRecord {
        let mut metrics = Metrics::new();
        metrics.insert("CUR_RATIO".to_string(), cur);
        metrics.insert("QUICK_RATIO".to_string(), quick);
        ReconciledRecord::new(0, id, metrics, None)
    }

    #[test]
    fn test_equal_records_share_fingerprint() {
        let a = record(Identifier::ticker("AAPL US Equity"), Some(dec!(0.87)), None);
        let mut b = record(Identifier::ticker("AAPL US Equity"), Some(dec!(0.870)), None);
        b.position = 7;
        assert_eq!(record_fingerprint(&a, FIELDS), record_fingerprint(&b, FIELDS));
    }

    #[test]
    fn test_updated_value_changes_fingerprint() {
        let a = record(Identifier::ticker("AAPL US Equity"), Some(dec!(0.87)), None);
        let b = record(Identifier::ticker("AAPL US Equity"), Some(dec!(0.88)), None);
        assert_ne!(record_fingerprint(&a, FIELDS), record_fingerprint(&b, FIELDS));
    }

    #[test]
    fn test_null_differs_from_zero() {
        let a = record(Identifier::ticker("AAPL US Equity"), Some(dec!(1)), None);
        let b = record(Identifier::ticker("AAPL US Equity"), Some(dec!(1)), Some(dec!(0)));
        assert_ne!(record_fingerprint(&a, FIELDS), record_fingerprint(&b, FIELDS));
    }

    #[test]
    fn test_identifier_type_is_significant() {
        let a = record(Identifier::ticker("US0378331005"), Some(dec!(1)), None);
        let b = record(Identifier::isin("US0378331005"), Some(dec!(1)), None);
        assert_ne!(record_fingerprint(&a, FIELDS), record_fingerprint(&b, FIELDS));
    }

    #[test]
    fn test_unlisted_metrics_are_ignored() {
        let a = record(Identifier::ticker("AAPL US Equity"), Some(dec!(1)), None);
        let mut b = a.clone();
        b.metrics.insert("EXTRA".to_string(), Some(dec!(9)));
        assert_eq!(record_fingerprint(&a, FIELDS), record_fingerprint(&b, FIELDS));
    }
}
