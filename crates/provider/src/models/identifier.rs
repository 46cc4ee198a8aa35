use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

/// Kind of company identifier understood by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentifierType {
    /// Exchange ticker with market sector, e.g. `AAPL US Equity`.
    Ticker,
    Isin,
    Cusip,
    Sedol,
    /// FIGI, e.g. `BBG000B9XRY4`.
    BbGlobal,
}

impl IdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticker => "TICKER",
            Self::Isin => "ISIN",
            Self::Cusip => "CUSIP",
            Self::Sedol => "SEDOL",
            Self::BbGlobal => "BB_GLOBAL",
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TICKER" => Ok(Self::Ticker),
            "ISIN" => Ok(Self::Isin),
            "CUSIP" => Ok(Self::Cusip),
            "SEDOL" => Ok(Self::Sedol),
            "BB_GLOBAL" | "FIGI" => Ok(Self::BbGlobal),
            other => Err(format!("Unknown identifier type: {}", other)),
        }
    }
}

/// A typed reference to one company, as sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    #[serde(rename = "identifierType")]
    pub kind: IdentifierType,
    #[serde(rename = "identifierValue")]
    pub value: String,
}

impl Identifier {
    pub fn new(kind: IdentifierType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn ticker(value: impl Into<String>) -> Self {
        Self::new(IdentifierType::Ticker, value)
    }

    pub fn isin(value: impl Into<String>) -> Self {
        Self::new(IdentifierType::Isin, value)
    }

    /// Short symbol stored alongside the record.
    ///
    /// Tickers keep only their first whitespace-delimited token
    /// (`"AAPL US Equity"` -> `"AAPL"`); every other type is used verbatim.
    pub fn derived_symbol(&self) -> String {
        match self.kind {
            IdentifierType::Ticker => self
                .value
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string(),
            _ => self.value.clone(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Ordered universe of identifiers requested on every run.
///
/// Order matters: the provider answers positionally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierSet(Vec<Identifier>);

impl IdentifierSet {
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        Self(identifiers)
    }

    /// Loads the set from a JSON array of
    /// `{"identifierType": "...", "identifierValue": "..."}` objects.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Configuration(format!(
                "Cannot read identifiers file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ProviderError> {
        let identifiers: Vec<Identifier> = serde_json::from_str(raw)
            .map_err(|e| ProviderError::Configuration(format!("Invalid identifiers file: {}", e)))?;

        if let Some(blank) = identifiers.iter().find(|i| i.value.trim().is_empty()) {
            return Err(ProviderError::Configuration(format!(
                "Identifier of type {} has an empty value",
                blank.kind
            )));
        }

        Ok(Self(identifiers))
    }

    pub fn as_slice(&self) -> &[Identifier] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Identifier> {
        self.0.iter()
    }
}

impl From<Vec<Identifier>> for IdentifierSet {
    fn from(identifiers: Vec<Identifier>) -> Self {
        Self(identifiers)
    }
}
