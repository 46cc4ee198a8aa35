use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Metrics requested by the `basic` field set.
pub const BASIC_FIELDS: &[&str] = &[
    "TOT_DEBT_TO_TOT_ASSET",
    "CASH_DVD_COVERAGE",
    "TOT_DEBT_TO_EBITDA",
    "CUR_RATIO",
    "QUICK_RATIO",
    "GROSS_MARGIN",
    "INTEREST_COVERAGE_RATIO",
    "EBITDA_MARGIN",
    "TOT_LIAB_AND_EQY",
    "NET_DEBT_TO_SHRHLDR_EQTY",
];

/// Metrics requested by the `advanced` field set.
pub const ADVANCED_FIELDS: &[&str] = &[
    "BS_CURR_RENTAL_EXPENSE",
    "OTHER_NONOP_INCOME_LOSS",
    "NONOP_INCOME_LOSS",
    "IS_SGA_EXPENSE",
    "IS_SALES_AND_SERVICES_REVENUES",
    "IS_COG_AND_SERVICES_SOLD",
    "IS_RESEARCH_AND_DEVELOPMENT",
    "IS_DEPRECIATION_AND_AMORTIZATION",
    "SALES_REV_TURN",
    "IS_OPERATING_EXPN",
    "IS_OPER_INC",
    "IS_INT_EXPENSE",
    "IS_INC_TAX_EXP",
    "NET_INCOME",
    "IS_EPS",
    "IS_DILUTED_EPS",
    "PRETAX_INC",
    "EBIT",
    "EBITDA",
    "EQY_DPS",
    "OPER_MARGIN",
    "GROSS_MARGIN",
    "EBITDA_MARGIN",
    "PROF_MARGIN",
    "GROSS_PROFIT",
    "SALES_GROWTH",
    "CUR_RATIO",
    "QUICK_RATIO",
    "TOT_DEBT_TO_COM_EQY",
    "WORKING_CAPITAL",
    "CF_FREE_CASH_FLOW",
    "NET_INC_GROWTH",
];

/// Named group of metrics requested together; each maps to its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSet {
    Basic,
    Advanced,
}

impl FieldSet {
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Basic => BASIC_FIELDS,
            Self::Advanced => ADVANCED_FIELDS,
        }
    }

    /// Logical table the field set is persisted into.
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Basic => "FINANCIAL_RATIOS",
            Self::Advanced => "FINANCIAL_DATA_ADVANCED",
        }
    }

    /// Data-source label recorded in the execution log.
    pub fn data_source(&self) -> &'static str {
        match self {
            Self::Basic => "BLOOMBERG_BASIC",
            Self::Advanced => "BLOOMBERG_ADVANCED",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            other => Err(format!("Unknown field set: {} (expected basic|advanced)", other)),
        }
    }
}
