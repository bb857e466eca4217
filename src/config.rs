use crate::error::{Result, StatementParseError};
use serde::{Deserialize, Serialize};

/// Scan budgets and tolerances for a parse.
///
/// Every field has a default, so a JSON document only needs the values it
/// overrides (e.g. `{"statement_gap": 0}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// How many rows from the top are searched for the period header row.
    pub header_scan_rows: usize,
    /// Minimum period-looking cells for a row to qualify as the header.
    pub min_period_matches: usize,
    /// Column count used when no header row is found, and the count the
    /// detected header is truncated to.
    pub expected_periods: usize,
    /// Header row index assumed when no header row is found.
    pub fallback_header_row: usize,
    pub max_scan_rows: usize,
    pub max_scan_cols: usize,
    pub income_row_budget: usize,
    pub balance_sheet_row_budget: usize,
    pub cash_flow_row_budget: usize,
    /// Rows skipped after the previous statement's last extracted row before
    /// the next statement's scan begins.
    pub statement_gap: usize,
    /// Missing catalog rows tolerated per statement before a warning is raised.
    pub missing_row_slack: usize,
    pub consistency_tolerance: f64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            header_scan_rows: 5,
            min_period_matches: 3,
            expected_periods: 9,
            fallback_header_row: 2,
            max_scan_rows: 150,
            max_scan_cols: 15,
            income_row_budget: 60,
            balance_sheet_row_budget: 60,
            cash_flow_row_budget: 50,
            statement_gap: 1,
            missing_row_slack: 3,
            consistency_tolerance: 100.0,
        }
    }
}

impl ParserConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ParserConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.expected_periods == 0 {
            return Err(StatementParseError::InvalidConfig(
                "expected_periods must be at least 1".to_string(),
            ));
        }

        if self.min_period_matches == 0 {
            return Err(StatementParseError::InvalidConfig(
                "min_period_matches must be at least 1".to_string(),
            ));
        }

        if self.max_scan_cols < 2 {
            return Err(StatementParseError::InvalidConfig(format!(
                "max_scan_cols must leave room for a label and a value column (got {})",
                self.max_scan_cols
            )));
        }

        for (name, budget) in [
            ("max_scan_rows", self.max_scan_rows),
            ("income_row_budget", self.income_row_budget),
            ("balance_sheet_row_budget", self.balance_sheet_row_budget),
            ("cash_flow_row_budget", self.cash_flow_row_budget),
        ] {
            if budget == 0 {
                return Err(StatementParseError::InvalidConfig(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }

        if !self.consistency_tolerance.is_finite() || self.consistency_tolerance < 0.0 {
            return Err(StatementParseError::InvalidConfig(format!(
                "consistency_tolerance must be a non-negative number (got {})",
                self.consistency_tolerance
            )));
        }

        Ok(())
    }
}
