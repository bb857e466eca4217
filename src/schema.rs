use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    IncomeStatement,
    BalanceSheet,
    CashFlow,
    Ratios,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::IncomeStatement => "income statement",
            StatementKind::BalanceSheet => "balance sheet",
            StatementKind::CashFlow => "cash flow statement",
            StatementKind::Ratios => "ratios",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BalanceSheetCategory {
    #[schemars(description = "Resources owned by the company (cash, receivables, inventory, equipment)")]
    Assets,
    #[schemars(description = "Obligations owed to creditors (payables, borrowings, provisions)")]
    Liabilities,
    #[schemars(description = "Owners' residual interest (share capital, retained earnings)")]
    Equity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub enum BalanceSheetSubcategory {
    #[serde(rename = "current")]
    Current,
    #[serde(rename = "non-current")]
    NonCurrent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowCategory {
    Operating,
    Investing,
    Financing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RatioType {
    #[schemars(description = "Plain quotient such as the current ratio (displayed as 1.25x)")]
    Ratio,
    #[schemars(description = "Quotient multiplied by 100 (displayed as 12.5%)")]
    Percentage,
    #[schemars(description = "Monetary amount passed through from a statement")]
    Currency,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RatioCategory {
    Profitability,
    Liquidity,
    Leverage,
    Efficiency,
    Growth,
}

/// Common read access to every kind of statement row.
pub trait StatementLine {
    fn label(&self) -> &str;
    fn values(&self) -> &[f64];
    fn values_mut(&mut self) -> &mut Vec<f64>;
    fn is_editable(&self) -> bool;

    fn value_at(&self, period: usize) -> f64 {
        self.values().get(period).copied().unwrap_or(0.0)
    }

    fn has_non_zero(&self) -> bool {
        self.values().iter().any(|v| *v != 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeStatementRow {
    #[schemars(description = "Canonical catalog label when the sheet label was recognised, otherwise the label as written")]
    pub label: String,
    #[schemars(description = "One value per period column. Expenses are negative.")]
    pub values: Vec<f64>,
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceSheetRow {
    pub label: String,
    pub values: Vec<f64>,
    pub editable: bool,
    pub category: BalanceSheetCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<BalanceSheetSubcategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CashFlowRow {
    pub label: String,
    pub values: Vec<f64>,
    pub editable: bool,
    pub category: CashFlowCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RatioRow {
    pub label: String,
    pub values: Vec<f64>,
    #[schemars(description = "False for ratios produced by the ratio engine, true for manual ratios")]
    pub editable: bool,
    #[serde(rename = "type")]
    pub ratio_type: RatioType,
}

macro_rules! impl_statement_line {
    ($($row:ty),*) => {
        $(
            impl StatementLine for $row {
                fn label(&self) -> &str {
                    &self.label
                }

                fn values(&self) -> &[f64] {
                    &self.values
                }

                fn values_mut(&mut self) -> &mut Vec<f64> {
                    &mut self.values
                }

                fn is_editable(&self) -> bool {
                    self.editable
                }
            }
        )*
    };
}

impl_statement_line!(IncomeStatementRow, BalanceSheetRow, CashFlowRow, RatioRow);

/// Pads with zeros or truncates so the series has exactly `column_count` entries.
pub fn normalize_values(mut values: Vec<f64>, column_count: usize) -> Vec<f64> {
    values.resize(column_count, 0.0);
    values
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct UploadedFileMetadata {
    pub file_name: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    #[schemars(description = "Name of the worksheet the statements were read from")]
    pub sheet_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ParsedFinancialData {
    pub income_statement: Vec<IncomeStatementRow>,
    pub balance_sheet: Vec<BalanceSheetRow>,
    pub cash_flow: Vec<CashFlowRow>,
    pub ratios: Vec<RatioRow>,
    #[schemars(description = "Period labels, one per value column (e.g. '2021', 'FY2022', '2022/23')")]
    pub column_headers: Vec<String>,
    pub parsed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_metadata: Option<UploadedFileMetadata>,
}

impl ParsedFinancialData {
    pub fn column_count(&self) -> usize {
        self.column_headers.len()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ParsedFinancialData)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParseValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub data: ParsedFinancialData,
    pub validation: ParseValidation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ParseStage {
    Reading,
    Parsing,
    Extracting,
    Validating,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseProgress {
    pub stage: ParseStage,
    /// 0 to 100.
    pub progress: u8,
    pub message: String,
}
