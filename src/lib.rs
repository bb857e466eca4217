//! # Financial Statement Parser
//!
//! Extracts the income statement, balance sheet and cash flow statement from a
//! human-authored spreadsheet, recomputes the derived income rows and a
//! catalog of financial ratios, and reports structural problems as warnings.
//!
//! ## Core Concepts
//!
//! - **Cell grid**: the engine reads sheets through the [`CellGrid`] trait; turning
//!   an uploaded file into a grid is the caller's job
//! - **Period header**: the first row near the top with enough period-like cells
//!   (`2021`, `FY22`, `2022/23`) fixes the column count for every statement
//! - **Positional anchoring**: statements are scanned in order, each starting just
//!   after the last row extracted for the previous one
//! - **Negative-expense convention**: expenses are stored as negatives, so derived
//!   rows are plain sums
//! - **Warnings over failure**: only an empty workbook or a sheet without a single
//!   non-zero value fails the parse
//!
//! ## Example
//!
//! ```rust,ignore
//! use financial_statement_parser::*;
//!
//! let grid = SheetGrid::from_rows(vec![
//!     vec![CellValue::from(""), "2021".into(), "2022".into(), "2023".into()],
//!     vec!["Revenue".into(), 1000.0.into(), 1100.0.into(), 1250.0.into()],
//!     vec!["Cost of sales".into(), (-400.0).into(), (-430.0).into(), (-500.0).into()],
//!     vec!["Gross profit".into(), CellValue::Empty, CellValue::Empty, CellValue::Empty],
//! ]);
//!
//! let outcome = parse_grid(&grid).unwrap();
//! assert_eq!(outcome.data.income_statement[2].values, vec![600.0, 670.0, 750.0]);
//! ```

pub mod calculated;
pub mod catalog;
pub mod classifier;
pub mod config;
pub mod edits;
pub mod error;
pub mod export;
pub mod extractor;
pub mod grid;
pub mod matcher;
pub mod periods;
pub mod ratios;
pub mod schema;
pub mod validator;

pub use calculated::{recalculate_income_statement, CalculatedFieldEngine};
pub use config::ParserConfig;
pub use edits::StatementEdit;
pub use error::{Result, StatementParseError};
pub use extractor::StatementExtractor;
pub use grid::{CellGrid, CellValue, SheetGrid, Workbook};
pub use matcher::{find_matching_label, fuzzy_match};
pub use periods::{detect_period_headers, PeriodHeaders};
pub use ratios::{recalculate_ratios, FinancialDataContext, RatioEngine, RatioFormulaConfig, RATIO_FORMULAS};
pub use schema::*;
pub use validator::{validate_balance_sheet_equation, validate_cash_flow_tie, ValidationResult};

use crate::matcher::contains_any;
use chrono::Utc;
use log::{debug, info};

/// Sheet names tried before falling back to the first non-empty sheet.
const STATEMENT_SHEET_NAMES: &[&str] = &[
    "financial statements",
    "financials",
    "statements",
    "income statement",
    "profit and loss",
    "balance sheet",
];

#[derive(Debug, Clone, Default)]
pub struct FinancialStatementParser {
    config: ParserConfig,
}

impl FinancialStatementParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_config_json(json: &str) -> Result<Self> {
        Ok(Self {
            config: ParserConfig::from_json_str(json)?,
        })
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn parse_workbook(
        &self,
        workbook: &Workbook,
        file_metadata: Option<UploadedFileMetadata>,
        progress: &mut dyn FnMut(&ParseProgress),
    ) -> Result<ParseOutcome> {
        report(progress, ParseStage::Reading, 10, "Reading workbook");

        let (sheet_name, grid) =
            select_sheet(workbook).ok_or(StatementParseError::NoParseableSheet {
                sheet_count: workbook.sheet_count(),
            })?;
        info!("Parsing sheet '{}'", sheet_name);

        let file_metadata = file_metadata.map(|mut metadata| {
            metadata.sheet_name.get_or_insert_with(|| sheet_name.to_string());
            metadata
        });

        self.parse_sheet(grid, file_metadata, progress)
    }

    pub fn parse_grid(
        &self,
        grid: &dyn CellGrid,
        file_metadata: Option<UploadedFileMetadata>,
        progress: &mut dyn FnMut(&ParseProgress),
    ) -> Result<ParseOutcome> {
        report(progress, ParseStage::Reading, 10, "Reading sheet");
        self.parse_sheet(grid, file_metadata, progress)
    }

    fn parse_sheet(
        &self,
        grid: &dyn CellGrid,
        file_metadata: Option<UploadedFileMetadata>,
        progress: &mut dyn FnMut(&ParseProgress),
    ) -> Result<ParseOutcome> {
        let config = &self.config;

        report(progress, ParseStage::Parsing, 30, "Detecting period headers");
        let headers = periods::detect_period_headers(grid, config);
        let column_count = headers.column_count();

        report(progress, ParseStage::Extracting, 50, "Extracting statements");
        let extractor = StatementExtractor::new(grid, column_count, config);

        let income_start = headers.header_row + 1;
        let income = extractor.extract_income_and_ratios(income_start, config.income_row_budget);

        let balance_start = next_statement_start(income.last_row, income_start, config.statement_gap);
        let balance_sheet =
            extractor.extract_balance_sheet(balance_start, config.balance_sheet_row_budget);

        let cash_flow_start =
            next_statement_start(balance_sheet.last_row, balance_start, config.statement_gap);
        let cash_flow = extractor.extract_cash_flow(cash_flow_start, config.cash_flow_row_budget);

        debug!(
            "Statement scans started at rows {}, {} and {}",
            income_start, balance_start, cash_flow_start
        );

        let income_statement = recalculate_income_statement(&income.income);
        let ratios = RatioEngine::new(column_count).recalculate(
            &income_statement,
            &balance_sheet.rows,
            &cash_flow.rows,
            &income.ratios,
        );

        let data = ParsedFinancialData {
            income_statement,
            balance_sheet: balance_sheet.rows,
            cash_flow: cash_flow.rows,
            ratios,
            column_headers: headers.labels.clone(),
            parsed_at: Utc::now(),
            file_metadata,
        };

        report(progress, ParseStage::Validating, 80, "Validating extracted data");
        let validation = self.validate(&data, &headers);

        if !validation.is_valid {
            return Err(StatementParseError::NoFinancialData {
                errors: validation.errors,
            });
        }

        info!(
            "Parsed {} income, {} balance sheet, {} cash flow and {} ratio row(s) over {} period(s) with {} warning(s)",
            data.income_statement.len(),
            data.balance_sheet.len(),
            data.cash_flow.len(),
            data.ratios.len(),
            column_count,
            validation.warnings.len()
        );
        report(progress, ParseStage::Complete, 100, "Parse complete");

        Ok(ParseOutcome { data, validation })
    }

    fn validate(&self, data: &ParsedFinancialData, headers: &PeriodHeaders) -> ParseValidation {
        let config = &self.config;
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let has_data = data.income_statement.iter().any(|r| r.has_non_zero())
            || data.balance_sheet.iter().any(|r| r.has_non_zero())
            || data.cash_flow.iter().any(|r| r.has_non_zero());
        if !has_data {
            errors.push(
                "No non-zero values were found in the income statement, balance sheet or cash flow"
                    .to_string(),
            );
        }

        for (kind, labels) in [
            (StatementKind::IncomeStatement, statement_labels(&data.income_statement)),
            (StatementKind::BalanceSheet, statement_labels(&data.balance_sheet)),
            (StatementKind::CashFlow, statement_labels(&data.cash_flow)),
        ] {
            let expected = catalog::expected_rows(kind);
            let missing = expected
                .iter()
                .filter(|canonical| !labels.iter().any(|label| label == *canonical))
                .count();

            if missing > config.missing_row_slack {
                warnings.push(format!(
                    "Missing {} of {} expected {} rows",
                    missing,
                    expected.len(),
                    kind
                ));
            }
        }

        if !headers.detected {
            warnings.push(format!(
                "No period header row found in the first {} rows; assumed periods {}",
                config.header_scan_rows,
                headers.labels.join(", ")
            ));
        } else if headers.found_count != config.expected_periods {
            warnings.push(format!(
                "Expected {} time periods, found {}",
                config.expected_periods, headers.found_count
            ));
        }

        if data.balance_sheet.is_empty() {
            warnings.push("No balance sheet rows were extracted".to_string());
        } else {
            let tolerance = config.consistency_tolerance;
            let equation =
                validate_balance_sheet_equation(&data.balance_sheet, &data.column_headers, tolerance);
            let cash_tie = validate_cash_flow_tie(
                &data.cash_flow,
                &data.balance_sheet,
                &data.column_headers,
                tolerance,
            );
            warnings.extend(equation.warnings);
            warnings.extend(cash_tie.warnings);
        }

        for warning in &warnings {
            debug!("Parse warning: {}", warning);
        }

        ParseValidation {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

fn statement_labels<R: StatementLine>(rows: &[R]) -> Vec<&str> {
    rows.iter().map(|r| r.label()).collect()
}

fn report(progress: &mut dyn FnMut(&ParseProgress), stage: ParseStage, percent: u8, message: &str) {
    progress(&ParseProgress {
        stage,
        progress: percent,
        message: message.to_string(),
    });
}

/// Where the next statement's scan begins. Without an extracted row to anchor
/// on, the next scan covers the same window as the previous one.
fn next_statement_start(last_row: Option<usize>, previous_start: usize, gap: usize) -> usize {
    match last_row {
        Some(row) => row + 1 + gap,
        None => previous_start,
    }
}

/// The first non-empty sheet named like a statement sheet, otherwise the first
/// non-empty sheet.
pub fn select_sheet(workbook: &Workbook) -> Option<(&str, &dyn CellGrid)> {
    let non_empty = || workbook.sheets().filter(|(_, grid)| grid.used_range().is_some());

    non_empty()
        .find(|(name, _)| is_statement_sheet_name(name))
        .or_else(|| non_empty().next())
}

/// The sheet name has to contain one of the known names; a short name such as
/// "P" is not a statement sheet just because "profit and loss" contains it.
fn is_statement_sheet_name(name: &str) -> bool {
    name.to_lowercase().contains("p&l") || contains_any(name, STATEMENT_SHEET_NAMES)
}

pub fn parse_workbook(
    workbook: &Workbook,
    file_metadata: Option<UploadedFileMetadata>,
) -> Result<ParseOutcome> {
    FinancialStatementParser::new().parse_workbook(workbook, file_metadata, &mut |_| {})
}

pub fn parse_grid(grid: &dyn CellGrid) -> Result<ParseOutcome> {
    FinancialStatementParser::new().parse_grid(grid, None, &mut |_| {})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement_grid() -> SheetGrid {
        let mut grid = SheetGrid::new();
        grid.set(0, 0, "ACME Ltd");
        for (col, year) in ["2021", "2022", "2023"].iter().enumerate() {
            grid.set(1, col + 1, *year);
        }
        grid.set(2, 0, "Revenue");
        grid.set(2, 1, 1000.0);
        grid.set(2, 2, 1200.0);
        grid.set(2, 3, 1500.0);
        grid.set(3, 0, "Cost of sales");
        grid.set(3, 1, -400.0);
        grid.set(3, 2, -500.0);
        grid.set(3, 3, -600.0);
        grid.set(4, 0, "Gross profit");
        grid
    }

    #[test]
    fn test_next_statement_start() {
        assert_eq!(next_statement_start(Some(10), 3, 1), 12);
        assert_eq!(next_statement_start(Some(10), 3, 0), 11);
        assert_eq!(next_statement_start(None, 3, 1), 3);
    }

    #[test]
    fn test_parse_grid_recalculates_gross_profit() {
        let outcome = parse_grid(&statement_grid()).unwrap();
        let data = outcome.data;

        assert_eq!(data.column_headers, vec!["2021", "2022", "2023"]);
        let gross = data
            .income_statement
            .iter()
            .find(|r| r.label == catalog::GROSS_PROFIT)
            .unwrap();
        assert_eq!(gross.values, vec![600.0, 700.0, 900.0]);
        assert!(!gross.editable);
        assert!(outcome.validation.is_valid);
        assert!(outcome
            .validation
            .warnings
            .iter()
            .any(|w| w == "Expected 9 time periods, found 3"));
    }

    #[test]
    fn test_progress_stages_in_order() {
        let mut stages = Vec::new();
        FinancialStatementParser::new()
            .parse_grid(&statement_grid(), None, &mut |p| stages.push(p.stage))
            .unwrap();

        assert_eq!(
            stages,
            vec![
                ParseStage::Reading,
                ParseStage::Parsing,
                ParseStage::Extracting,
                ParseStage::Validating,
                ParseStage::Complete,
            ]
        );
    }

    #[test]
    fn test_empty_workbook_is_an_error() {
        let err = parse_workbook(&Workbook::new(), None).unwrap_err();
        assert!(matches!(err, StatementParseError::NoParseableSheet { sheet_count: 0 }));

        let blank = Workbook::new().with_sheet("Sheet1", SheetGrid::new());
        let err = parse_workbook(&blank, None).unwrap_err();
        assert!(matches!(err, StatementParseError::NoParseableSheet { sheet_count: 1 }));
    }

    #[test]
    fn test_all_zero_sheet_is_an_error() {
        let mut grid = SheetGrid::new();
        grid.set(1, 1, "2021");
        grid.set(1, 2, "2022");
        grid.set(1, 3, "2023");
        grid.set(2, 0, "Revenue");
        grid.set(2, 1, 0.0);

        let err = parse_grid(&grid).unwrap_err();
        assert!(matches!(err, StatementParseError::NoFinancialData { .. }));
    }

    #[test]
    fn test_sheet_selection_prefers_statement_names() {
        let mut notes = SheetGrid::new();
        notes.set(0, 0, "Notes to the accounts");

        let workbook = Workbook::new()
            .with_sheet("Cover", notes)
            .with_sheet("Empty P&L", SheetGrid::new())
            .with_sheet("Financials", statement_grid());

        let (name, _) = select_sheet(&workbook).unwrap();
        assert_eq!(name, "Financials");

        let outcome = parse_workbook(
            &workbook,
            Some(UploadedFileMetadata {
                file_name: "acme.xlsx".to_string(),
                file_size: None,
                sheet_name: None,
            }),
        )
        .unwrap();
        assert_eq!(
            outcome.data.file_metadata.and_then(|m| m.sheet_name),
            Some("Financials".to_string())
        );
    }

    #[test]
    fn test_short_sheet_names_are_not_statement_names() {
        let workbook = Workbook::new()
            .with_sheet("P", statement_grid())
            .with_sheet("Simple", statement_grid())
            .with_sheet("P&L 2023", statement_grid());

        let (name, _) = select_sheet(&workbook).unwrap();
        assert_eq!(name, "P&L 2023");

        let workbook = Workbook::new()
            .with_sheet("S", statement_grid())
            .with_sheet("Group statements", statement_grid());
        let (name, _) = select_sheet(&workbook).unwrap();
        assert_eq!(name, "Group statements");
    }

    #[test]
    fn test_sheet_selection_falls_back_to_first_non_empty() {
        let workbook = Workbook::new()
            .with_sheet("Sheet1", SheetGrid::new())
            .with_sheet("Sheet2", statement_grid());

        let (name, _) = select_sheet(&workbook).unwrap();
        assert_eq!(name, "Sheet2");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ParserConfig {
            expected_periods: 0,
            ..ParserConfig::default()
        };
        assert!(matches!(
            FinancialStatementParser::with_config(config),
            Err(StatementParseError::InvalidConfig(_))
        ));
        assert!(FinancialStatementParser::from_config_json(r#"{"statement_gap": 0}"#).is_ok());
    }
}
