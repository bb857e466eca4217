use crate::catalog::{self, INCOME_STATEMENT_ROWS};
use crate::classifier::{IncomeSection, RowClass, RowClassifier, RowPlacement};
use crate::config::ParserConfig;
use crate::grid::{CellGrid, CellValue};
use crate::matcher::contains_any;
use crate::ratios;
use crate::schema::{
    normalize_values, BalanceSheetCategory, BalanceSheetRow, CashFlowCategory, CashFlowRow,
    IncomeStatementRow, RatioRow, StatementKind,
};
use log::{debug, trace};

/// Rows extracted for one statement plus the sheet row of the last one, used
/// to anchor the next statement's scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<R> {
    pub rows: Vec<R>,
    pub last_row: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncomeExtraction {
    pub income: Vec<IncomeStatementRow>,
    pub ratios: Vec<RatioRow>,
    pub last_row: Option<usize>,
}

enum ScanStep {
    Skipped,
    Emitted,
    /// Emitted, and nothing more is expected from this statement.
    Complete,
}

pub struct StatementExtractor<'g> {
    grid: &'g dyn CellGrid,
    column_count: usize,
    /// Exclusive upper bound of the value columns read.
    max_col: usize,
    /// Exclusive upper bound of the rows scanned.
    row_limit: usize,
}

impl<'g> StatementExtractor<'g> {
    pub fn new(grid: &'g dyn CellGrid, column_count: usize, config: &ParserConfig) -> Self {
        let (row_limit, used_cols) = match grid.used_range() {
            Some((max_row, max_col)) => (
                (max_row + 1).min(config.max_scan_rows),
                (max_col + 1).min(config.max_scan_cols),
            ),
            None => (0, 0),
        };

        Self {
            grid,
            column_count,
            max_col: (column_count + 1).min(used_cols),
            row_limit,
        }
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Numeric series of a row, normalized to the column count.
    pub fn row_values(&self, row: usize) -> Vec<f64> {
        let raw: Vec<f64> = (1..self.max_col.max(1))
            .map(|col| cell_number(&self.grid.cell_at(row, col)))
            .collect();
        normalize_values(raw, self.column_count)
    }

    fn row_label(&self, row: usize) -> Option<String> {
        self.grid.cell_at(row, 0).as_text()
    }

    fn scan<F>(
        &self,
        start_row: usize,
        row_budget: usize,
        classifier: &mut RowClassifier,
        mut on_row: F,
    ) -> Option<usize>
    where
        F: FnMut(String, Vec<f64>, RowPlacement) -> ScanStep,
    {
        let end_row = start_row.saturating_add(row_budget).min(self.row_limit);
        let mut last_row = None;

        for row in start_row..end_row {
            let Some(label) = self.row_label(row) else {
                continue;
            };

            let values = self.row_values(row);
            let has_values = values.iter().any(|v| *v != 0.0);

            let placement = match classifier.classify(&label, has_values) {
                RowClass::SectionHeader => continue,
                RowClass::Boundary => {
                    debug!("Row {} '{}' ends the scan started at row {}", row, label, start_row);
                    break;
                }
                RowClass::Data(placement) => placement,
            };

            match on_row(label, values, placement) {
                ScanStep::Skipped => trace!("Row {} skipped", row),
                ScanStep::Emitted => last_row = Some(row),
                ScanStep::Complete => {
                    last_row = Some(row);
                    debug!("All expected rows found by row {}", row);
                    break;
                }
            }
        }

        last_row
    }

    /// First pass: the income statement and the ratio block that follows it.
    pub fn extract_income_and_ratios(&self, start_row: usize, row_budget: usize) -> IncomeExtraction {
        let mut income: Vec<IncomeStatementRow> = Vec::new();
        let mut ratio_rows: Vec<RatioRow> = Vec::new();
        let ratio_catalog_len = ratios::RATIO_FORMULAS.len();
        let mut classifier = RowClassifier::income_and_ratios();

        let last_row = self.scan(start_row, row_budget, &mut classifier, |label, values, placement| {
            let section = match placement {
                RowPlacement::Income(section) => section,
                _ => IncomeSection::Income,
            };

            let income_match = catalog::canonical_label(StatementKind::IncomeStatement, &label)
                .filter(|canonical| !income.iter().any(|row| row.label == *canonical));
            let ratio_match = ratios::canonical_ratio_label(&label);

            // Above the ratio block, a ratio catalog hit only counts when the
            // row spells out the whole ratio name ("Net profit" is not
            // "Net Profit Margin").
            let target = match (section, income_match, ratio_match) {
                (IncomeSection::Ratios, _, Some(canonical)) => (IncomeSection::Ratios, Some(canonical)),
                (_, Some(canonical), _) => (IncomeSection::Income, Some(canonical)),
                (IncomeSection::Income, None, Some(canonical)) if contains_any(&label, &[canonical]) => {
                    (IncomeSection::Ratios, Some(canonical))
                }
                (section, None, _) => (section, None),
            };

            let has_values = values.iter().any(|v| *v != 0.0);
            if target.1.is_none() && !has_values {
                return ScanStep::Skipped;
            }

            match target {
                (IncomeSection::Income, canonical) => {
                    let label = canonical.map(str::to_string).unwrap_or(label);
                    let editable = !catalog::is_calculated_field(StatementKind::IncomeStatement, &label);
                    income.push(IncomeStatementRow {
                        label,
                        values,
                        editable,
                    });
                }
                (IncomeSection::Ratios, canonical) => {
                    let ratio_type = ratios::ratio_type_for_label(canonical.unwrap_or(label.as_str()));
                    ratio_rows.push(RatioRow {
                        label: canonical.map(str::to_string).unwrap_or(label),
                        values,
                        editable: canonical.is_none(),
                        ratio_type,
                    });
                }
            }

            if income.len() >= INCOME_STATEMENT_ROWS.len() && ratio_rows.len() >= ratio_catalog_len {
                ScanStep::Complete
            } else {
                ScanStep::Emitted
            }
        });

        debug!(
            "Income pass from row {}: {} income row(s), {} ratio row(s), last row {:?}",
            start_row,
            income.len(),
            ratio_rows.len(),
            last_row
        );

        IncomeExtraction {
            income,
            ratios: ratio_rows,
            last_row,
        }
    }

    pub fn extract_balance_sheet(&self, start_row: usize, row_budget: usize) -> Extraction<BalanceSheetRow> {
        let mut rows: Vec<BalanceSheetRow> = Vec::new();
        let mut classifier = RowClassifier::balance_sheet();

        let last_row = self.scan(start_row, row_budget, &mut classifier, |label, values, placement| {
            let (category, subcategory) = match placement {
                RowPlacement::BalanceSheet {
                    category,
                    subcategory,
                } => (category, subcategory),
                _ => (BalanceSheetCategory::Assets, None),
            };

            let taken: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
            let Some(label) = stabilized_label(StatementKind::BalanceSheet, label, &values, &taken)
            else {
                return ScanStep::Skipped;
            };

            let (category, subcategory) = match category_total(&label) {
                Some(total_category) => (total_category, None),
                None => (category, subcategory),
            };

            rows.push(BalanceSheetRow {
                editable: !catalog::is_calculated_field(StatementKind::BalanceSheet, &label),
                label,
                values,
                category,
                subcategory,
            });
            ScanStep::Emitted
        });

        debug!(
            "Balance sheet pass from row {}: {} row(s), last row {:?}",
            start_row,
            rows.len(),
            last_row
        );

        Extraction { rows, last_row }
    }

    pub fn extract_cash_flow(&self, start_row: usize, row_budget: usize) -> Extraction<CashFlowRow> {
        let mut rows: Vec<CashFlowRow> = Vec::new();
        let mut classifier = RowClassifier::cash_flow();

        let last_row = self.scan(start_row, row_budget, &mut classifier, |label, values, placement| {
            let category = match placement {
                RowPlacement::CashFlow(category) => category,
                _ => CashFlowCategory::Operating,
            };

            let taken: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
            let Some(label) = stabilized_label(StatementKind::CashFlow, label, &values, &taken) else {
                return ScanStep::Skipped;
            };

            rows.push(CashFlowRow {
                editable: !catalog::is_calculated_field(StatementKind::CashFlow, &label),
                label,
                values,
                category,
            });
            ScanStep::Emitted
        });

        debug!(
            "Cash flow pass from row {}: {} row(s), last row {:?}",
            start_row,
            rows.len(),
            last_row
        );

        Extraction { rows, last_row }
    }
}

/// Canonical label for a catalog row, the observed label for an unmatched row
/// with data, `None` for an unmatched row without data. A canonical label
/// already held by an earlier row (`taken`) counts as unmatched.
fn stabilized_label(
    kind: StatementKind,
    observed: String,
    values: &[f64],
    taken: &[&str],
) -> Option<String> {
    let canonical = catalog::canonical_label(kind, &observed)
        .filter(|canonical| !taken.contains(canonical));

    match canonical {
        Some(canonical) => Some(canonical.to_string()),
        None if values.iter().any(|v| *v != 0.0) => Some(observed),
        None => None,
    }
}

/// Category-level totals belong to no current/non-current bucket even when
/// they follow one on the sheet.
fn category_total(label: &str) -> Option<BalanceSheetCategory> {
    match label {
        catalog::TOTAL_ASSETS => Some(BalanceSheetCategory::Assets),
        catalog::TOTAL_LIABILITIES => Some(BalanceSheetCategory::Liabilities),
        catalog::TOTAL_EQUITY => Some(BalanceSheetCategory::Equity),
        _ => None,
    }
}

fn cell_number(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Number(_) | CellValue::Empty => 0.0,
        CellValue::Text(text) => parse_numeric_text(text),
    }
}

/// Parses spreadsheet-formatted numbers such as `1,234.5`, `(1,200)`, `£ 300`
/// or `12.5%`. Anything unparseable reads as 0.
pub fn parse_numeric_text(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, ',' | '$' | '£' | '€' | '%'))
        .collect();

    let (negative, digits) = match cleaned
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    match digits.parse::<f64>() {
        Ok(value) if value.is_finite() => {
            if negative {
                -value
            } else {
                value
            }
        }
        _ => 0.0,
    }
}
