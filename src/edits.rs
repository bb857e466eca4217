use crate::calculated::recalculate_income_statement;
use crate::error::{Result, StatementParseError};
use crate::matcher::fuzzy_match;
use crate::ratios::{RatioEngine, RATIO_FORMULAS};
use crate::schema::{
    normalize_values, ParsedFinancialData, RatioRow, RatioType, StatementKind, StatementLine,
};
use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A user correction applied on top of a parsed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StatementEdit {
    /// Overwrite one period of an editable row.
    SetValue {
        statement: StatementKind,
        #[schemars(description = "Row label as stored in the parsed data.")]
        label: String,
        #[schemars(description = "Zero-based period column.")]
        period: usize,
        value: f64,
    },

    /// Add (or replace) a manual ratio. Manual ratios survive recalculation.
    AddCustomRatio {
        label: String,
        ratio_type: RatioType,
        values: Vec<f64>,
    },

    RemoveRow {
        statement: StatementKind,
        label: String,
    },
}

impl ParsedFinancialData {
    /// Applies `edits` in order to a copy of this snapshot, then recomputes
    /// the calculated income rows and every catalog ratio. Ratios that fail
    /// to evaluate keep this snapshot's value.
    pub fn apply_edits(&self, edits: &[StatementEdit]) -> Result<ParsedFinancialData> {
        let mut data = self.clone();
        let column_count = data.column_count();

        for edit in edits {
            apply_single_edit(&mut data, edit, column_count)?;
        }

        data.income_statement = recalculate_income_statement(&data.income_statement);
        data.ratios = RatioEngine::new(column_count).recalculate(
            &data.income_statement,
            &data.balance_sheet,
            &data.cash_flow,
            &data.ratios,
        );

        info!("Applied {} edit(s) and recalculated", edits.len());
        Ok(data)
    }
}

fn apply_single_edit(
    data: &mut ParsedFinancialData,
    edit: &StatementEdit,
    column_count: usize,
) -> Result<()> {
    match edit {
        StatementEdit::SetValue {
            statement,
            label,
            period,
            value,
        } => {
            if *period >= column_count {
                return Err(StatementParseError::PeriodOutOfRange {
                    period: *period,
                    column_count,
                });
            }

            let row: &mut dyn StatementLine = match statement {
                StatementKind::IncomeStatement => find_row_mut(&mut data.income_statement, label),
                StatementKind::BalanceSheet => find_row_mut(&mut data.balance_sheet, label),
                StatementKind::CashFlow => find_row_mut(&mut data.cash_flow, label),
                StatementKind::Ratios => find_row_mut(&mut data.ratios, label),
            }
            .ok_or_else(|| row_not_found(*statement, label))?;

            if !row.is_editable() {
                return Err(StatementParseError::RowNotEditable(row.label().to_string()));
            }

            let values = row.values_mut();
            if values.len() < column_count {
                values.resize(column_count, 0.0);
            }
            values[*period] = *value;
        }

        StatementEdit::AddCustomRatio {
            label,
            ratio_type,
            values,
        } => {
            if RATIO_FORMULAS.iter().any(|f| f.label == label.as_str()) {
                return Err(StatementParseError::RowNotEditable(label.clone()));
            }

            let row = RatioRow {
                label: label.clone(),
                values: normalize_values(values.clone(), column_count),
                editable: true,
                ratio_type: *ratio_type,
            };

            match data.ratios.iter_mut().find(|r| r.label == *label) {
                Some(existing) => *existing = row,
                None => data.ratios.push(row),
            }
        }

        StatementEdit::RemoveRow { statement, label } => {
            let removed = match statement {
                StatementKind::IncomeStatement => remove_row(&mut data.income_statement, label),
                StatementKind::BalanceSheet => remove_row(&mut data.balance_sheet, label),
                StatementKind::CashFlow => remove_row(&mut data.cash_flow, label),
                StatementKind::Ratios => remove_row(&mut data.ratios, label),
            };

            if !removed {
                return Err(row_not_found(*statement, label));
            }
        }
    }

    Ok(())
}

fn row_not_found(statement: StatementKind, label: &str) -> StatementParseError {
    StatementParseError::RowNotFound {
        statement: statement.to_string(),
        label: label.to_string(),
    }
}

/// Exact label first, then the first fuzzy match.
fn row_index<R: StatementLine>(rows: &[R], label: &str) -> Option<usize> {
    rows.iter()
        .position(|row| row.label() == label)
        .or_else(|| rows.iter().position(|row| fuzzy_match(row.label(), label)))
}

fn find_row_mut<'r, R: StatementLine + 'r>(
    rows: &'r mut [R],
    label: &str,
) -> Option<&'r mut dyn StatementLine> {
    let index = row_index(rows, label)?;
    Some(&mut rows[index])
}

fn remove_row<R: StatementLine>(rows: &mut Vec<R>, label: &str) -> bool {
    match row_index(rows, label) {
        Some(index) => {
            rows.remove(index);
            true
        }
        None => false,
    }
}
