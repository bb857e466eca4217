use crate::catalog::{
    ADMINISTRATIVE_EXPENSES, COST_OF_SALES, DEPRECIATION_AND_AMORTISATION, EBITDA, FINANCE_COSTS,
    GROSS_PROFIT, INTEREST_INCOME, OTHER_OPERATING_EXPENSES, PROFIT_BEFORE_TAX, REVENUE,
    SALARIES_AND_WAGES,
};
use crate::matcher::fuzzy_match;
use crate::schema::{IncomeStatementRow, StatementLine};
use log::debug;

/// A derived income statement row: the per-period sum of its components.
///
/// Expenses are stored as negatives, so every formula is a plain sum.
#[derive(Debug, Clone, Copy)]
pub struct CalculatedField {
    pub label: &'static str,
    pub components: &'static [&'static str],
}

/// Evaluated top to bottom; later fields read the results of earlier ones.
pub static INCOME_CALCULATED_FIELDS: &[CalculatedField] = &[
    CalculatedField {
        label: GROSS_PROFIT,
        components: &[REVENUE, COST_OF_SALES],
    },
    CalculatedField {
        label: EBITDA,
        components: &[
            GROSS_PROFIT,
            ADMINISTRATIVE_EXPENSES,
            OTHER_OPERATING_EXPENSES,
            SALARIES_AND_WAGES,
        ],
    },
    CalculatedField {
        label: PROFIT_BEFORE_TAX,
        components: &[
            EBITDA,
            DEPRECIATION_AND_AMORTISATION,
            INTEREST_INCOME,
            FINANCE_COSTS,
        ],
    },
];

pub struct CalculatedFieldEngine<'f> {
    fields: &'f [CalculatedField],
}

impl Default for CalculatedFieldEngine<'static> {
    fn default() -> Self {
        Self::new(INCOME_CALCULATED_FIELDS)
    }
}

impl<'f> CalculatedFieldEngine<'f> {
    pub fn new(fields: &'f [CalculatedField]) -> Self {
        Self { fields }
    }

    /// Returns a copy of `rows` with every present calculated row overwritten.
    /// Calculated rows missing from the input are not added.
    pub fn recalculate(&self, rows: &[IncomeStatementRow]) -> Vec<IncomeStatementRow> {
        let mut updated = rows.to_vec();

        for field in self.fields {
            let Some(target) = updated
                .iter()
                .position(|row| fuzzy_match(&row.label, field.label))
            else {
                debug!("Calculated row '{}' not present; skipping", field.label);
                continue;
            };

            let column_count = updated[target].values.len();
            let values: Vec<f64> = (0..column_count)
                .map(|period| {
                    field
                        .components
                        .iter()
                        .map(|component| component_value(&updated, component, period))
                        .sum()
                })
                .collect();

            updated[target].values = values;
        }

        updated
    }
}

fn component_value(rows: &[IncomeStatementRow], component: &str, period: usize) -> f64 {
    rows.iter()
        .find(|row| fuzzy_match(&row.label, component))
        .map(|row| row.value_at(period))
        .unwrap_or(0.0)
}

pub fn recalculate_income_statement(rows: &[IncomeStatementRow]) -> Vec<IncomeStatementRow> {
    CalculatedFieldEngine::default().recalculate(rows)
}
