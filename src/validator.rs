use crate::matcher::{contains_any, normalize_label};
use crate::schema::{
    BalanceSheetCategory, BalanceSheetRow, BalanceSheetSubcategory, CashFlowRow, StatementLine,
};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub warnings: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            is_valid: true,
            warnings: Vec::new(),
        }
    }
}

impl ValidationResult {
    fn warn(&mut self, message: String) {
        debug!("{}", message);
        self.is_valid = false;
        self.warnings.push(message);
    }
}

pub struct ConsistencyValidator<'a> {
    headers: &'a [String],
    tolerance: f64,
}

impl<'a> ConsistencyValidator<'a> {
    pub fn new(headers: &'a [String], tolerance: f64) -> Self {
        Self { headers, tolerance }
    }

    fn period_label(&self, period: usize) -> String {
        self.headers
            .get(period)
            .cloned()
            .unwrap_or_else(|| format!("period {}", period + 1))
    }

    /// Checks assets = liabilities + equity on the statement's own total rows.
    pub fn check_balance_sheet(&self, balance_sheet: &[BalanceSheetRow]) -> ValidationResult {
        let mut result = ValidationResult::default();

        let assets = find_total(balance_sheet, BalanceSheetCategory::Assets, &["total assets"]);
        let liabilities = find_total(
            balance_sheet,
            BalanceSheetCategory::Liabilities,
            &["total liabilities"],
        );
        let equity = find_total(
            balance_sheet,
            BalanceSheetCategory::Equity,
            &["total equity", "total shareholders"],
        );

        let (Some(assets), Some(liabilities), Some(equity)) = (assets, liabilities, equity) else {
            result.warn(
                "Balance sheet is missing a total assets, total liabilities or total equity row; \
                 the balance sheet equation could not be checked"
                    .to_string(),
            );
            return result;
        };

        for period in 0..assets.values.len() {
            let lhs = assets.value_at(period);
            let rhs = liabilities.value_at(period) + equity.value_at(period);
            let difference = lhs - rhs;

            if difference.abs() > self.tolerance {
                result.warn(format!(
                    "Balance sheet does not balance for {}: total assets {:.2} vs liabilities plus equity {:.2} (difference {:.2})",
                    self.period_label(period),
                    lhs,
                    rhs,
                    difference
                ));
            }
        }

        result
    }

    /// Checks the cash flow closing balance against the balance sheet cash row.
    /// Skipped (and valid) when either row is absent.
    pub fn check_cash_tie(
        &self,
        cash_flow: &[CashFlowRow],
        balance_sheet: &[BalanceSheetRow],
    ) -> ValidationResult {
        let mut result = ValidationResult::default();

        let closing = cash_flow
            .iter()
            .find(|row| contains_any(&row.label, &["closing", "ending", "end of period"]));
        let cash = balance_sheet.iter().find(|row| is_balance_sheet_cash(row));

        let (Some(closing), Some(cash)) = (closing, cash) else {
            debug!("Cash tie skipped: closing cash or balance sheet cash row not found");
            return result;
        };

        for period in 0..closing.values.len() {
            let flow = closing.value_at(period);
            let position = cash.value_at(period);
            let difference = flow - position;

            if difference.abs() > self.tolerance {
                result.warn(format!(
                    "Closing cash for {} does not match the balance sheet: cash flow {:.2} vs balance sheet {:.2} (difference {:.2})",
                    self.period_label(period),
                    flow,
                    position,
                    difference
                ));
            }
        }

        result
    }
}

fn find_total<'r>(
    rows: &'r [BalanceSheetRow],
    category: BalanceSheetCategory,
    labels: &[&str],
) -> Option<&'r BalanceSheetRow> {
    rows.iter()
        .filter(|row| row.category == category)
        .find(|row| contains_any(&row.label, labels))
}

fn is_balance_sheet_cash(row: &BalanceSheetRow) -> bool {
    let current_cash = row.subcategory == Some(BalanceSheetSubcategory::Current)
        && contains_any(&row.label, &["cash"])
        && !contains_any(&row.label, &["equivalents"]);

    current_cash || normalize_label(&row.label) == "cashandcashequivalents"
}

pub fn validate_balance_sheet_equation(
    balance_sheet: &[BalanceSheetRow],
    headers: &[String],
    tolerance: f64,
) -> ValidationResult {
    ConsistencyValidator::new(headers, tolerance).check_balance_sheet(balance_sheet)
}

pub fn validate_cash_flow_tie(
    cash_flow: &[CashFlowRow],
    balance_sheet: &[BalanceSheetRow],
    headers: &[String],
    tolerance: f64,
) -> ValidationResult {
    ConsistencyValidator::new(headers, tolerance).check_cash_tie(cash_flow, balance_sheet)
}
