//! Ratio formula catalog and the engine that evaluates it.
//!
//! Every formula reads the statements through [`FinancialDataContext`], whose
//! lookups use the same fuzzy label semantics as extraction. Expenses follow
//! the negative-expense convention, so formulas take absolute values where a
//! magnitude is meant. Division by zero yields 0 rather than a non-finite
//! value.

use crate::catalog::{
    ADMINISTRATIVE_EXPENSES, CASH_AND_EQUIVALENTS, COST_OF_SALES, EBITDA, FINANCE_COSTS,
    GROSS_PROFIT, INVENTORY, NET_CASH_FROM_OPERATING, OTHER_OPERATING_EXPENSES, PROFIT_BEFORE_TAX,
    PROFIT_FOR_THE_PERIOD, REVENUE, SALARIES_AND_WAGES, TOTAL_ASSETS, TOTAL_EQUITY,
    TOTAL_LIABILITIES, TRADE_RECEIVABLES,
};
use crate::error::{Result, StatementParseError};
use crate::matcher::{contains_any, find_matching_label, fuzzy_match};
use crate::schema::{
    BalanceSheetCategory, BalanceSheetRow, BalanceSheetSubcategory, CashFlowRow,
    IncomeStatementRow, RatioCategory, RatioRow, RatioType, StatementKind, StatementLine,
};
use log::{debug, warn};

pub type RatioFormula = fn(&FinancialDataContext<'_>, usize) -> Result<f64>;

pub struct RatioFormulaConfig {
    pub id: &'static str,
    pub label: &'static str,
    pub ratio_type: RatioType,
    pub category: RatioCategory,
    /// Statements the formula reads. When one of them was not extracted the
    /// formula is not evaluated and the previous value is kept.
    pub depends_on: &'static [StatementKind],
    pub formula: RatioFormula,
}

impl std::fmt::Debug for RatioFormulaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatioFormulaConfig")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("ratio_type", &self.ratio_type)
            .field("category", &self.category)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

/// Read-only view over the three statements for one recalculation pass.
#[derive(Debug, Clone, Copy)]
pub struct FinancialDataContext<'a> {
    pub income_statement: &'a [IncomeStatementRow],
    pub balance_sheet: &'a [BalanceSheetRow],
    pub cash_flow: &'a [CashFlowRow],
    pub column_count: usize,
}

impl<'a> FinancialDataContext<'a> {
    /// True when the statement has no rows to read from.
    pub fn is_missing(&self, kind: StatementKind) -> bool {
        match kind {
            StatementKind::IncomeStatement => self.income_statement.is_empty(),
            StatementKind::BalanceSheet => self.balance_sheet.is_empty(),
            StatementKind::CashFlow => self.cash_flow.is_empty(),
            StatementKind::Ratios => false,
        }
    }

    fn check_period(&self, period: usize) -> Result<()> {
        if period >= self.column_count {
            return Err(StatementParseError::PeriodOutOfRange {
                period,
                column_count: self.column_count,
            });
        }
        Ok(())
    }

    pub fn income_row(&self, label: &str) -> Option<&'a IncomeStatementRow> {
        self.income_statement
            .iter()
            .find(|row| fuzzy_match(&row.label, label))
    }

    pub fn income_value(&self, label: &str, period: usize) -> Result<f64> {
        self.check_period(period)?;
        Ok(self
            .income_row(label)
            .map(|row| row.value_at(period))
            .unwrap_or(0.0))
    }

    pub fn balance_value(
        &self,
        label: &str,
        category: Option<BalanceSheetCategory>,
        period: usize,
    ) -> Result<f64> {
        self.check_period(period)?;
        Ok(self
            .balance_sheet
            .iter()
            .filter(|row| category.map_or(true, |c| row.category == c))
            .find(|row| fuzzy_match(&row.label, label))
            .map(|row| row.value_at(period))
            .unwrap_or(0.0))
    }

    /// Like [`balance_value`](Self::balance_value) but restricted to one
    /// category and, when given, one subcategory.
    pub fn balance_row_value(
        &self,
        label: &str,
        category: BalanceSheetCategory,
        subcategory: Option<BalanceSheetSubcategory>,
        period: usize,
    ) -> Result<f64> {
        self.check_period(period)?;
        Ok(self
            .balance_sheet
            .iter()
            .filter(|row| row.category == category)
            .filter(|row| subcategory.is_none() || row.subcategory == subcategory)
            .find(|row| fuzzy_match(&row.label, label))
            .map(|row| row.value_at(period))
            .unwrap_or(0.0))
    }

    /// Explicit "total" row of the bucket if there is one, otherwise the sum of
    /// the bucket's other rows.
    pub fn balance_subcategory_total(
        &self,
        category: BalanceSheetCategory,
        subcategory: BalanceSheetSubcategory,
        period: usize,
    ) -> Result<f64> {
        self.check_period(period)?;
        let bucket: Vec<&BalanceSheetRow> = self
            .balance_sheet
            .iter()
            .filter(|row| row.category == category && row.subcategory == Some(subcategory))
            .collect();

        if let Some(total) = bucket.iter().find(|row| fuzzy_match(&row.label, "total")) {
            return Ok(total.value_at(period));
        }

        Ok(bucket
            .iter()
            .filter(|row| !fuzzy_match(&row.label, "total"))
            .map(|row| row.value_at(period))
            .sum())
    }

    /// Category-level total: the first row matching one of `total_labels`,
    /// otherwise the sum of every non-total row in the category.
    pub fn balance_category_total(
        &self,
        category: BalanceSheetCategory,
        total_labels: &[&str],
        period: usize,
    ) -> Result<f64> {
        self.check_period(period)?;
        let explicit = self
            .balance_sheet
            .iter()
            .filter(|row| row.category == category)
            .find(|row| total_labels.iter().any(|label| fuzzy_match(&row.label, label)));

        if let Some(row) = explicit {
            return Ok(row.value_at(period));
        }

        Ok(self
            .balance_sheet
            .iter()
            .filter(|row| row.category == category && !fuzzy_match(&row.label, "total"))
            .map(|row| row.value_at(period))
            .sum())
    }

    pub fn cash_flow_value(&self, label: &str, period: usize) -> Result<f64> {
        self.check_period(period)?;
        Ok(self
            .cash_flow
            .iter()
            .find(|row| fuzzy_match(&row.label, label))
            .map(|row| row.value_at(period))
            .unwrap_or(0.0))
    }
}

fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

fn percentage(numerator: f64, denominator: f64) -> f64 {
    safe_divide(numerator, denominator) * 100.0
}

fn net_profit(ctx: &FinancialDataContext<'_>, period: usize) -> Result<f64> {
    if ctx.income_row(PROFIT_FOR_THE_PERIOD).is_some() {
        ctx.income_value(PROFIT_FOR_THE_PERIOD, period)
    } else {
        ctx.income_value(PROFIT_BEFORE_TAX, period)
    }
}

fn total_equity(ctx: &FinancialDataContext<'_>, period: usize) -> Result<f64> {
    ctx.balance_category_total(
        BalanceSheetCategory::Equity,
        &[TOTAL_EQUITY, "Total Shareholders"],
        period,
    )
}

fn total_assets(ctx: &FinancialDataContext<'_>, period: usize) -> Result<f64> {
    ctx.balance_category_total(BalanceSheetCategory::Assets, &[TOTAL_ASSETS], period)
}

fn total_liabilities(ctx: &FinancialDataContext<'_>, period: usize) -> Result<f64> {
    ctx.balance_category_total(BalanceSheetCategory::Liabilities, &[TOTAL_LIABILITIES], period)
}

fn current_assets(ctx: &FinancialDataContext<'_>, period: usize) -> Result<f64> {
    ctx.balance_subcategory_total(
        BalanceSheetCategory::Assets,
        BalanceSheetSubcategory::Current,
        period,
    )
}

fn current_liabilities(ctx: &FinancialDataContext<'_>, period: usize) -> Result<f64> {
    ctx.balance_subcategory_total(
        BalanceSheetCategory::Liabilities,
        BalanceSheetSubcategory::Current,
        period,
    )
}

fn return_on_equity(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(percentage(net_profit(ctx, p)?, total_equity(ctx, p)?))
}

fn return_on_assets(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(percentage(net_profit(ctx, p)?, total_assets(ctx, p)?))
}

fn gross_margin(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(percentage(
        ctx.income_value(GROSS_PROFIT, p)?,
        ctx.income_value(REVENUE, p)?,
    ))
}

fn operating_margin(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(percentage(
        ctx.income_value(EBITDA, p)?,
        ctx.income_value(REVENUE, p)?,
    ))
}

fn net_margin(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(percentage(net_profit(ctx, p)?, ctx.income_value(REVENUE, p)?))
}

fn cost_to_income(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    let costs = ctx.income_value(ADMINISTRATIVE_EXPENSES, p)?.abs()
        + ctx.income_value(OTHER_OPERATING_EXPENSES, p)?.abs()
        + ctx.income_value(SALARIES_AND_WAGES, p)?.abs();
    Ok(percentage(costs, ctx.income_value(REVENUE, p)?))
}

fn current_ratio(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(safe_divide(
        current_assets(ctx, p)?,
        current_liabilities(ctx, p)?.abs(),
    ))
}

fn quick_ratio(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    let inventory = ctx.balance_row_value(
        INVENTORY,
        BalanceSheetCategory::Assets,
        Some(BalanceSheetSubcategory::Current),
        p,
    )?;
    Ok(safe_divide(
        current_assets(ctx, p)? - inventory,
        current_liabilities(ctx, p)?.abs(),
    ))
}

fn cash_ratio(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    let cash = ctx.balance_row_value(
        CASH_AND_EQUIVALENTS,
        BalanceSheetCategory::Assets,
        Some(BalanceSheetSubcategory::Current),
        p,
    )?;
    Ok(safe_divide(cash, current_liabilities(ctx, p)?.abs()))
}

fn operating_cash_flow_ratio(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(safe_divide(
        ctx.cash_flow_value(NET_CASH_FROM_OPERATING, p)?,
        current_liabilities(ctx, p)?.abs(),
    ))
}

fn debt_to_equity(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(safe_divide(
        total_liabilities(ctx, p)?.abs(),
        total_equity(ctx, p)?,
    ))
}

fn debt_ratio(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(safe_divide(
        total_liabilities(ctx, p)?.abs(),
        total_assets(ctx, p)?,
    ))
}

fn interest_coverage(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(safe_divide(
        ctx.income_value(EBITDA, p)?,
        ctx.income_value(FINANCE_COSTS, p)?.abs(),
    ))
}

fn equity_multiplier(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(safe_divide(total_assets(ctx, p)?, total_equity(ctx, p)?))
}

fn equity_investment_value(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    total_equity(ctx, p)
}

fn asset_turnover(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    Ok(safe_divide(
        ctx.income_value(REVENUE, p)?,
        total_assets(ctx, p)?,
    ))
}

fn inventory_turnover(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    let inventory = ctx.balance_value(INVENTORY, Some(BalanceSheetCategory::Assets), p)?;
    Ok(safe_divide(
        ctx.income_value(COST_OF_SALES, p)?.abs(),
        inventory,
    ))
}

fn receivable_days(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    let receivables =
        ctx.balance_value(TRADE_RECEIVABLES, Some(BalanceSheetCategory::Assets), p)?;
    Ok(safe_divide(receivables, ctx.income_value(REVENUE, p)?) * 365.0)
}

/// Period-over-period change in percent; 0 for the first period.
fn growth(current: f64, prior: f64) -> f64 {
    percentage(current - prior, prior.abs())
}

fn sales_growth(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    let current = ctx.income_value(REVENUE, p)?;
    if p == 0 {
        return Ok(0.0);
    }
    Ok(growth(current, ctx.income_value(REVENUE, p - 1)?))
}

fn profit_growth(ctx: &FinancialDataContext<'_>, p: usize) -> Result<f64> {
    let current = net_profit(ctx, p)?;
    if p == 0 {
        return Ok(0.0);
    }
    Ok(growth(current, net_profit(ctx, p - 1)?))
}

const INCOME_AND_BALANCE: &[StatementKind] =
    &[StatementKind::IncomeStatement, StatementKind::BalanceSheet];
const INCOME_ONLY: &[StatementKind] = &[StatementKind::IncomeStatement];
const BALANCE_ONLY: &[StatementKind] = &[StatementKind::BalanceSheet];
const BALANCE_AND_CASH_FLOW: &[StatementKind] =
    &[StatementKind::BalanceSheet, StatementKind::CashFlow];

pub static RATIO_FORMULAS: &[RatioFormulaConfig] = &[
    RatioFormulaConfig {
        id: "roe",
        label: "Return on Equity (ROE)",
        ratio_type: RatioType::Percentage,
        category: RatioCategory::Profitability,
        depends_on: INCOME_AND_BALANCE,
        formula: return_on_equity,
    },
    RatioFormulaConfig {
        id: "roa",
        label: "Return on Assets (ROA)",
        ratio_type: RatioType::Percentage,
        category: RatioCategory::Profitability,
        depends_on: INCOME_AND_BALANCE,
        formula: return_on_assets,
    },
    RatioFormulaConfig {
        id: "gross_margin",
        label: "Gross Profit Margin",
        ratio_type: RatioType::Percentage,
        category: RatioCategory::Profitability,
        depends_on: INCOME_ONLY,
        formula: gross_margin,
    },
    RatioFormulaConfig {
        id: "operating_margin",
        label: "Operating Margin",
        ratio_type: RatioType::Percentage,
        category: RatioCategory::Profitability,
        depends_on: INCOME_ONLY,
        formula: operating_margin,
    },
    RatioFormulaConfig {
        id: "net_margin",
        label: "Net Profit Margin",
        ratio_type: RatioType::Percentage,
        category: RatioCategory::Profitability,
        depends_on: INCOME_ONLY,
        formula: net_margin,
    },
    RatioFormulaConfig {
        id: "cost_to_income",
        label: "Cost to Income Ratio",
        ratio_type: RatioType::Percentage,
        category: RatioCategory::Profitability,
        depends_on: INCOME_ONLY,
        formula: cost_to_income,
    },
    RatioFormulaConfig {
        id: "current_ratio",
        label: "Current Ratio",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Liquidity,
        depends_on: BALANCE_ONLY,
        formula: current_ratio,
    },
    RatioFormulaConfig {
        id: "quick_ratio",
        label: "Quick Ratio",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Liquidity,
        depends_on: BALANCE_ONLY,
        formula: quick_ratio,
    },
    RatioFormulaConfig {
        id: "cash_ratio",
        label: "Cash Ratio",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Liquidity,
        depends_on: BALANCE_ONLY,
        formula: cash_ratio,
    },
    RatioFormulaConfig {
        id: "operating_cash_flow_ratio",
        label: "Operating Cash Flow Ratio",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Liquidity,
        depends_on: BALANCE_AND_CASH_FLOW,
        formula: operating_cash_flow_ratio,
    },
    RatioFormulaConfig {
        id: "debt_to_equity",
        label: "Debt to Equity Ratio",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Leverage,
        depends_on: BALANCE_ONLY,
        formula: debt_to_equity,
    },
    RatioFormulaConfig {
        id: "debt_ratio",
        label: "Debt Ratio",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Leverage,
        depends_on: BALANCE_ONLY,
        formula: debt_ratio,
    },
    RatioFormulaConfig {
        id: "interest_coverage",
        label: "Interest Coverage Ratio",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Leverage,
        depends_on: INCOME_ONLY,
        formula: interest_coverage,
    },
    RatioFormulaConfig {
        id: "equity_multiplier",
        label: "Equity Multiplier",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Leverage,
        depends_on: BALANCE_ONLY,
        formula: equity_multiplier,
    },
    RatioFormulaConfig {
        id: "equity_investment_value",
        label: "Equity Investment Value",
        ratio_type: RatioType::Currency,
        category: RatioCategory::Leverage,
        depends_on: BALANCE_ONLY,
        formula: equity_investment_value,
    },
    RatioFormulaConfig {
        id: "asset_turnover",
        label: "Asset Turnover",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Efficiency,
        depends_on: INCOME_AND_BALANCE,
        formula: asset_turnover,
    },
    RatioFormulaConfig {
        id: "inventory_turnover",
        label: "Inventory Turnover",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Efficiency,
        depends_on: INCOME_AND_BALANCE,
        formula: inventory_turnover,
    },
    RatioFormulaConfig {
        id: "receivable_days",
        label: "Receivable Days",
        ratio_type: RatioType::Ratio,
        category: RatioCategory::Efficiency,
        depends_on: INCOME_AND_BALANCE,
        formula: receivable_days,
    },
    RatioFormulaConfig {
        id: "sales_growth",
        label: "Sales Growth",
        ratio_type: RatioType::Percentage,
        category: RatioCategory::Growth,
        depends_on: INCOME_ONLY,
        formula: sales_growth,
    },
    RatioFormulaConfig {
        id: "profit_growth",
        label: "Net Profit Growth",
        ratio_type: RatioType::Percentage,
        category: RatioCategory::Growth,
        depends_on: INCOME_ONLY,
        formula: profit_growth,
    },
];

pub fn ratio_labels() -> Vec<&'static str> {
    RATIO_FORMULAS.iter().map(|f| f.label).collect()
}

pub fn canonical_ratio_label(observed: &str) -> Option<&'static str> {
    find_matching_label(observed, &ratio_labels())
}

/// Catalog entry with exactly this label.
pub fn formula_for_label(label: &str) -> Option<&'static RatioFormulaConfig> {
    RATIO_FORMULAS.iter().find(|f| f.label == label)
}

/// Catalog type for a catalog label; otherwise a guess from the wording.
pub fn ratio_type_for_label(label: &str) -> RatioType {
    if let Some(config) = formula_for_label(label) {
        return config.ratio_type;
    }

    if label.contains('%') || contains_any(label, &["margin", "growth", "return", "yield"]) {
        RatioType::Percentage
    } else if contains_any(label, &["value", "amount"]) {
        RatioType::Currency
    } else {
        RatioType::Ratio
    }
}

pub struct RatioEngine<'f> {
    formulas: &'f [RatioFormulaConfig],
    default_column_count: usize,
}

impl RatioEngine<'static> {
    pub fn new(default_column_count: usize) -> Self {
        Self::with_formulas(RATIO_FORMULAS, default_column_count)
    }
}

impl<'f> RatioEngine<'f> {
    pub fn with_formulas(formulas: &'f [RatioFormulaConfig], default_column_count: usize) -> Self {
        Self {
            formulas,
            default_column_count,
        }
    }

    pub fn recalculate(
        &self,
        income_statement: &[IncomeStatementRow],
        balance_sheet: &[BalanceSheetRow],
        cash_flow: &[CashFlowRow],
        existing_ratios: &[RatioRow],
    ) -> Vec<RatioRow> {
        let column_count = income_statement
            .first()
            .map(|row| row.values.len())
            .unwrap_or(self.default_column_count);

        let ctx = FinancialDataContext {
            income_statement,
            balance_sheet,
            cash_flow,
            column_count,
        };

        let mut ratios: Vec<RatioRow> = self
            .formulas
            .iter()
            .map(|config| {
                let previous = existing_ratios.iter().find(|r| r.label == config.label);
                let values = (0..column_count)
                    .map(|period| evaluate(config, &ctx, period, previous))
                    .collect();

                RatioRow {
                    label: config.label.to_string(),
                    values,
                    editable: false,
                    ratio_type: config.ratio_type,
                }
            })
            .collect();

        let custom: Vec<RatioRow> = existing_ratios
            .iter()
            .filter(|r| !self.formulas.iter().any(|f| f.label == r.label))
            .cloned()
            .collect();

        if !custom.is_empty() {
            debug!("Preserving {} ratio(s) outside the formula catalog", custom.len());
        }
        ratios.extend(custom);
        ratios
    }
}

fn evaluate(
    config: &RatioFormulaConfig,
    ctx: &FinancialDataContext<'_>,
    period: usize,
    previous: Option<&RatioRow>,
) -> f64 {
    let fallback = || {
        previous
            .and_then(|row| row.values.get(period).copied())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    };

    if let Some(missing) = config.depends_on.iter().find(|kind| ctx.is_missing(**kind)) {
        debug!(
            "Ratio '{}' skipped for period {}: no {} rows",
            config.id, period, missing
        );
        return fallback();
    }

    match (config.formula)(ctx, period) {
        Ok(value) if value.is_finite() => value,
        Ok(value) => {
            warn!(
                "Ratio '{}' produced non-finite value {} for period {}; using fallback",
                config.id, value, period
            );
            fallback()
        }
        Err(e) => {
            warn!(
                "Ratio '{}' failed for period {}: {}; using fallback",
                config.id, period, e
            );
            fallback()
        }
    }
}

pub fn recalculate_ratios(
    income_statement: &[IncomeStatementRow],
    balance_sheet: &[BalanceSheetRow],
    cash_flow: &[CashFlowRow],
    existing_ratios: &[RatioRow],
    default_column_count: usize,
) -> Vec<RatioRow> {
    RatioEngine::new(default_column_count).recalculate(
        income_statement,
        balance_sheet,
        cash_flow,
        existing_ratios,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn income(label: &str, values: &[f64]) -> IncomeStatementRow {
        IncomeStatementRow {
            label: label.to_string(),
            values: values.to_vec(),
            editable: true,
        }
    }

    fn balance(
        label: &str,
        category: BalanceSheetCategory,
        subcategory: Option<BalanceSheetSubcategory>,
        values: &[f64],
    ) -> BalanceSheetRow {
        BalanceSheetRow {
            label: label.to_string(),
            values: values.to_vec(),
            editable: true,
            category,
            subcategory,
        }
    }

    fn ratio<'a>(ratios: &'a [RatioRow], label: &str) -> &'a RatioRow {
        ratios
            .iter()
            .find(|r| r.label == label)
            .unwrap_or_else(|| panic!("ratio {} missing", label))
    }

    fn sample_balance_sheet() -> Vec<BalanceSheetRow> {
        use BalanceSheetCategory::*;
        use BalanceSheetSubcategory::*;
        vec![
            balance("Property, Plant and Equipment", Assets, Some(NonCurrent), &[400.0]),
            balance("Inventory", Assets, Some(Current), &[40.0]),
            balance("Trade Receivables", Assets, Some(Current), &[100.0]),
            balance("Cash and Cash Equivalents", Assets, Some(Current), &[60.0]),
            balance("Total Assets", Assets, None, &[600.0]),
            balance("Trade Payables", Liabilities, Some(Current), &[-100.0]),
            balance("Long-Term Borrowings", Liabilities, Some(NonCurrent), &[-100.0]),
            balance("Total Liabilities", Liabilities, None, &[-200.0]),
            balance("Share Capital", Equity, None, &[300.0]),
            balance("Retained Earnings", Equity, None, &[100.0]),
        ]
    }

    #[test]
    fn test_subcategory_total_sums_when_no_total_row() {
        let sheet = vec![
            balance(
                "Inventory",
                BalanceSheetCategory::Assets,
                Some(BalanceSheetSubcategory::Current),
                &[100.0],
            ),
            balance(
                "Cash",
                BalanceSheetCategory::Assets,
                Some(BalanceSheetSubcategory::Current),
                &[50.0],
            ),
        ];
        let ctx = FinancialDataContext {
            income_statement: &[],
            balance_sheet: &sheet,
            cash_flow: &[],
            column_count: 1,
        };

        let total = ctx
            .balance_subcategory_total(
                BalanceSheetCategory::Assets,
                BalanceSheetSubcategory::Current,
                0,
            )
            .unwrap();
        assert_eq!(total, 150.0);
    }

    #[test]
    fn test_subcategory_total_prefers_explicit_total_row() {
        let sheet = vec![
            balance(
                "Inventory",
                BalanceSheetCategory::Assets,
                Some(BalanceSheetSubcategory::Current),
                &[100.0],
            ),
            balance(
                "Total Current Assets",
                BalanceSheetCategory::Assets,
                Some(BalanceSheetSubcategory::Current),
                &[175.0],
            ),
        ];
        let ctx = FinancialDataContext {
            income_statement: &[],
            balance_sheet: &sheet,
            cash_flow: &[],
            column_count: 1,
        };

        let total = ctx
            .balance_subcategory_total(
                BalanceSheetCategory::Assets,
                BalanceSheetSubcategory::Current,
                0,
            )
            .unwrap();
        assert_eq!(total, 175.0);
    }

    #[test]
    fn test_lookups_reject_out_of_range_periods() {
        let rows = vec![income("Revenue", &[1.0])];
        let ctx = FinancialDataContext {
            income_statement: &rows,
            balance_sheet: &[],
            cash_flow: &[],
            column_count: 1,
        };
        assert!(matches!(
            ctx.income_value("Revenue", 3),
            Err(StatementParseError::PeriodOutOfRange { period: 3, .. })
        ));
    }

    #[test]
    fn test_sales_growth_first_period_is_zero() {
        let rows = vec![income("Revenue", &[1000.0, 1200.0])];
        let ratios = recalculate_ratios(&rows, &[], &[], &[], 2);

        let growth = ratio(&ratios, "Sales Growth");
        assert_eq!(growth.values[0], 0.0);
        assert!((growth.values[1] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_denominators_yield_zero() {
        let rows = vec![income("Revenue", &[0.0]), income("Gross Profit", &[50.0])];
        let ratios = recalculate_ratios(&rows, &[], &[], &[], 1);

        for row in &ratios {
            assert!(row.values.iter().all(|v| v.is_finite()), "{} not finite", row.label);
        }
        assert_eq!(ratio(&ratios, "Gross Profit Margin").values, vec![0.0]);
        assert_eq!(ratio(&ratios, "Current Ratio").values, vec![0.0]);
        assert_eq!(ratio(&ratios, "Debt to Equity Ratio").values, vec![0.0]);
    }

    #[test]
    fn test_representative_ratios() {
        let income_rows = vec![
            income("Revenue", &[1000.0]),
            income("Cost of Sales", &[-400.0]),
            income("Gross Profit", &[600.0]),
            income("Administrative Expenses", &[-50.0]),
            income("Other Operating Expenses", &[-30.0]),
            income("Salaries and Wages", &[-70.0]),
            income("EBITDA", &[450.0]),
            income("Finance Costs", &[-45.0]),
            income("Profit Before Tax", &[100.0]),
            income("Profit for the Period", &[80.0]),
        ];
        let sheet = sample_balance_sheet();
        let ratios = recalculate_ratios(&income_rows, &sheet, &[], &[], 1);

        let value = |label: &str| ratio(&ratios, label).values[0];

        assert!((value("Return on Equity (ROE)") - 20.0).abs() < 1e-9);
        assert!((value("Return on Assets (ROA)") - 80.0 / 600.0 * 100.0).abs() < 1e-9);
        assert!((value("Gross Profit Margin") - 60.0).abs() < 1e-9);
        assert!((value("Operating Margin") - 45.0).abs() < 1e-9);
        assert!((value("Net Profit Margin") - 8.0).abs() < 1e-9);
        assert!((value("Cost to Income Ratio") - 15.0).abs() < 1e-9);
        assert!((value("Current Ratio") - 2.0).abs() < 1e-9);
        assert!((value("Quick Ratio") - 1.6).abs() < 1e-9);
        assert!((value("Cash Ratio") - 0.6).abs() < 1e-9);
        assert!((value("Debt to Equity Ratio") - 0.5).abs() < 1e-9);
        assert!((value("Interest Coverage Ratio") - 10.0).abs() < 1e-9);
        assert!((value("Equity Multiplier") - 1.5).abs() < 1e-9);
        assert_eq!(value("Equity Investment Value"), 400.0);
        assert!((value("Inventory Turnover") - 10.0).abs() < 1e-9);
        assert!((value("Receivable Days") - 36.5).abs() < 1e-9);

        let roe = ratio(&ratios, "Return on Equity (ROE)");
        assert_eq!(roe.ratio_type, RatioType::Percentage);
        assert!(!roe.editable);
    }

    #[test]
    fn test_net_profit_falls_back_to_profit_before_tax() {
        let income_rows = vec![
            income("Revenue", &[500.0]),
            income("Profit Before Tax", &[50.0]),
        ];
        let ratios = recalculate_ratios(&income_rows, &[], &[], &[], 1);
        assert!((ratio(&ratios, "Net Profit Margin").values[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_ratios_preserved() {
        let custom = RatioRow {
            label: "Revenue per Employee".to_string(),
            values: vec![12.5, 13.0],
            editable: true,
            ratio_type: RatioType::Currency,
        };
        let rows = vec![income("Revenue", &[1.0, 2.0])];
        let ratios = recalculate_ratios(&rows, &[], &[], &[custom.clone()], 2);

        assert_eq!(ratios.len(), RATIO_FORMULAS.len() + 1);
        assert_eq!(ratios.last(), Some(&custom));
    }

    fn failing_formula(_: &FinancialDataContext<'_>, _: usize) -> Result<f64> {
        Err(StatementParseError::RatioComputation("boom".to_string()))
    }

    fn infinite_formula(_: &FinancialDataContext<'_>, _: usize) -> Result<f64> {
        Ok(f64::INFINITY)
    }

    #[test]
    fn test_formula_failures_fall_back_to_previous_values() {
        let formulas = [
            RatioFormulaConfig {
                id: "fails",
                label: "Fails",
                ratio_type: RatioType::Ratio,
                category: RatioCategory::Liquidity,
                depends_on: &[],
                formula: failing_formula,
            },
            RatioFormulaConfig {
                id: "infinite",
                label: "Infinite",
                ratio_type: RatioType::Ratio,
                category: RatioCategory::Liquidity,
                depends_on: &[],
                formula: infinite_formula,
            },
        ];
        let previous = vec![RatioRow {
            label: "Fails".to_string(),
            values: vec![1.5],
            editable: false,
            ratio_type: RatioType::Ratio,
        }];

        let engine = RatioEngine::with_formulas(&formulas, 2);
        let ratios = engine.recalculate(&[], &[], &[], &previous);

        assert_eq!(ratios.len(), 2);
        assert_eq!(ratios[0].values, vec![1.5, 0.0]);
        assert_eq!(ratios[1].values, vec![0.0, 0.0]);
    }

    #[test]
    fn test_formulas_without_their_statements_keep_previous_values() {
        let rows = vec![income("Revenue", &[100.0, 120.0])];
        let previous = vec![RatioRow {
            label: "Current Ratio".to_string(),
            values: vec![1.8, 1.9],
            editable: false,
            ratio_type: RatioType::Ratio,
        }];
        let ratios = recalculate_ratios(&rows, &[], &[], &previous, 2);

        assert_eq!(ratio(&ratios, "Current Ratio").values, vec![1.8, 1.9]);
        assert_eq!(ratio(&ratios, "Operating Cash Flow Ratio").values, vec![0.0, 0.0]);
        assert_eq!(ratio(&ratios, "Sales Growth").values, vec![0.0, 20.0]);
    }

    #[test]
    fn test_operating_cash_flow_ratio() {
        use crate::schema::CashFlowCategory;

        let cash_flow = vec![CashFlowRow {
            label: "Net Cash from Operating Activities".to_string(),
            values: vec![150.0],
            editable: false,
            category: CashFlowCategory::Operating,
        }];
        let ratios = recalculate_ratios(&[], &sample_balance_sheet(), &cash_flow, &[], 1);
        assert!((ratio(&ratios, "Operating Cash Flow Ratio").values[0] - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_catalog_label_recognition() {
        assert_eq!(canonical_ratio_label("ROE"), Some("Return on Equity (ROE)"));
        assert_eq!(canonical_ratio_label("ROA %"), Some("Return on Assets (ROA)"));
        assert_eq!(canonical_ratio_label("Debt ratio"), Some("Debt Ratio"));
        assert_eq!(canonical_ratio_label("Revenue"), None);
        assert_eq!(
            formula_for_label("Quick Ratio").map(|f| f.category),
            Some(RatioCategory::Liquidity)
        );
        assert!(formula_for_label("Quick ratio").is_none());
    }

    #[test]
    fn test_ratio_type_guess() {
        assert_eq!(ratio_type_for_label("Current Ratio"), RatioType::Ratio);
        assert_eq!(ratio_type_for_label("EBITDA margin %"), RatioType::Percentage);
        assert_eq!(ratio_type_for_label("Enterprise value"), RatioType::Currency);
        assert_eq!(ratio_type_for_label("Headcount"), RatioType::Ratio);
    }
}
