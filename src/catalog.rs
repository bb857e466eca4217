//! Canonical row labels expected in each statement.
//!
//! Order matters: the matcher returns the first entry that fuzzy-matches, so a
//! short entry that is a substring of a longer observed label must come after
//! any entry that should win for that label (e.g. "Income Tax" precedes
//! "Profit Before Tax" so that a bare "Tax" row is read as the tax charge).

use crate::matcher::{find_matching_label, normalize_label};
use crate::schema::StatementKind;

pub const REVENUE: &str = "Revenue";
pub const COST_OF_SALES: &str = "Cost of Sales";
pub const GROSS_PROFIT: &str = "Gross Profit";
pub const ADMINISTRATIVE_EXPENSES: &str = "Administrative Expenses";
pub const OTHER_OPERATING_EXPENSES: &str = "Other Operating Expenses";
pub const SALARIES_AND_WAGES: &str = "Salaries and Wages";
pub const EBITDA: &str = "EBITDA";
pub const DEPRECIATION_AND_AMORTISATION: &str = "Depreciation and Amortisation";
pub const INTEREST_INCOME: &str = "Interest Income";
pub const FINANCE_COSTS: &str = "Finance Costs";
pub const INCOME_TAX: &str = "Income Tax";
pub const PROFIT_BEFORE_TAX: &str = "Profit Before Tax";
pub const PROFIT_FOR_THE_PERIOD: &str = "Profit for the Period";

pub const INCOME_STATEMENT_ROWS: &[&str] = &[
    REVENUE,
    COST_OF_SALES,
    GROSS_PROFIT,
    ADMINISTRATIVE_EXPENSES,
    OTHER_OPERATING_EXPENSES,
    SALARIES_AND_WAGES,
    EBITDA,
    DEPRECIATION_AND_AMORTISATION,
    INTEREST_INCOME,
    FINANCE_COSTS,
    INCOME_TAX,
    PROFIT_BEFORE_TAX,
    PROFIT_FOR_THE_PERIOD,
];

/// Whole-label synonyms, compared after normalization and ahead of the fuzzy
/// catalog. A bare "Sales" would otherwise fuzzy-match "Cost of Sales".
pub const INCOME_STATEMENT_ALIASES: &[(&str, &str)] = &[
    ("Sales", REVENUE),
    ("Net sales", REVENUE),
    ("Turnover", REVENUE),
    ("Net profit", PROFIT_FOR_THE_PERIOD),
    ("Net income", PROFIT_FOR_THE_PERIOD),
    ("Profit after tax", PROFIT_FOR_THE_PERIOD),
];

pub const INCOME_CALCULATED_ROWS: &[&str] = &[GROSS_PROFIT, EBITDA, PROFIT_BEFORE_TAX];

pub const PROPERTY_PLANT_EQUIPMENT: &str = "Property, Plant and Equipment";
pub const INTANGIBLE_ASSETS: &str = "Intangible Assets";
pub const INVESTMENTS: &str = "Investments";
pub const TOTAL_NON_CURRENT_ASSETS: &str = "Total Non-Current Assets";
pub const INVENTORY: &str = "Inventory";
pub const TRADE_RECEIVABLES: &str = "Trade Receivables";
pub const OTHER_RECEIVABLES: &str = "Other Receivables";
pub const CASH_AND_EQUIVALENTS: &str = "Cash and Cash Equivalents";
pub const TOTAL_CURRENT_ASSETS: &str = "Total Current Assets";
pub const TOTAL_ASSETS: &str = "Total Assets";
pub const TRADE_PAYABLES: &str = "Trade Payables";
pub const SHORT_TERM_BORROWINGS: &str = "Short-Term Borrowings";
pub const TOTAL_CURRENT_LIABILITIES: &str = "Total Current Liabilities";
pub const LONG_TERM_BORROWINGS: &str = "Long-Term Borrowings";
pub const TOTAL_NON_CURRENT_LIABILITIES: &str = "Total Non-Current Liabilities";
pub const TOTAL_LIABILITIES: &str = "Total Liabilities";
pub const SHARE_CAPITAL: &str = "Share Capital";
pub const RETAINED_EARNINGS: &str = "Retained Earnings";
pub const TOTAL_EQUITY: &str = "Total Equity";

pub const BALANCE_SHEET_ROWS: &[&str] = &[
    PROPERTY_PLANT_EQUIPMENT,
    INTANGIBLE_ASSETS,
    INVESTMENTS,
    TOTAL_NON_CURRENT_ASSETS,
    INVENTORY,
    TRADE_RECEIVABLES,
    OTHER_RECEIVABLES,
    CASH_AND_EQUIVALENTS,
    TOTAL_CURRENT_ASSETS,
    TOTAL_ASSETS,
    TRADE_PAYABLES,
    SHORT_TERM_BORROWINGS,
    TOTAL_CURRENT_LIABILITIES,
    LONG_TERM_BORROWINGS,
    TOTAL_NON_CURRENT_LIABILITIES,
    TOTAL_LIABILITIES,
    SHARE_CAPITAL,
    RETAINED_EARNINGS,
    TOTAL_EQUITY,
];

pub const BALANCE_SHEET_ALIASES: &[(&str, &str)] = &[
    ("Debtors", TRADE_RECEIVABLES),
    ("Creditors", TRADE_PAYABLES),
];

pub const BALANCE_SHEET_CALCULATED_ROWS: &[&str] = &[
    TOTAL_NON_CURRENT_ASSETS,
    TOTAL_CURRENT_ASSETS,
    TOTAL_ASSETS,
    TOTAL_CURRENT_LIABILITIES,
    TOTAL_NON_CURRENT_LIABILITIES,
    TOTAL_LIABILITIES,
    TOTAL_EQUITY,
];

pub const NET_CASH_FROM_OPERATING: &str = "Net Cash from Operating Activities";
pub const NET_CASH_FROM_INVESTING: &str = "Net Cash from Investing Activities";
pub const NET_CASH_FROM_FINANCING: &str = "Net Cash from Financing Activities";
pub const NET_INCREASE_IN_CASH: &str = "Net Increase in Cash";
pub const OPENING_CASH_BALANCE: &str = "Opening Cash Balance";
pub const CLOSING_CASH_BALANCE: &str = "Closing Cash Balance";

pub const CASH_FLOW_ROWS: &[&str] = &[
    "Cash Generated from Operations",
    "Changes in Working Capital",
    "Interest Paid",
    "Tax Paid",
    NET_CASH_FROM_OPERATING,
    "Purchase of Property, Plant and Equipment",
    "Proceeds from Disposals",
    NET_CASH_FROM_INVESTING,
    "Proceeds from Borrowings",
    "Repayment of Borrowings",
    "Dividends Paid",
    NET_CASH_FROM_FINANCING,
    NET_INCREASE_IN_CASH,
    OPENING_CASH_BALANCE,
    CLOSING_CASH_BALANCE,
];

pub const CASH_FLOW_CALCULATED_ROWS: &[&str] = &[
    NET_CASH_FROM_OPERATING,
    NET_CASH_FROM_INVESTING,
    NET_CASH_FROM_FINANCING,
    NET_INCREASE_IN_CASH,
    CLOSING_CASH_BALANCE,
];

pub fn expected_rows(kind: StatementKind) -> Vec<&'static str> {
    match kind {
        StatementKind::IncomeStatement => INCOME_STATEMENT_ROWS.to_vec(),
        StatementKind::BalanceSheet => BALANCE_SHEET_ROWS.to_vec(),
        StatementKind::CashFlow => CASH_FLOW_ROWS.to_vec(),
        StatementKind::Ratios => crate::ratios::ratio_labels(),
    }
}

fn aliases(kind: StatementKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        StatementKind::IncomeStatement => INCOME_STATEMENT_ALIASES,
        StatementKind::BalanceSheet => BALANCE_SHEET_ALIASES,
        StatementKind::CashFlow | StatementKind::Ratios => &[],
    }
}

pub fn canonical_label(kind: StatementKind, observed: &str) -> Option<&'static str> {
    let normalized = normalize_label(observed);
    aliases(kind)
        .iter()
        .find(|(alias, _)| normalize_label(alias) == normalized)
        .map(|(_, canonical)| *canonical)
        .or_else(|| find_matching_label(observed, &expected_rows(kind)))
}

pub fn is_calculated_field(kind: StatementKind, label: &str) -> bool {
    let calculated: &[&str] = match kind {
        StatementKind::IncomeStatement => INCOME_CALCULATED_ROWS,
        StatementKind::BalanceSheet => BALANCE_SHEET_CALCULATED_ROWS,
        StatementKind::CashFlow => CASH_FLOW_CALCULATED_ROWS,
        StatementKind::Ratios => return true,
    };

    let label = normalize_label(label);
    calculated.iter().any(|c| normalize_label(c) == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_labels_follow_catalog_order() {
        assert_eq!(
            canonical_label(StatementKind::IncomeStatement, "Sales revenue"),
            Some(REVENUE)
        );
        assert_eq!(
            canonical_label(StatementKind::IncomeStatement, "Tax"),
            Some(INCOME_TAX)
        );
        assert_eq!(
            canonical_label(StatementKind::IncomeStatement, "Profit before taxation"),
            Some(PROFIT_BEFORE_TAX)
        );
        assert_eq!(
            canonical_label(StatementKind::BalanceSheet, "Cash"),
            Some(CASH_AND_EQUIVALENTS)
        );
        assert_eq!(
            canonical_label(StatementKind::BalanceSheet, "Total current assets"),
            Some(TOTAL_CURRENT_ASSETS)
        );
        assert_eq!(canonical_label(StatementKind::CashFlow, "Goodwill"), None);
    }

    #[test]
    fn test_aliases_win_over_fuzzy_matches() {
        assert_eq!(canonical_label(StatementKind::IncomeStatement, "Sales"), Some(REVENUE));
        assert_eq!(canonical_label(StatementKind::IncomeStatement, "TURNOVER"), Some(REVENUE));
        assert_eq!(
            canonical_label(StatementKind::IncomeStatement, "Cost of sales"),
            Some(COST_OF_SALES)
        );
        assert_eq!(
            canonical_label(StatementKind::IncomeStatement, "Net profit"),
            Some(PROFIT_FOR_THE_PERIOD)
        );
        assert_eq!(
            canonical_label(StatementKind::BalanceSheet, "Debtors"),
            Some(TRADE_RECEIVABLES)
        );
        // aliases are whole-label only
        assert_eq!(canonical_label(StatementKind::CashFlow, "Sales"), None);
    }

    #[test]
    fn test_calculated_fields() {
        assert!(is_calculated_field(StatementKind::IncomeStatement, "Gross Profit"));
        assert!(is_calculated_field(StatementKind::IncomeStatement, "ebitda"));
        assert!(!is_calculated_field(StatementKind::IncomeStatement, "Revenue"));
        assert!(is_calculated_field(StatementKind::BalanceSheet, "Total Assets"));
        assert!(!is_calculated_field(StatementKind::BalanceSheet, "Inventory"));
        assert!(is_calculated_field(StatementKind::CashFlow, "Closing Cash Balance"));
    }
}
