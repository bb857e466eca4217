//! Row classification state machines.
//!
//! Section boundaries in uploaded sheets are free text ("Current assets",
//! "Cash flows from investing activities", "Key ratios"), so each statement
//! scan threads a [`RowClassifier`] through its rows. Only label-only rows can
//! change state; a row carrying numbers or the word "total" is always data.

use crate::matcher::{contains_any, normalize_label};
use crate::schema::{BalanceSheetCategory, BalanceSheetSubcategory, CashFlowCategory, StatementKind};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncomeSection {
    Income,
    Ratios,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPlacement {
    Income(IncomeSection),
    BalanceSheet {
        category: BalanceSheetCategory,
        subcategory: Option<BalanceSheetSubcategory>,
    },
    CashFlow(CashFlowCategory),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    /// Updated the classifier state; emits nothing.
    SectionHeader,
    /// Title of a statement this scan does not cover; the scan should stop.
    Boundary,
    Data(RowPlacement),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowClassifier {
    IncomeAndRatios {
        section: IncomeSection,
    },
    BalanceSheet {
        category: BalanceSheetCategory,
        subcategory: Option<BalanceSheetSubcategory>,
    },
    CashFlow {
        category: CashFlowCategory,
    },
}

const INCOME_TITLES: &[&str] = &[
    "income statement",
    "profit and loss",
    "profit or loss",
    "comprehensive income",
];
const RATIO_TITLES: &[&str] = &["key ratios", "financial ratios", "ratio analysis"];
const BALANCE_SHEET_TITLES: &[&str] = &["balance sheet", "statement of financial position"];
const CASH_FLOW_TITLES: &[&str] = &["cash flow statement", "statement of cash flows"];

const NON_CURRENT_ASSET_HEADERS: &[&str] = &[
    "non-current asset",
    "noncurrent asset",
    "fixed asset",
    "long-term asset",
];
const NON_CURRENT_LIABILITY_HEADERS: &[&str] = &[
    "non-current liabilit",
    "noncurrent liabilit",
    "long-term liabilit",
];
const EQUITY_HEADERS: &[&str] = &["equity", "shareholders", "stockholders", "capital and reserves"];

/// Recognises the title row of any of the statements.
pub fn statement_title(label: &str) -> Option<StatementKind> {
    let normalized = normalize_label(label);

    if contains_any(label, CASH_FLOW_TITLES) || normalized == "cashflow" || normalized == "cashflows"
    {
        Some(StatementKind::CashFlow)
    } else if contains_any(label, BALANCE_SHEET_TITLES) {
        Some(StatementKind::BalanceSheet)
    } else if contains_any(label, RATIO_TITLES) || normalized == "ratios" {
        Some(StatementKind::Ratios)
    } else if contains_any(label, INCOME_TITLES) || normalized == "pl" {
        Some(StatementKind::IncomeStatement)
    } else {
        None
    }
}

impl RowClassifier {
    pub fn income_and_ratios() -> Self {
        RowClassifier::IncomeAndRatios {
            section: IncomeSection::Income,
        }
    }

    pub fn balance_sheet() -> Self {
        RowClassifier::BalanceSheet {
            category: BalanceSheetCategory::Assets,
            subcategory: None,
        }
    }

    pub fn cash_flow() -> Self {
        RowClassifier::CashFlow {
            category: CashFlowCategory::Operating,
        }
    }

    pub fn placement(&self) -> RowPlacement {
        match *self {
            RowClassifier::IncomeAndRatios { section } => RowPlacement::Income(section),
            RowClassifier::BalanceSheet {
                category,
                subcategory,
            } => RowPlacement::BalanceSheet {
                category,
                subcategory,
            },
            RowClassifier::CashFlow { category } => RowPlacement::CashFlow(category),
        }
    }

    pub fn classify(&mut self, label: &str, has_values: bool) -> RowClass {
        if has_values || normalize_label(label).contains("total") {
            return RowClass::Data(self.placement());
        }

        if let Some(title) = statement_title(label) {
            return self.on_title(title, label);
        }

        let header_applied = match self {
            RowClassifier::IncomeAndRatios { .. } => false,
            RowClassifier::BalanceSheet {
                category,
                subcategory,
            } => match balance_sheet_header(label) {
                Some((new_category, new_subcategory)) => {
                    *category = new_category;
                    *subcategory = new_subcategory;
                    true
                }
                None => false,
            },
            RowClassifier::CashFlow { category } => match cash_flow_header(label) {
                Some(new_category) => {
                    *category = new_category;
                    true
                }
                None => false,
            },
        };

        if header_applied {
            debug!("Section header '{}' -> {:?}", label, self.placement());
            RowClass::SectionHeader
        } else {
            RowClass::Data(self.placement())
        }
    }

    fn on_title(&mut self, title: StatementKind, label: &str) -> RowClass {
        let class = match (&mut *self, title) {
            (RowClassifier::IncomeAndRatios { section }, StatementKind::IncomeStatement) => {
                *section = IncomeSection::Income;
                RowClass::SectionHeader
            }
            (RowClassifier::IncomeAndRatios { section }, StatementKind::Ratios) => {
                *section = IncomeSection::Ratios;
                RowClass::SectionHeader
            }
            (
                RowClassifier::BalanceSheet {
                    category,
                    subcategory,
                },
                StatementKind::BalanceSheet,
            ) => {
                *category = BalanceSheetCategory::Assets;
                *subcategory = None;
                RowClass::SectionHeader
            }
            (RowClassifier::CashFlow { .. }, StatementKind::CashFlow) => RowClass::SectionHeader,
            _ => RowClass::Boundary,
        };

        debug!("Statement title '{}' -> {:?}", label, class);
        class
    }
}

fn balance_sheet_header(
    label: &str,
) -> Option<(BalanceSheetCategory, Option<BalanceSheetSubcategory>)> {
    let normalized = normalize_label(label);

    if contains_any(label, NON_CURRENT_ASSET_HEADERS) {
        Some((
            BalanceSheetCategory::Assets,
            Some(BalanceSheetSubcategory::NonCurrent),
        ))
    } else if contains_any(label, &["current asset"]) {
        Some((
            BalanceSheetCategory::Assets,
            Some(BalanceSheetSubcategory::Current),
        ))
    } else if contains_any(label, NON_CURRENT_LIABILITY_HEADERS) {
        Some((
            BalanceSheetCategory::Liabilities,
            Some(BalanceSheetSubcategory::NonCurrent),
        ))
    } else if contains_any(label, &["current liabilit"]) {
        Some((
            BalanceSheetCategory::Liabilities,
            Some(BalanceSheetSubcategory::Current),
        ))
    } else if contains_any(label, EQUITY_HEADERS) {
        Some((BalanceSheetCategory::Equity, None))
    } else if normalized == "liabilities" {
        Some((BalanceSheetCategory::Liabilities, None))
    } else if normalized == "assets" {
        Some((BalanceSheetCategory::Assets, None))
    } else {
        None
    }
}

fn cash_flow_header(label: &str) -> Option<CashFlowCategory> {
    if contains_any(label, &["operating"]) {
        Some(CashFlowCategory::Operating)
    } else if contains_any(label, &["investing"]) {
        Some(CashFlowCategory::Investing)
    } else if contains_any(label, &["financing"]) {
        Some(CashFlowCategory::Financing)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_sheet_state_transitions() {
        let mut classifier = RowClassifier::balance_sheet();

        assert_eq!(classifier.classify("Balance Sheet", false), RowClass::SectionHeader);
        assert_eq!(classifier.classify("Non-current assets", false), RowClass::SectionHeader);
        assert_eq!(
            classifier.classify("Property, plant and equipment", true),
            RowClass::Data(RowPlacement::BalanceSheet {
                category: BalanceSheetCategory::Assets,
                subcategory: Some(BalanceSheetSubcategory::NonCurrent),
            })
        );

        assert_eq!(classifier.classify("Current assets", false), RowClass::SectionHeader);
        assert_eq!(
            classifier.placement(),
            RowPlacement::BalanceSheet {
                category: BalanceSheetCategory::Assets,
                subcategory: Some(BalanceSheetSubcategory::Current),
            }
        );

        classifier.classify("Current liabilities", false);
        assert_eq!(
            classifier.placement(),
            RowPlacement::BalanceSheet {
                category: BalanceSheetCategory::Liabilities,
                subcategory: Some(BalanceSheetSubcategory::Current),
            }
        );

        classifier.classify("Shareholders' equity", false);
        assert_eq!(
            classifier.placement(),
            RowPlacement::BalanceSheet {
                category: BalanceSheetCategory::Equity,
                subcategory: None,
            }
        );
    }

    #[test]
    fn test_total_rows_never_change_state() {
        let mut classifier = RowClassifier::balance_sheet();
        classifier.classify("Current assets", false);

        let class = classifier.classify("Total current liabilities", false);
        assert_eq!(
            class,
            RowClass::Data(RowPlacement::BalanceSheet {
                category: BalanceSheetCategory::Assets,
                subcategory: Some(BalanceSheetSubcategory::Current),
            })
        );
    }

    #[test]
    fn test_rows_with_values_are_data() {
        let mut classifier = RowClassifier::cash_flow();
        classifier.classify("Cash flows from investing activities", false);

        let class = classifier.classify("Net cash from operating activities", true);
        assert_eq!(
            class,
            RowClass::Data(RowPlacement::CashFlow(CashFlowCategory::Investing))
        );
    }

    #[test]
    fn test_cash_flow_sections() {
        let mut classifier = RowClassifier::cash_flow();
        assert_eq!(classifier.classify("Cash Flow Statement", false), RowClass::SectionHeader);
        assert_eq!(classifier.placement(), RowPlacement::CashFlow(CashFlowCategory::Operating));

        classifier.classify("Financing activities", false);
        assert_eq!(classifier.placement(), RowPlacement::CashFlow(CashFlowCategory::Financing));
    }

    #[test]
    fn test_income_pass_sections_and_boundaries() {
        let mut classifier = RowClassifier::income_and_ratios();
        assert_eq!(classifier.classify("Profit and Loss", false), RowClass::SectionHeader);
        assert_eq!(classifier.placement(), RowPlacement::Income(IncomeSection::Income));

        assert_eq!(classifier.classify("Key Ratios", false), RowClass::SectionHeader);
        assert_eq!(classifier.placement(), RowPlacement::Income(IncomeSection::Ratios));

        assert_eq!(
            classifier.classify("Statement of Financial Position", false),
            RowClass::Boundary
        );
    }

    #[test]
    fn test_balance_sheet_scan_stops_at_cash_flow_title() {
        let mut classifier = RowClassifier::balance_sheet();
        assert_eq!(classifier.classify("Cash flow statement", false), RowClass::Boundary);
    }

    #[test]
    fn test_unrecognised_label_only_row_is_data() {
        let mut classifier = RowClassifier::balance_sheet();
        classifier.classify("Current liabilities", false);

        let class = classifier.classify("Deferred tax liabilities", false);
        assert_eq!(
            class,
            RowClass::Data(RowPlacement::BalanceSheet {
                category: BalanceSheetCategory::Liabilities,
                subcategory: Some(BalanceSheetSubcategory::Current),
            })
        );
    }
}
