use crate::ratios::formula_for_label;
use crate::schema::{
    BalanceSheetCategory, BalanceSheetSubcategory, CashFlowCategory, ParsedFinancialData,
    RatioCategory,
};

struct ExportLine<'a> {
    statement: &'static str,
    category: String,
    label: &'a str,
    values: &'a [f64],
}

fn balance_sheet_category(
    category: BalanceSheetCategory,
    subcategory: Option<BalanceSheetSubcategory>,
) -> String {
    let category = match category {
        BalanceSheetCategory::Assets => "Assets",
        BalanceSheetCategory::Liabilities => "Liabilities",
        BalanceSheetCategory::Equity => "Equity",
    };

    match subcategory {
        Some(BalanceSheetSubcategory::Current) => format!("Current {}", category),
        Some(BalanceSheetSubcategory::NonCurrent) => format!("Non-Current {}", category),
        None => category.to_string(),
    }
}

fn cash_flow_category(category: CashFlowCategory) -> String {
    match category {
        CashFlowCategory::Operating => "Operating",
        CashFlowCategory::Investing => "Investing",
        CashFlowCategory::Financing => "Financing",
    }
    .to_string()
}

/// Catalog ratios report their analysis category; manual ratios are "Custom".
fn ratio_category(label: &str) -> String {
    let Some(config) = formula_for_label(label) else {
        return "Custom".to_string();
    };

    match config.category {
        RatioCategory::Profitability => "Profitability",
        RatioCategory::Liquidity => "Liquidity",
        RatioCategory::Leverage => "Leverage",
        RatioCategory::Efficiency => "Efficiency",
        RatioCategory::Growth => "Growth",
    }
    .to_string()
}

/// Quotes a field when it contains a comma, quote or newline.
fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

impl ParsedFinancialData {
    fn export_lines(&self) -> Vec<ExportLine<'_>> {
        let income = self.income_statement.iter().map(|row| ExportLine {
            statement: "Income Statement",
            category: String::new(),
            label: &row.label,
            values: &row.values,
        });
        let balance = self.balance_sheet.iter().map(|row| ExportLine {
            statement: "Balance Sheet",
            category: balance_sheet_category(row.category, row.subcategory),
            label: &row.label,
            values: &row.values,
        });
        let cash_flow = self.cash_flow.iter().map(|row| ExportLine {
            statement: "Cash Flow",
            category: cash_flow_category(row.category),
            label: &row.label,
            values: &row.values,
        });
        let ratios = self.ratios.iter().map(|row| ExportLine {
            statement: "Ratios",
            category: ratio_category(&row.label),
            label: &row.label,
            values: &row.values,
        });

        income.chain(balance).chain(cash_flow).chain(ratios).collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// One line per row: `Statement,Category,Label,<one column per period>`.
    pub fn to_csv(&self) -> String {
        let mut output = String::from("Statement,Category,Label");
        for header in &self.column_headers {
            output.push(',');
            output.push_str(&csv_field(header));
        }
        output.push('\n');

        for line in self.export_lines() {
            output.push_str(&format!(
                "{},{},{}",
                line.statement,
                csv_field(&line.category),
                csv_field(line.label)
            ));
            for value in line.values {
                output.push_str(&format!(",{}", value));
            }
            output.push('\n');
        }

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        if let Some(metadata) = &self.file_metadata {
            output.push_str(&format!("# Financial Statements - {}\n\n", metadata.file_name));
        } else {
            output.push_str("# Financial Statements\n\n");
        }
        output.push_str(&format!(
            "**Parsed:** {}\n\n",
            self.parsed_at.format("%Y-%m-%d %H:%M UTC")
        ));

        let lines = self.export_lines();
        for statement in ["Income Statement", "Balance Sheet", "Cash Flow", "Ratios"] {
            output.push_str(&format!("## {}\n\n", statement));

            let rows: Vec<&ExportLine<'_>> =
                lines.iter().filter(|l| l.statement == statement).collect();
            if rows.is_empty() {
                output.push_str("_No rows extracted._\n\n");
                continue;
            }

            output.push_str("| Label |");
            for header in &self.column_headers {
                output.push_str(&format!(" {} |", header));
            }
            output.push_str("\n|---|");
            for _ in &self.column_headers {
                output.push_str("---:|");
            }
            output.push('\n');

            for row in rows {
                let label = if row.category.is_empty() {
                    row.label.to_string()
                } else {
                    format!("{} _({})_", row.label, row.category)
                };
                output.push_str(&format!("| {} |", label.replace('|', "\\|")));
                for value in row.values {
                    output.push_str(&format!(" {:.2} |", value));
                }
                output.push('\n');
            }
            output.push('\n');
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        BalanceSheetRow, IncomeStatementRow, RatioRow, RatioType, UploadedFileMetadata,
    };
    use chrono::Utc;

    fn sample() -> ParsedFinancialData {
        ParsedFinancialData {
            income_statement: vec![IncomeStatementRow {
                label: "Revenue".to_string(),
                values: vec![1000.0, 1250.5],
                editable: true,
            }],
            balance_sheet: vec![BalanceSheetRow {
                label: "Property, Plant and Equipment".to_string(),
                values: vec![400.0, 380.0],
                editable: true,
                category: BalanceSheetCategory::Assets,
                subcategory: Some(BalanceSheetSubcategory::NonCurrent),
            }],
            cash_flow: vec![],
            ratios: vec![
                RatioRow {
                    label: "Current Ratio".to_string(),
                    values: vec![1.5, 1.25],
                    editable: false,
                    ratio_type: RatioType::Ratio,
                },
                RatioRow {
                    label: "Headcount".to_string(),
                    values: vec![12.0, 14.0],
                    editable: true,
                    ratio_type: RatioType::Ratio,
                },
            ],
            column_headers: vec!["FY2022".to_string(), "FY2023".to_string()],
            parsed_at: Utc::now(),
            file_metadata: Some(UploadedFileMetadata {
                file_name: "acme.xlsx".to_string(),
                file_size: Some(2048),
                sheet_name: None,
            }),
        }
    }

    #[test]
    fn test_to_csv() {
        let csv = sample().to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Statement,Category,Label,FY2022,FY2023");
        assert_eq!(lines[1], "Income Statement,,Revenue,1000,1250.5");
        assert_eq!(
            lines[2],
            "Balance Sheet,Non-Current Assets,\"Property, Plant and Equipment\",400,380"
        );
        assert_eq!(lines[3], "Ratios,Liquidity,Current Ratio,1.5,1.25");
        assert_eq!(lines[4], "Ratios,Custom,Headcount,12,14");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_to_markdown() {
        let markdown = sample().to_markdown();

        assert!(markdown.contains("# Financial Statements - acme.xlsx"));
        assert!(markdown.contains("| Label | FY2022 | FY2023 |"));
        assert!(markdown.contains("| Revenue | 1000.00 | 1250.50 |"));
        assert!(markdown.contains("## Cash Flow\n\n_No rows extracted._"));
    }

    #[test]
    fn test_to_json_round_trips() {
        let data = sample();
        let json = data.to_json().unwrap();
        let back: ParsedFinancialData = serde_json::from_str(&json).unwrap();

        assert_eq!(back.balance_sheet, data.balance_sheet);
        assert_eq!(back.column_headers, data.column_headers);
        assert!(json.contains("\"file_name\": \"acme.xlsx\""));
    }
}
