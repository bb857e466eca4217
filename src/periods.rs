use crate::config::ParserConfig;
use crate::grid::{CellGrid, CellValue};
use chrono::{Datelike, Utc};
use log::{debug, info};
use regex::Regex;
use std::sync::LazyLock;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:fy|cy)?\s*'?(?:19|20)\d{2}(?:\s*[/-]\s*(?:\d{2}|(?:19|20)\d{2}))?(?:\s*\((?:a|e|f|b|actual|estimate|forecast|budget)\))?$")
        .expect("valid year regex")
});

static SHORT_FISCAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:fy|cy)\s*'?\d{2}$").expect("valid fiscal regex"));

static RELATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:year|yr|y|t|period|p)\s*[-+]?\s*\d{1,2}|(?:q[1-4]|h[12])\s*[-/]?\s*(?:19|20)?\d{2}|ltm|ttm|ytd|current(?:\s+year)?|prior(?:\s+year)?|previous(?:\s+year)?|budget|forecast|actual)$")
        .expect("valid relative period regex")
});

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodHeaders {
    pub labels: Vec<String>,
    pub header_row: usize,
    /// False when the labels were synthesized because no header row qualified.
    pub detected: bool,
    /// Number of period-looking cells in the header row before truncation.
    pub found_count: usize,
}

impl PeriodHeaders {
    pub fn column_count(&self) -> usize {
        self.labels.len()
    }
}

pub fn looks_like_period(text: &str) -> bool {
    let text = text.trim();
    YEAR_RE.is_match(text) || SHORT_FISCAL_RE.is_match(text) || RELATIVE_RE.is_match(text)
}

/// Header text for a cell; bare numeric years count as text.
fn header_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Number(n) if n.fract() == 0.0 && (1900.0..=2100.0).contains(n) => cell.as_text(),
        CellValue::Number(_) => None,
        _ => cell.as_text(),
    }
}

pub fn detect_period_headers(grid: &dyn CellGrid, config: &ParserConfig) -> PeriodHeaders {
    let Some((max_row, max_col)) = grid.used_range() else {
        return default_period_headers(config);
    };

    let last_row = max_row.min(config.header_scan_rows.saturating_sub(1));
    let last_col = max_col.min(config.max_scan_cols.saturating_sub(1));

    for row in 0..=last_row {
        let values: Vec<String> = (1..=last_col)
            .filter_map(|col| header_text(&grid.cell_at(row, col)))
            .collect();

        let periods: Vec<String> = values
            .into_iter()
            .filter(|value| looks_like_period(value))
            .collect();

        if periods.len() >= config.min_period_matches {
            let found_count = periods.len();
            let labels: Vec<String> = periods.into_iter().take(config.expected_periods).collect();
            info!(
                "Detected period header on row {} with {} period(s): {:?}",
                row, found_count, labels
            );
            return PeriodHeaders {
                labels,
                header_row: row,
                detected: true,
                found_count,
            };
        }

        debug!("Row {} has {} period-like cell(s); not a header", row, periods.len());
    }

    default_period_headers(config)
}

/// Sequential years centered on the current year.
pub fn default_period_headers(config: &ParserConfig) -> PeriodHeaders {
    let count = config.expected_periods;
    let first_year = Utc::now().year() - (count / 2) as i32;
    let labels: Vec<String> = (0..count)
        .map(|offset| (first_year + offset as i32).to_string())
        .collect();

    info!(
        "No period header found; using default periods {:?} with header row {}",
        labels, config.fallback_header_row
    );

    PeriodHeaders {
        labels,
        header_row: config.fallback_header_row,
        detected: false,
        found_count: 0,
    }
}
