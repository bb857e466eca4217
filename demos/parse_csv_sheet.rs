use anyhow::{Context, Result};
use financial_statement_parser::{
    CellValue, FinancialStatementParser, ParseProgress, SheetGrid, UploadedFileMetadata, Workbook,
};
use std::path::Path;

/// Loads a CSV export of a statement sheet into an in-memory grid.
fn load_sheet(path: &Path) -> Result<SheetGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut grid = SheetGrid::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading row {}", row + 1))?;
        for (col, field) in record.iter().enumerate() {
            grid.set(row, col, CellValue::from_text_field(field));
        }
    }

    Ok(grid)
}

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/sample_financials.csv".to_string());
    let path = Path::new(&path);

    let grid = load_sheet(path)?;
    let workbook = Workbook::new().with_sheet("Financial Statements", grid);
    let metadata = UploadedFileMetadata {
        file_name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_size: std::fs::metadata(path).ok().map(|m| m.len()),
        sheet_name: None,
    };

    let parser = FinancialStatementParser::new();
    let outcome = parser.parse_workbook(&workbook, Some(metadata), &mut |p: &ParseProgress| {
        println!("[{:>3}%] {:?}: {}", p.progress, p.stage, p.message);
    })?;

    println!();
    println!("{}", outcome.data.to_markdown());

    if outcome.validation.warnings.is_empty() {
        println!("No warnings.");
    } else {
        println!("Warnings:");
        for warning in &outcome.validation.warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}
