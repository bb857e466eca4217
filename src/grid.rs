//! Read-only cell grid abstraction.
//!
//! The engine never talks to a spreadsheet library directly. Whatever turns an
//! uploaded file into cells implements [`CellGrid`]; [`SheetGrid`] is the
//! in-memory implementation used by tests and callers that already hold the
//! cell values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// Cell for a field of a delimited text export. Fields that parse as finite
    /// numbers become numbers; anything else, "NaN" and "inf" included, stays
    /// text for the extractor's own number parsing.
    pub fn from_text_field(field: &str) -> Self {
        match field.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => CellValue::Number(number),
            _ => CellValue::from(field),
        }
    }

    /// Trimmed textual content; numbers are formatted without a trailing `.0`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::from(value.as_str())
    }
}

pub trait CellGrid {
    /// Zero-based lookup. Cells outside the used range are `Empty`.
    fn cell_at(&self, row: usize, col: usize) -> CellValue;

    /// Inclusive `(max_row, max_col)` of the populated area, `None` for an empty sheet.
    fn used_range(&self) -> Option<(usize, usize)>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    cells: BTreeMap<(usize, usize), CellValue>,
}

impl SheetGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a grid from dense rows; empty cells are not stored.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<CellValue>,
    {
        let mut grid = Self::new();
        for (row_idx, row) in rows.into_iter().enumerate() {
            for (col_idx, cell) in row.into_iter().enumerate() {
                grid.set(row_idx, col_idx, cell);
            }
        }
        grid
    }

    pub fn set(&mut self, row: usize, col: usize, value: impl Into<CellValue>) {
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl CellGrid for SheetGrid {
    fn cell_at(&self, row: usize, col: usize) -> CellValue {
        self.cells.get(&(row, col)).cloned().unwrap_or_default()
    }

    fn used_range(&self) -> Option<(usize, usize)> {
        let max_row = self.cells.keys().map(|(r, _)| *r).max()?;
        let max_col = self.cells.keys().map(|(_, c)| *c).max()?;
        Some((max_row, max_col))
    }
}

impl<G: CellGrid + ?Sized> CellGrid for &G {
    fn cell_at(&self, row: usize, col: usize) -> CellValue {
        (**self).cell_at(row, col)
    }

    fn used_range(&self) -> Option<(usize, usize)> {
        (**self).used_range()
    }
}

/// A named collection of sheets, in workbook order.
#[derive(Default)]
pub struct Workbook {
    sheets: Vec<(String, Box<dyn CellGrid>)>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: impl Into<String>, grid: impl CellGrid + 'static) {
        self.sheets.push((name.into(), Box::new(grid)));
    }

    pub fn with_sheet(mut self, name: impl Into<String>, grid: impl CellGrid + 'static) -> Self {
        self.add_sheet(name, grid);
        self
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheets(&self) -> impl Iterator<Item = (&str, &dyn CellGrid)> {
        self.sheets
            .iter()
            .map(|(name, grid)| (name.as_str(), grid.as_ref()))
    }
}
