//! Worksheet type

use std::collections::{BTreeMap, BTreeSet};

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

static EMPTY: CellValue = CellValue::Empty;

/// A worksheet (single sheet in a workbook)
///
/// Cells are stored sparsely, keyed by `(row, col)` so that iteration is
/// row-major, which is the order the XLSX `<sheetData>` element requires.
///
/// Style indices point into the workbook's stylesheet and are kept apart
/// from values: a cell can be formatted without holding anything.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<(u32, u16), CellValue>,
    styles: BTreeMap<(u32, u16), u32>,
    column_widths: BTreeMap<u16, f64>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    // === Cell Access ===

    /// Get cell value by address string (e.g., "B2")
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get cell value by indices
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.value_ref_at(row, col).clone()
    }

    /// Borrow a cell value by indices; missing cells read as [`CellValue::Empty`]
    pub fn value_ref_at(&self, row: u32, col: u16) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&EMPTY)
    }

    // === Cell Modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    ///
    /// Setting [`CellValue::Empty`] removes the cell.
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        self.validate_cell_position(row, col)?;
        match value.into() {
            CellValue::Empty => {
                self.cells.remove(&(row, col));
            }
            value => {
                self.cells.insert((row, col), value);
            }
        }
        Ok(())
    }

    // === Formatting ===

    /// Style index of a cell, if it has one other than the default
    pub fn style_at(&self, row: u32, col: u16) -> Option<u32> {
        self.styles.get(&(row, col)).copied()
    }

    /// Set the style index of a cell; 0 is the default and is not stored
    pub fn set_style_at(&mut self, row: u32, col: u16, style: u32) -> Result<()> {
        self.validate_cell_position(row, col)?;
        if style == 0 {
            self.styles.remove(&(row, col));
        } else {
            self.styles.insert((row, col), style);
        }
        Ok(())
    }

    /// Set a custom width (in characters) for a column
    pub fn set_column_width(&mut self, col: u16, width: f64) -> Result<()> {
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        self.column_widths.insert(col, width);
        Ok(())
    }

    /// Columns with a custom width, in column order
    pub fn custom_column_widths(&self) -> &BTreeMap<u16, f64> {
        &self.column_widths
    }

    /// Write `values` into the row after the last used one (row 0 on an empty sheet).
    ///
    /// Returns the row index that was written.
    pub fn append_row<I, V>(&mut self, values: I) -> Result<u32>
    where
        I: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let row = match self.last_row() {
            Some(last) => last + 1,
            None => 0,
        };
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        for (col, value) in values.into_iter().enumerate() {
            let col = u16::try_from(col)
                .map_err(|_| Error::ColumnOutOfBounds(u16::MAX, MAX_COLS - 1))?;
            self.set_cell_value_at(row, col, value)?;
        }
        Ok(row)
    }

    // === Range Operations ===

    /// Get the used range (bounds of all non-empty cells)
    pub fn used_range(&self) -> Option<CellRange> {
        let (&(first_row, _), _) = self.cells.iter().next()?;
        let (&(last_row, _), _) = self.cells.iter().next_back()?;
        let min_col = self.cells.keys().map(|&(_, c)| c).min()?;
        let max_col = self.cells.keys().map(|&(_, c)| c).max()?;
        Some(CellRange::from_indices(first_row, min_col, last_row, max_col))
    }

    /// Index of the last row holding any value
    pub fn last_row(&self) -> Option<u32> {
        self.cells.keys().next_back().map(|&(row, _)| row)
    }

    /// Iterate over all stored cells in row-major order
    pub fn iter_cells(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.cells.iter().map(|(&(row, col), value)| (row, col, value))
    }

    /// Every cell that holds a value or a style, row-major, with its style index
    pub fn iter_formatted_cells(
        &self,
    ) -> impl Iterator<Item = (u32, u16, &CellValue, Option<u32>)> + '_ {
        let positions: BTreeSet<(u32, u16)> =
            self.cells.keys().chain(self.styles.keys()).copied().collect();
        positions.into_iter().map(move |(row, col)| {
            (row, col, self.value_ref_at(row, col), self.style_at(row, col))
        })
    }

    /// True when no cell holds a value (formatting alone does not count)
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    fn validate_cell_position(&self, row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        Ok(())
    }
}
