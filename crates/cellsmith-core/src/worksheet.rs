//! Worksheet type

use std::collections::BTreeMap;

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::conditional_format::ConditionalFormatRule;
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A worksheet (single sheet in a workbook)
///
/// Cells are stored sparsely: `BTreeMap<row, BTreeMap<col, value>>`, so only
/// non-empty cells cost memory and iteration is row-major.
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
    conditional_formats: Vec<ConditionalFormatRule>,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
            conditional_formats: Vec::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the sheet
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell Access ===

    /// Get cell value by address string (e.g., "A1")
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get cell value by indices
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.value_ref(row, col).cloned().unwrap_or_default()
    }

    /// Borrow a stored value, `None` for empty cells
    pub fn value_ref(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.rows.get(&row).and_then(|cols| cols.get(&col))
    }

    /// Number of stored (non-empty) cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    // === Cell Modification ===

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by row and column indices
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        self.validate_cell_position(row, col)?;
        let value = value.into();
        if value.is_empty() {
            self.clear_cell_at(row, col);
        } else {
            self.rows.entry(row).or_default().insert(col, value);
        }
        Ok(())
    }

    /// Write a block of values with its top-left corner at `address`
    pub fn set_range_values<V, R>(&mut self, address: &str, rows: R) -> Result<()>
    where
        V: Into<CellValue>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
    {
        let origin = CellAddress::parse(address)?;
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                let row_idx = origin.row as u64 + r as u64;
                let col_idx = origin.col as u64 + c as u64;
                if row_idx >= MAX_ROWS as u64 {
                    return Err(Error::RowOutOfBounds(row_idx as u32, MAX_ROWS - 1));
                }
                if col_idx >= MAX_COLS as u64 {
                    return Err(Error::ColumnOutOfBounds(col_idx as u32, MAX_COLS - 1));
                }
                self.set_cell_value_at(row_idx as u32, col_idx as u16, value)?;
            }
        }
        Ok(())
    }

    /// Clear a cell by indices
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        if let Some(cols) = self.rows.get_mut(&row) {
            cols.remove(&col);
            if cols.is_empty() {
                self.rows.remove(&row);
            }
        }
    }

    // === Range Operations ===

    /// Get the used range (bounds of all non-empty cells)
    pub fn used_range(&self) -> Option<CellRange> {
        let min_row = *self.rows.keys().next()?;
        let max_row = *self.rows.keys().next_back()?;
        let min_col = self.rows.values().filter_map(|c| c.keys().next()).min()?;
        let max_col = self
            .rows
            .values()
            .filter_map(|c| c.keys().next_back())
            .max()?;
        Some(CellRange::from_indices(min_row, *min_col, max_row, *max_col))
    }

    /// Values of a range as rows of cells
    pub fn range_values(&self, range: &CellRange) -> Vec<Vec<CellValue>> {
        (range.start.row..=range.end.row)
            .map(|row| {
                (range.start.col..=range.end.col)
                    .map(|col| self.get_value_at(row, col))
                    .collect()
            })
            .collect()
    }

    // === Conditional Formatting ===

    /// Attach a conditional formatting rule
    pub fn add_conditional_format(&mut self, rule: ConditionalFormatRule) {
        self.conditional_formats.push(rule);
    }

    /// Rules in priority order (lowest priority value first)
    pub fn conditional_formats(&self) -> Vec<&ConditionalFormatRule> {
        let mut rules: Vec<_> = self.conditional_formats.iter().collect();
        rules.sort_by_key(|r| r.priority);
        rules
    }

    /// Remove every rule
    pub fn clear_conditional_formats(&mut self) {
        self.conditional_formats.clear();
    }

    fn validate_cell_position(&self, row: u32, col: u16) -> Result<()> {
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col as u32, MAX_COLS - 1));
        }
        Ok(())
    }
}
