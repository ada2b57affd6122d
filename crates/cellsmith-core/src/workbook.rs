//! Workbook type - an ordered collection of named worksheets

use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook (spreadsheet document)
///
/// Sheet names are unique case-insensitively, matching how formulas address
/// them (`data!A1` and `Data!A1` are the same sheet).
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    active_sheet: usize,
}

impl Workbook {
    /// Create a new workbook with one worksheet named `Sheet1`
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            active_sheet: 0,
        }
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            active_sheet: 0,
        }
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by name (case-insensitive)
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).map(|i| &self.worksheets[i])
    }

    /// Get a mutable worksheet by name (case-insensitive)
    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheet_index(name).map(move |i| &mut self.worksheets[i])
    }

    /// Get the index of a worksheet by name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets
            .iter()
            .position(|ws| ws.name().eq_ignore_ascii_case(name))
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Add a new worksheet with a generated name
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = self.generate_sheet_name();
        self.add_worksheet_with_name(&name)
    }

    /// Add a new worksheet with the given name
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name)?;
        self.worksheets.push(Worksheet::new(name));
        Ok(self.worksheets.len() - 1)
    }

    /// Remove a worksheet by index
    pub fn remove_worksheet(&mut self, index: usize) -> Result<Worksheet> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        let worksheet = self.worksheets.remove(index);
        if self.active_sheet >= self.worksheets.len() {
            self.active_sheet = self.worksheets.len().saturating_sub(1);
        }
        Ok(worksheet)
    }

    /// Get the active sheet index
    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    /// Set the active sheet index
    pub fn set_active_sheet(&mut self, index: usize) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.active_sheet = index;
        Ok(())
    }

    fn validate_sheet_name(&self, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
        }
        if name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name too long (max {} characters)",
                MAX_SHEET_NAME_LEN
            )));
        }

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']', '!'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        if self.sheet_index(name).is_some() {
            return Err(Error::DuplicateSheetName(name.into()));
        }
        Ok(())
    }

    fn generate_sheet_name(&self) -> String {
        (self.worksheets.len() + 1..)
            .map(|n| format!("Sheet{}", n))
            .find(|name| self.sheet_index(name).is_none())
            .unwrap_or_else(|| "Sheet".to_string())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_workbook() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.worksheet(0).unwrap().name(), "Sheet1");
    }

    #[test]
    fn test_add_worksheets() {
        let mut wb = Workbook::new();
        assert_eq!(wb.add_worksheet().unwrap(), 1);
        assert_eq!(wb.worksheet(1).unwrap().name(), "Sheet2");
        assert_eq!(wb.add_worksheet_with_name("Data").unwrap(), 2);
        assert_eq!(wb.sheet_index("data"), Some(2));
    }

    #[test]
    fn test_invalid_names() {
        let mut wb = Workbook::new();
        assert!(matches!(
            wb.add_worksheet_with_name("sheet1"),
            Err(Error::DuplicateSheetName(_))
        ));
        assert!(wb.add_worksheet_with_name("").is_err());
        assert!(wb.add_worksheet_with_name("a/b").is_err());
        assert!(wb.add_worksheet_with_name(&"x".repeat(32)).is_err());
    }

    #[test]
    fn test_remove_worksheet_adjusts_active() {
        let mut wb = Workbook::new();
        wb.add_worksheet().unwrap();
        wb.set_active_sheet(1).unwrap();
        wb.remove_worksheet(1).unwrap();
        assert_eq!(wb.active_sheet(), 0);
        assert!(wb.remove_worksheet(5).is_err());
    }
}
