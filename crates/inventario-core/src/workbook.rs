//! Workbook type - the main document structure

use crate::defined_name::DefinedName;
use crate::error::{Error, Result};
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook (spreadsheet document): an ordered list of named worksheets
///
/// Besides the sheets it carries the workbook-level parts a rewrite must not
/// lose: defined names, and the stylesheet that cell style indices refer to.
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    defined_names: Vec<DefinedName>,
    stylesheet: Option<String>,
}

impl Workbook {
    /// Create a new workbook with one worksheet named "Sheet1"
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            ..Self::empty()
        }
    }

    /// Create an empty workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            defined_names: Vec::new(),
            stylesheet: None,
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

    /// Get a worksheet by name (exact match, as sheet lookups are in Excel's API)
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.worksheets.iter().find(|ws| ws.name() == name)
    }

    /// Get the index of a worksheet by name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets.iter().position(|ws| ws.name() == name)
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Add a new empty worksheet at the end
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.add_existing_worksheet(Worksheet::new(name))
    }

    /// Add an existing worksheet to the end of the workbook
    pub fn add_existing_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        self.validate_sheet_name(worksheet.name())?;
        let index = self.worksheets.len();
        self.worksheets.push(worksheet);
        Ok(index)
    }

    /// Get a worksheet by name, creating it at the end when missing.
    ///
    /// The flag is `true` when the sheet was created by this call.
    pub fn worksheet_or_insert(&mut self, name: &str) -> Result<(&mut Worksheet, bool)> {
        let (index, created) = match self.sheet_index(name) {
            Some(index) => (index, false),
            None => (self.add_worksheet_with_name(name)?, true),
        };
        Ok((&mut self.worksheets[index], created))
    }

    // === Workbook-level parts ===

    pub fn defined_names(&self) -> &[DefinedName] {
        &self.defined_names
    }

    pub fn add_defined_name(&mut self, name: DefinedName) {
        self.defined_names.push(name);
    }

    /// Stylesheet XML (`xl/styles.xml`) the cell style indices refer to.
    ///
    /// `None` for workbooks built in memory, which only use the default style.
    pub fn stylesheet(&self) -> Option<&str> {
        self.stylesheet.as_deref()
    }

    pub fn set_stylesheet(&mut self, xml: impl Into<String>) {
        self.stylesheet = Some(xml.into());
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

        const INVALID_CHARS: &[char] = &[':', '\\', '/', '?', '*', '[', ']'];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(Error::InvalidSheetName(format!(
                "Sheet name cannot contain '{}'",
                c
            )));
        }

        // Excel compares sheet names case-insensitively
        let name_lower = name.to_lowercase();
        if self
            .worksheets
            .iter()
            .any(|ws| ws.name().to_lowercase() == name_lower)
        {
            return Err(Error::DuplicateSheetName(name.into()));
        }

        Ok(())
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
