//! Defined names (named ranges and constants)

/// Scope of a defined name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    /// Visible throughout the workbook
    Workbook,
    /// Local to the sheet at this position in tab order
    Sheet(usize),
}

/// A name defined in the workbook, e.g. `Precios` for `'Productos VALMEX'!$D:$D`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    /// Case-insensitive in Excel, stored as written
    pub name: String,
    pub scope: NameScope,
    /// Reference or formula the name stands for, without a leading '='
    pub refers_to: String,
    /// Hidden from Excel's name manager
    pub hidden: bool,
}

impl DefinedName {
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>, scope: NameScope) -> Self {
        Self {
            name: name.into(),
            scope,
            refers_to: refers_to.into(),
            hidden: false,
        }
    }
}
