//! Cell value types

use std::fmt;

use super::CellRange;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value (all numbers stored as f64, including dates)
    Number(f64),

    /// String value
    String(String),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(CellError),

    /// Formula with the result Excel last computed for it
    Formula {
        /// Formula text without the leading '=' (as stored in the file)
        text: String,
        /// Last calculated value (if any)
        cached_value: Option<Box<CellValue>>,
        /// Set when the cell belongs to a shared-formula group
        shared: Option<SharedFormula>,
    },
}

/// Membership in a shared-formula group (`<f t="shared" si="..">`).
///
/// The first cell of a group holds the formula text and the range the group
/// covers; every other member has empty text and reuses the first cell's
/// formula with its references shifted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedFormula {
    /// Group index, unique within one worksheet
    pub index: u32,
    /// Cells the group covers; only set on the cell holding the text
    pub range: Option<CellRange>,
}

impl CellValue {
    /// Create a new string value
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(s.into())
    }

    /// Create a formula with a cached result
    pub fn formula<S: Into<String>>(text: S, cached_value: Option<CellValue>) -> Self {
        CellValue::Formula {
            text: text.into(),
            cached_value: cached_value.map(Box::new),
            shared: None,
        }
    }

    /// Create a member of a shared-formula group
    pub fn shared_formula<S: Into<String>>(
        text: S,
        cached_value: Option<CellValue>,
        shared: SharedFormula,
    ) -> Self {
        CellValue::Formula {
            text: text.into(),
            cached_value: cached_value.map(Box::new),
            shared: Some(shared),
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True for empty cells and for strings that are only whitespace
    pub fn is_blank(&self) -> bool {
        match self.effective_value() {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Boolean(true) => Some(1.0),
            CellValue::Boolean(false) => Some(0.0),
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => v.as_number(),
            _ => None,
        }
    }

    /// Try to get the value as a string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s.as_str()),
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => v.as_string(),
            _ => None,
        }
    }

    /// Get the formula text if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Shared-formula group of a formula cell, if it belongs to one
    pub fn shared_formula_group(&self) -> Option<&SharedFormula> {
        match self {
            CellValue::Formula { shared, .. } => shared.as_ref(),
            _ => None,
        }
    }

    /// Get the effective value (cached value for formulas, value otherwise)
    pub fn effective_value(&self) -> &CellValue {
        match self {
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => v.effective_value(),
            _ => self,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            // f64's Display already drops the fraction of integral values (1001.0 -> "1001")
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula {
                cached_value: Some(v),
                ..
            } => write!(f, "{}", v),
            CellValue::Formula { text, .. } => write!(f, "={}", text),
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<u64> for CellValue {
    fn from(n: u64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::string(s)
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<&String> for CellValue {
    fn from(s: &String) -> Self {
        CellValue::String(s.clone())
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Excel error values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
}

impl CellError {
    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
        }
    }

    /// Parse an error string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "#NULL!" => Some(CellError::Null),
            "#DIV/0!" => Some(CellError::Div0),
            "#VALUE!" => Some(CellError::Value),
            "#REF!" => Some(CellError::Ref),
            "#NAME?" => Some(CellError::Name),
            "#NUM!" => Some(CellError::Num),
            "#N/A" => Some(CellError::Na),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
