//! Error types for the inventory library
//!
//! Every failure is meant to be caught by the caller nearest to it and shown
//! to the operator. Only [`Error::MissingSource`] at startup ends a session.

use std::path::PathBuf;

use inventario_xlsx::XlsxError;
use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The store file does not exist
    #[error("the file {} was not found", .0.display())]
    MissingSource(PathBuf),

    /// A required sheet is absent from the store
    #[error("sheet '{0}' not found in the store")]
    MissingSection(String),

    /// A required header is absent from a sheet
    #[error("sheet '{section}' has no '{column}' column")]
    MissingColumn { section: String, column: String },

    /// The store exists but could not be decoded
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    /// Rewriting the store failed; the movement was not recorded
    #[error("could not save the movement to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sheet(#[from] inventario_core::Error),
}

impl Error {
    /// Whether the session cannot continue after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MissingSource(_))
    }
}

/// Operator input rejected before anything is written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("enter a valid quantity (a whole number above zero), got '{0}'")]
    InvalidQuantity(String),

    #[error("select a product from the catalog")]
    NoSelection,

    #[error("unknown movement kind '{0}' (expected in/entrada or out/salida)")]
    UnknownKind(String),
}

/// A cell that could not be read as the type its column requires.
///
/// Not an error for the caller: the value is replaced by 0 and the problem
/// is kept so it can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{section}!{cell} ({column}): cannot read '{raw}' as {expected}, using 0")]
pub struct ParseError {
    pub section: String,
    /// A1 reference of the offending cell
    pub cell: String,
    pub column: String,
    pub raw: String,
    pub expected: &'static str,
}
