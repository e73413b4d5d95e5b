//! # inventario-core
//!
//! In-memory spreadsheet model used by the inventario store.
//!
//! The model only carries what the store needs to round-trip: sheet order,
//! sheet names, cell values (including formulas with their cached results and
//! shared-formula groups), defined names and column widths. Formatting is
//! carried opaquely as per-cell style indices plus the source stylesheet.
//!
//! ## Example
//!
//! ```rust
//! use inventario_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::empty();
//! let idx = workbook.add_worksheet_with_name("Entradas").unwrap();
//! let sheet = workbook.worksheet_mut(idx).unwrap();
//!
//! sheet.append_row(["Fecha", "Codigo", "Cantidad"]).unwrap();
//! sheet.append_row([CellValue::from("2024-01-02 10:00:00"), "A1".into(), 5.into()]).unwrap();
//!
//! assert_eq!(sheet.last_row(), Some(1));
//! ```

pub mod cell;
pub mod defined_name;
pub mod error;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellError, CellRange, CellValue, SharedFormula};
pub use defined_name::{DefinedName, NameScope};
pub use error::{Error, Result};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
