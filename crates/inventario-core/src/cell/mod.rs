//! Cell-related types
//!
//! - [`CellValue`] - The value stored in a cell
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A rectangular block of cells (e.g., "A1:F10")

mod address;
mod value;

pub use address::{CellAddress, CellRange};
pub use value::{CellError, CellValue, SharedFormula};
