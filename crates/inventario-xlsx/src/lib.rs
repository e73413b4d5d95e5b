//! # inventario-xlsx
//!
//! XLSX (Office Open XML) reader and writer for the inventario spreadsheet model.
//!
//! A read followed by a write keeps cell values, formulas (including
//! shared-formula groups), per-cell style indices with the package's original
//! stylesheet, column widths and defined names. Other parts of a package
//! (themes, drawings, comments, row heights, merged cells) are not carried.

pub mod error;
pub mod reader;
pub mod writer;

mod escape;

pub use error::{XlsxError, XlsxResult};
pub use reader::XlsxReader;
pub use writer::XlsxWriter;
