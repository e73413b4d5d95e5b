//! Fixed sheet and header names of the store file.
//!
//! These strings are a contract with the spreadsheet the operator maintains
//! and must match it exactly.

/// Default store file name, looked up next to the executable
pub const DEFAULT_FILE_NAME: &str = "Inventario.xlsx";

/// The read-only product catalog
pub mod catalog {
    pub const SHEET: &str = "Productos VALMEX";

    pub const CODE: &str = "Codigo";
    pub const DESCRIPTION: &str = "Descripcion";
    pub const PRESENTATION_UNIT: &str = "Unidades de Presentacion";
    pub const FINAL_PRICE: &str = "PF (Precio Final)";

    /// Initial-stock header as spelled in the source workbook
    pub const INITIAL_STOCK: &str = "Inventario Inical";
    /// Accepted when the source header has been corrected
    pub const INITIAL_STOCK_CORRECTED: &str = "Inventario Inicial";
}

/// The append-only movement logs
pub mod movements {
    pub const IN_SHEET: &str = "Entradas";
    pub const OUT_SHEET: &str = "Salidas";

    pub const TIMESTAMP: &str = "Fecha";
    pub const CODE: &str = "Codigo";
    pub const DESCRIPTION: &str = "Descripcion";
    pub const UNIT: &str = "Unidades";
    pub const PRICE: &str = "Precio";
    pub const QUANTITY: &str = "Cantidad";

    /// Header row written when a log sheet is created
    pub const HEADER: [&str; 6] = [TIMESTAMP, CODE, DESCRIPTION, UNIT, PRICE, QUANTITY];

    /// How timestamps are stored in the `Fecha` column
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
}
