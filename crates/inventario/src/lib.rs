//! # inventario
//!
//! Stock catalog, movement ledger and inventory reconciliation over a single
//! spreadsheet file.
//!
//! The store is one `.xlsx` workbook with three sheets: the read-only
//! `Productos VALMEX` catalog and the `Entradas` / `Salidas` movement logs.
//! Current stock is always derived, never stored:
//!
//! ```text
//! current = initial stock + Σ in − Σ out
//! ```
//!
//! ## Features
//!
//! - Catalog loading with typed, fall-back-to-zero numeric columns
//! - Append-only movement logs, created with their header on first use
//! - Reconciliation that drops items whose stock is exactly zero
//! - A [`Session`] object holding the catalog snapshot for one run
//!
//! ## Example
//!
//! ```rust
//! use inventario::prelude::*;
//! use rust_decimal::Decimal;
//!
//! let ledger = MemoryLedger::new();
//! let item = CatalogItem::new("A1", "Pintura Azul", "Litro")
//!     .with_initial_stock(Decimal::from(100));
//!
//! let request = RegisterRequest {
//!     kind: MovementKind::In,
//!     selection: Some(&item),
//!     quantity: "25",
//! };
//! register_movement(&ledger, request).unwrap();
//!
//! let rows = compute_current_stock(&[item], &ledger).unwrap();
//! assert_eq!(rows[0].stock_display(), "125.00");
//! ```

mod coerce;

pub mod catalog;
pub mod error;
pub mod format;
pub mod ledger;
pub mod prelude;
pub mod reconcile;
pub mod schema;
pub mod session;
pub mod store;

pub use catalog::{catalog_header, load_catalog, Catalog, CatalogItem};
pub use error::{Error, ParseError, Result, ValidationError};
pub use format::{format_currency, format_stock};
pub use ledger::{Ledger, MemoryLedger, MovementKind, MovementRecord, NewMovement, WorkbookLedger};
pub use reconcile::{compute_current_stock, ReconciledStock};
pub use session::{parse_quantity, register_movement, RegisterRequest, Session};
pub use store::Store;
