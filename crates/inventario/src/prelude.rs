//! Prelude module - common imports for inventario users
//!
//! ```rust
//! use inventario::prelude::*;
//! ```

pub use crate::{
    // Reconciliation
    compute_current_stock,
    // Display
    format_currency,
    format_stock,
    // Catalog
    load_catalog,
    // Session
    parse_quantity,
    register_movement,

    Catalog,
    CatalogItem,
    // Error types
    Error,
    // Ledger
    Ledger,
    MemoryLedger,
    MovementKind,
    MovementRecord,
    NewMovement,
    ReconciledStock,
    RegisterRequest,
    Result,
    Session,
    // Store
    Store,
    ValidationError,
    WorkbookLedger,
};
