//! Session context: one catalog snapshot plus the file-backed ledger.
//!
//! Every operator action maps to one method here, so the presentation layer
//! holds a `Session` and nothing else.

use crate::catalog::{load_catalog, Catalog, CatalogItem};
use crate::error::{Result, ValidationError};
use crate::ledger::{Ledger, MovementKind, MovementRecord, NewMovement, WorkbookLedger};
use crate::reconcile::{compute_current_stock, ReconciledStock};
use crate::store::Store;

/// Inputs of a register action
#[derive(Debug, Clone, Copy)]
pub struct RegisterRequest<'a> {
    pub kind: MovementKind,
    /// The selected catalog row, if any
    pub selection: Option<&'a CatalogItem>,
    /// Quantity exactly as typed
    pub quantity: &'a str,
}

/// Parse a typed quantity: ASCII digits only, at least 1.
///
/// No trimming is done; `" 5"` is rejected like `"abc"`, `"-3"`, `"0"` and `""`.
pub fn parse_quantity(text: &str) -> std::result::Result<u64, ValidationError> {
    let invalid = || ValidationError::InvalidQuantity(text.to_string());
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match text.parse::<u64>() {
        Ok(quantity) if quantity >= 1 => Ok(quantity),
        _ => Err(invalid()),
    }
}

/// Validate `request` and append it to `ledger`.
///
/// Nothing is written unless both the quantity and the selection are valid.
pub fn register_movement<L: Ledger + ?Sized>(
    ledger: &L,
    request: RegisterRequest<'_>,
) -> Result<MovementRecord> {
    let quantity = parse_quantity(request.quantity)?;
    let item = request.selection.ok_or(ValidationError::NoSelection)?;
    ledger.append(request.kind, NewMovement::from_item(item, quantity))
}

/// A running session over one store file
#[derive(Debug)]
pub struct Session {
    ledger: WorkbookLedger,
    catalog: Catalog,
}

impl Session {
    /// Load the catalog once.
    ///
    /// [`Error::MissingSource`](crate::Error::MissingSource) here means the
    /// store file is absent and the session cannot start.
    pub fn open(store: Store) -> Result<Self> {
        let catalog = load_catalog(&store)?;
        tracing::info!(path = %store.path().display(), "session opened");
        Ok(Self {
            ledger: WorkbookLedger::new(store),
            catalog,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &Store {
        self.ledger.store()
    }

    pub fn ledger(&self) -> &WorkbookLedger {
        &self.ledger
    }

    pub fn search(&self, filter: &str) -> Vec<&CatalogItem> {
        self.catalog.search(filter)
    }

    pub fn find(&self, code: &str) -> Option<&CatalogItem> {
        self.catalog.find(code)
    }

    pub fn register(&self, request: RegisterRequest<'_>) -> Result<MovementRecord> {
        register_movement(&self.ledger, request).map_err(|err| {
            tracing::warn!(kind = %request.kind, "movement not recorded: {err}");
            err
        })
    }

    /// The full log of `kind`, read from disk
    pub fn report(&self, kind: MovementKind) -> Result<Vec<MovementRecord>> {
        self.ledger.read_all(kind)
    }

    pub fn current_stock(&self) -> Result<Vec<ReconciledStock>> {
        compute_current_stock(self.catalog.items(), &self.ledger)
    }
}
