//! Reconciliation of catalog stock against the movement logs
//!
//! `current = initial + Σ in − Σ out` per code. Rows whose current stock is
//! exactly zero are dropped; there is no tolerance band.

use ahash::AHashMap;
use rust_decimal::Decimal;

use crate::catalog::CatalogItem;
use crate::error::Result;
use crate::format::{format_currency, format_stock};
use crate::ledger::{Ledger, MovementKind, MovementRecord};

/// One catalog item with non-zero current stock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledStock {
    pub code: String,
    pub description: String,
    pub presentation_unit: String,
    pub final_price: Decimal,
    pub initial_stock: Decimal,
    /// Sum of `in` quantities for this code
    pub ins: Decimal,
    /// Sum of `out` quantities for this code
    pub outs: Decimal,
    /// Net stock, 2 fraction digits
    pub current_stock: Decimal,
}

impl ReconciledStock {
    pub fn price_display(&self) -> String {
        format_currency(self.final_price)
    }

    pub fn stock_display(&self) -> String {
        format_stock(self.current_stock)
    }
}

/// Per-code quantity totals of one log
fn totals(records: &[MovementRecord]) -> AHashMap<&str, Decimal> {
    let mut sums: AHashMap<&str, Decimal> = AHashMap::with_capacity(records.len());
    for record in records {
        *sums.entry(record.code.as_str()).or_default() += Decimal::from(record.quantity);
    }
    sums
}

/// Reconcile `catalog` against both logs of `ledger`.
///
/// Rows come out in catalog order. The computation has no side effects, so
/// calling it again without an append in between gives the same rows.
pub fn compute_current_stock<L: Ledger + ?Sized>(
    catalog: &[CatalogItem],
    ledger: &L,
) -> Result<Vec<ReconciledStock>> {
    let in_records = ledger.read_all(MovementKind::In)?;
    let out_records = ledger.read_all(MovementKind::Out)?;
    let ins = totals(&in_records);
    let outs = totals(&out_records);

    let rows: Vec<ReconciledStock> = catalog
        .iter()
        .filter_map(|item| {
            let code = item.code.as_str();
            let in_sum = ins.get(code).copied().unwrap_or_default();
            let out_sum = outs.get(code).copied().unwrap_or_default();
            let current = item.initial_stock + in_sum - out_sum;
            if current.is_zero() {
                return None;
            }

            let mut current_stock = current;
            current_stock.rescale(2);
            Some(ReconciledStock {
                code: item.code.clone(),
                description: item.description.clone(),
                presentation_unit: item.presentation_unit.clone(),
                final_price: item.final_price,
                initial_stock: item.initial_stock,
                ins: in_sum,
                outs: out_sum,
                current_stock,
            })
        })
        .collect();

    tracing::debug!(
        catalog = catalog.len(),
        ins = in_records.len(),
        outs = out_records.len(),
        rows = rows.len(),
        "stock reconciled"
    );
    Ok(rows)
}
