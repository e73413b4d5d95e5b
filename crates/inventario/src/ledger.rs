//! Movement ledger
//!
//! Two append-only logs of stock movements, `Entradas` for goods received
//! and `Salidas` for goods issued. Each append is stamped with the local
//! time and is on disk before [`Ledger::append`] returns.

use std::cell::RefCell;
use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, SubsecRound};
use inventario_core::{CellValue, Worksheet};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::catalog::CatalogItem;
use crate::coerce::{
    cell_text, cell_timestamp, decimal_or_zero, quantity_or_zero, CellSource, Columns,
};
use crate::error::{Result, ValidationError};
use crate::schema::movements as columns;
use crate::store::Store;

/// Which log a movement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKind {
    /// Goods received
    In,
    /// Goods issued
    Out,
}

impl MovementKind {
    pub const ALL: [MovementKind; 2] = [MovementKind::In, MovementKind::Out];

    /// Sheet holding this kind's log
    pub fn section(self) -> &'static str {
        match self {
            MovementKind::In => columns::IN_SHEET,
            MovementKind::Out => columns::OUT_SHEET,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MovementKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" | "entrada" | "entradas" => Ok(MovementKind::In),
            "out" | "salida" | "salidas" => Ok(MovementKind::Out),
            _ => Err(ValidationError::UnknownKind(s.to_string())),
        }
    }
}

/// A movement about to be recorded; the timestamp is added by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub code: String,
    pub description: String,
    pub presentation_unit: String,
    pub final_price: Decimal,
    pub quantity: u64,
}

impl NewMovement {
    /// Copy the selected catalog row; the price is not looked up again later
    pub fn from_item(item: &CatalogItem, quantity: u64) -> Self {
        Self {
            code: item.code.clone(),
            description: item.description.clone(),
            presentation_unit: item.presentation_unit.clone(),
            final_price: item.final_price,
            quantity,
        }
    }
}

/// One row of a movement log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRecord {
    /// `None` when a row written by hand has an unreadable date
    pub timestamp: Option<NaiveDateTime>,
    pub code: String,
    pub description: String,
    pub presentation_unit: String,
    pub final_price: Decimal,
    pub quantity: u64,
}

impl MovementRecord {
    pub fn stamp(movement: NewMovement, timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp: Some(timestamp),
            code: movement.code,
            description: movement.description,
            presentation_unit: movement.presentation_unit,
            final_price: movement.final_price,
            quantity: movement.quantity,
        }
    }

    /// `Fecha` column text
    pub fn timestamp_text(&self) -> String {
        self.timestamp
            .map(|ts| ts.format(columns::TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default()
    }

    /// Cells in header order
    fn to_row(&self) -> [CellValue; 6] {
        [
            CellValue::string(self.timestamp_text()),
            CellValue::string(self.code.as_str()),
            CellValue::string(self.description.as_str()),
            CellValue::string(self.presentation_unit.as_str()),
            CellValue::Number(self.final_price.to_f64().unwrap_or_default()),
            CellValue::from(self.quantity),
        ]
    }
}

/// Storage for the two movement logs
pub trait Ledger {
    /// Stamp and durably record one movement, returning the stored record
    fn append(&self, kind: MovementKind, movement: NewMovement) -> Result<MovementRecord>;

    /// Every record of `kind` in storage order; empty when the log does not exist
    fn read_all(&self, kind: MovementKind) -> Result<Vec<MovementRecord>>;
}

/// Current local time at second resolution
fn now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// The ledger kept in the store workbook.
///
/// Every call reads the file again. An append rewrites the whole file, and
/// with no locking two sessions appending at once lose one of the writes.
#[derive(Debug, Clone)]
pub struct WorkbookLedger {
    store: Store,
}

impl WorkbookLedger {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl Ledger for WorkbookLedger {
    fn append(&self, kind: MovementKind, movement: NewMovement) -> Result<MovementRecord> {
        let mut workbook = self.store.load()?;
        let (sheet, created) = workbook.worksheet_or_insert(kind.section())?;

        let cols = if created || sheet.is_empty() {
            tracing::info!(section = kind.section(), "creating movement log");
            sheet.append_row(columns::HEADER)?;
            [0, 1, 2, 3, 4, 5]
        } else {
            LogColumns::locate(kind.section(), sheet)?.cols
        };

        let record = MovementRecord::stamp(movement, now());
        let row = sheet.last_row().map_or(0, |r| r + 1);
        for (col, value) in cols.into_iter().zip(record.to_row()) {
            sheet.set_cell_value_at(row, col, value)?;
        }

        self.store.save(&workbook)?;
        tracing::info!(
            section = kind.section(),
            code = %record.code,
            quantity = record.quantity,
            row = row + 1,
            "movement recorded"
        );
        Ok(record)
    }

    fn read_all(&self, kind: MovementKind) -> Result<Vec<MovementRecord>> {
        let workbook = self.store.load()?;
        match workbook.worksheet_by_name(kind.section()) {
            Some(sheet) if !sheet.is_empty() => read_log(kind.section(), sheet),
            _ => {
                tracing::debug!(section = kind.section(), "movement log absent, reading as empty");
                Ok(Vec::new())
            }
        }
    }
}

/// Positions of the six log columns, in header order, and the rows below them
struct LogColumns<'a> {
    cols: [u16; 6],
    header: Columns<'a>,
}

impl<'a> LogColumns<'a> {
    fn locate(section: &'a str, sheet: &Worksheet) -> Result<Self> {
        let header = Columns::from_header(section, sheet, columns::CODE);
        let mut cols = [0u16; 6];
        for (slot, name) in cols.iter_mut().zip(columns::HEADER) {
            *slot = header.require(name)?;
        }
        Ok(Self { cols, header })
    }
}

fn read_log(section: &str, sheet: &Worksheet) -> Result<Vec<MovementRecord>> {
    let LogColumns { cols, header } = LogColumns::locate(section, sheet)?;
    let [_, _, _, _, price_col, quantity_col] = cols;
    let mut records = Vec::new();

    for row in header.data_rows(sheet) {
        let cells = cols.map(|col| sheet.value_ref_at(row, col));
        if cells.iter().all(|cell| cell.is_blank()) {
            continue;
        }
        let [timestamp, code, description, unit, price, quantity] = cells;

        let source = |column, col| CellSource {
            section,
            column,
            row,
            col,
        };

        let parsed_timestamp = cell_timestamp(timestamp);
        if parsed_timestamp.is_none() && !timestamp.is_blank() {
            tracing::warn!(
                section,
                row = row + 1,
                value = %cell_text(timestamp),
                "unreadable movement date"
            );
        }
        let (final_price, price_issue) = decimal_or_zero(price, source(columns::PRICE, price_col));
        let (quantity, quantity_issue) =
            quantity_or_zero(quantity, source(columns::QUANTITY, quantity_col));
        for issue in [price_issue, quantity_issue].into_iter().flatten() {
            tracing::warn!("{issue}");
        }

        records.push(MovementRecord {
            timestamp: parsed_timestamp,
            code: cell_text(code),
            description: cell_text(description),
            presentation_unit: cell_text(unit),
            final_price,
            quantity,
        });
    }

    Ok(records)
}

/// Ledger held in memory, for reconciling without a store file
#[derive(Debug, Default)]
pub struct MemoryLedger {
    ins: RefCell<Vec<MovementRecord>>,
    outs: RefCell<Vec<MovementRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, kind: MovementKind) -> &RefCell<Vec<MovementRecord>> {
        match kind {
            MovementKind::In => &self.ins,
            MovementKind::Out => &self.outs,
        }
    }
}

impl Ledger for MemoryLedger {
    fn append(&self, kind: MovementKind, movement: NewMovement) -> Result<MovementRecord> {
        let record = MovementRecord::stamp(movement, now());
        self.log(kind).borrow_mut().push(record.clone());
        Ok(record)
    }

    fn read_all(&self, kind: MovementKind) -> Result<Vec<MovementRecord>> {
        Ok(self.log(kind).borrow().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use inventario_core::Workbook;
    use pretty_assertions::assert_eq;

    fn movement(code: &str, quantity: u64) -> NewMovement {
        NewMovement {
            code: code.to_string(),
            description: "Pintura Azul".to_string(),
            presentation_unit: "Litro".to_string(),
            final_price: Decimal::new(24990, 2),
            quantity,
        }
    }

    fn empty_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("Inventario.xlsx"));
        store.save(&Workbook::new()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("in".parse::<MovementKind>().unwrap(), MovementKind::In);
        assert_eq!("Salida".parse::<MovementKind>().unwrap(), MovementKind::Out);
        assert_eq!(
            "sideways".parse::<MovementKind>(),
            Err(ValidationError::UnknownKind("sideways".to_string()))
        );
        assert_eq!(MovementKind::In.section(), "Entradas");
        assert_eq!(MovementKind::Out.to_string(), "out");
    }

    #[test]
    fn test_append_creates_log_with_header() {
        let (_dir, store) = empty_store();
        let ledger = WorkbookLedger::new(store.clone());

        let record = ledger.append(MovementKind::In, movement("A1", 5)).unwrap();
        assert_eq!(record.timestamp.unwrap().nanosecond(), 0);

        let workbook = store.load().unwrap();
        let sheet = workbook.worksheet_by_name("Entradas").unwrap();
        let header: Vec<String> = (0..6).map(|col| cell_text(sheet.value_ref_at(0, col))).collect();
        assert_eq!(header, columns::HEADER.map(String::from).to_vec());
        assert_eq!(sheet.get_value("B2").unwrap().as_string(), Some("A1"));
        assert_eq!(sheet.get_value("F2").unwrap().as_number(), Some(5.0));
        // The other log is still absent
        assert!(workbook.worksheet_by_name("Salidas").is_none());
    }

    #[test]
    fn test_read_all_round_trips_appends() {
        let (_dir, store) = empty_store();
        let ledger = WorkbookLedger::new(store);

        let first = ledger.append(MovementKind::Out, movement("A1", 3)).unwrap();
        let second = ledger.append(MovementKind::Out, movement("B2", 7)).unwrap();

        assert_eq!(ledger.read_all(MovementKind::Out).unwrap(), vec![first, second]);
        assert!(ledger.read_all(MovementKind::In).unwrap().is_empty());
    }

    #[test]
    fn test_append_follows_existing_column_order() {
        let (_dir, store) = empty_store();
        let mut workbook = store.load().unwrap();
        let index = workbook.add_worksheet_with_name("Entradas").unwrap();
        workbook
            .worksheet_mut(index)
            .unwrap()
            .append_row(["Codigo", "Cantidad", "Fecha", "Precio", "Unidades", "Descripcion"])
            .unwrap();
        store.save(&workbook).unwrap();

        let ledger = WorkbookLedger::new(store.clone());
        ledger.append(MovementKind::In, movement("Z9", 2)).unwrap();

        let workbook = store.load().unwrap();
        let sheet = workbook.worksheet_by_name("Entradas").unwrap();
        assert_eq!(sheet.get_value("A2").unwrap().as_string(), Some("Z9"));
        assert_eq!(sheet.get_value("B2").unwrap().as_number(), Some(2.0));
        assert_eq!(ledger.read_all(MovementKind::In).unwrap()[0].code, "Z9");
    }

    #[test]
    fn test_read_hand_edited_rows() {
        let (_dir, store) = empty_store();
        let mut workbook = store.load().unwrap();
        let index = workbook.add_worksheet_with_name("Salidas").unwrap();
        let sheet = workbook.worksheet_mut(index).unwrap();
        sheet.append_row(columns::HEADER).unwrap();
        sheet
            .append_row([
                CellValue::Number(45352.5),
                CellValue::Number(1001.0),
                "Brocha".into(),
                "Pieza".into(),
                "gratis".into(),
                "4".into(),
            ])
            .unwrap();
        sheet
            .append_row([
                "sin fecha".into(),
                "B2".into(),
                "Lija".into(),
                "Pieza".into(),
                CellValue::Number(3.5),
                CellValue::Number(1.5),
            ])
            .unwrap();
        store.save(&workbook).unwrap();

        let records = WorkbookLedger::new(store).read_all(MovementKind::Out).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp_text(), "2024-03-01 12:00:00");
        assert_eq!(records[0].code, "1001");
        assert_eq!(records[0].final_price, Decimal::ZERO);
        assert_eq!(records[0].quantity, 4);
        assert_eq!(records[1].timestamp, None);
        assert_eq!(records[1].final_price, Decimal::new(35, 1));
        assert_eq!(records[1].quantity, 0);
    }

    #[test]
    fn test_log_missing_a_column() {
        let (_dir, store) = empty_store();
        let mut workbook = store.load().unwrap();
        let index = workbook.add_worksheet_with_name("Entradas").unwrap();
        workbook
            .worksheet_mut(index)
            .unwrap()
            .append_row(["Fecha", "Codigo"])
            .unwrap();
        store.save(&workbook).unwrap();

        let err = WorkbookLedger::new(store).read_all(MovementKind::In).unwrap_err();
        assert!(matches!(err, crate::error::Error::MissingColumn { ref column, .. } if column == "Descripcion"));
    }

    #[test]
    fn test_memory_ledger() {
        let ledger = MemoryLedger::new();
        let record = ledger.append(MovementKind::In, movement("A1", 1)).unwrap();
        assert_eq!(ledger.read_all(MovementKind::In).unwrap(), vec![record]);
        assert!(ledger.read_all(MovementKind::Out).unwrap().is_empty());
    }

    #[test]
    fn test_new_movement_copies_selection() {
        let item = CatalogItem::new("A1", "Pintura Azul", "Litro").with_price(Decimal::new(1050, 2));
        let movement = NewMovement::from_item(&item, 3);
        assert_eq!(movement.final_price, Decimal::new(1050, 2));
        assert_eq!(movement.quantity, 3);
    }
}
