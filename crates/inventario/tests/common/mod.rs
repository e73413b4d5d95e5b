//! Store fixtures shared by the integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use inventario::prelude::*;
use inventario::{catalog_header, schema};
use inventario_core::{CellValue, Workbook};
use tempfile::TempDir;

/// A store file in a temporary directory, removed on drop
pub struct Fixture {
    _dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    /// A store with the given catalog rows and no movement logs
    pub fn with_catalog(rows: Vec<[CellValue; 5]>) -> Self {
        let mut workbook = Workbook::empty();
        let index = workbook
            .add_worksheet_with_name(schema::catalog::SHEET)
            .unwrap();
        let sheet = workbook.worksheet_mut(index).unwrap();
        sheet.append_row(catalog_header()).unwrap();
        for row in rows {
            sheet.append_row(row).unwrap();
        }
        Self::with_workbook(&workbook)
    }

    pub fn with_workbook(workbook: &Workbook) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(schema::DEFAULT_FILE_NAME);
        Store::new(&path).save(workbook).unwrap();
        Self { _dir: dir, path }
    }

    /// A path in an empty temporary directory
    pub fn missing() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(schema::DEFAULT_FILE_NAME);
        Self { _dir: dir, path }
    }

    pub fn store(&self) -> Store {
        Store::new(&self.path)
    }

    pub fn session(&self) -> Session {
        Session::open(self.store()).unwrap()
    }
}

/// Catalog row `[code, description, unit, price, initial stock]`
pub fn product(code: &str, description: &str, price: f64, stock: f64) -> [CellValue; 5] {
    [
        code.into(),
        description.into(),
        "Pieza".into(),
        price.into(),
        stock.into(),
    ]
}

/// Register `quantity` of `code` through the session, as the operator would
pub fn register(session: &Session, kind: MovementKind, code: &str, quantity: &str) -> MovementRecord {
    let request = RegisterRequest {
        kind,
        selection: session.find(code),
        quantity,
    };
    session.register(request).unwrap()
}
