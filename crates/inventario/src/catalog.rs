//! Catalog loader
//!
//! Reads the `Productos VALMEX` sheet into typed [`CatalogItem`]s. The two
//! numeric columns are coerced up front; a cell that does not read as a
//! number becomes 0 and is kept as a [`ParseError`] on the [`Catalog`].

use inventario_core::{CellValue, Workbook, Worksheet};
use rust_decimal::Decimal;

use crate::coerce::{cell_text, decimal_or_zero, CellSource, Columns};
use crate::error::{Error, ParseError, Result};
use crate::schema::catalog as columns;
use crate::store::Store;

/// One product of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub code: String,
    pub description: String,
    pub presentation_unit: String,
    /// Rounded to 2 fraction digits
    pub final_price: Decimal,
    pub initial_stock: Decimal,
}

impl CatalogItem {
    pub fn new<S: Into<String>>(code: S, description: S, presentation_unit: S) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            presentation_unit: presentation_unit.into(),
            final_price: Decimal::ZERO,
            initial_stock: Decimal::ZERO,
        }
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.final_price = round_price(price);
        self
    }

    pub fn with_initial_stock(mut self, stock: Decimal) -> Self {
        self.initial_stock = stock;
        self
    }

    /// Case-insensitive substring match on code or description
    fn matches(&self, needle_lower: &str) -> bool {
        self.code.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
    }
}

/// Banker's rounding to cents
fn round_price(price: Decimal) -> Decimal {
    price.round_dp(2)
}

/// In-memory snapshot of the catalog sheet, in sheet order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    parse_errors: Vec<ParseError>,
}

impl Catalog {
    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        Self {
            items,
            parse_errors: Vec::new(),
        }
    }

    /// Build the catalog from the workbook's catalog sheet
    pub fn from_workbook(workbook: &Workbook) -> Result<Self> {
        let sheet = workbook
            .worksheet_by_name(columns::SHEET)
            .ok_or_else(|| Error::MissingSection(columns::SHEET.to_string()))?;
        Self::from_worksheet(sheet)
    }

    fn from_worksheet(sheet: &Worksheet) -> Result<Self> {
        let header = Columns::from_header(columns::SHEET, sheet, columns::CODE);
        let code_col = header.require(columns::CODE)?;
        let description_col = header.require(columns::DESCRIPTION)?;
        let unit_col = header.require(columns::PRESENTATION_UNIT)?;
        let price_col = header.require(columns::FINAL_PRICE)?;
        let (stock_header, stock_col) = [columns::INITIAL_STOCK, columns::INITIAL_STOCK_CORRECTED]
            .into_iter()
            .find_map(|name| header.find(name).map(|col| (name, col)))
            .ok_or_else(|| Error::MissingColumn {
                section: columns::SHEET.to_string(),
                column: columns::INITIAL_STOCK.to_string(),
            })?;

        let mut catalog = Catalog::default();

        for row in header.data_rows(sheet) {
            let cells = [code_col, description_col, unit_col, price_col, stock_col]
                .map(|col| sheet.value_ref_at(row, col));
            if cells.iter().all(|cell| cell.is_blank()) {
                continue;
            }
            let [code, description, unit, price, stock] = cells;

            let source = |column, col| CellSource {
                section: columns::SHEET,
                column,
                row,
                col,
            };
            let (final_price, price_issue) =
                decimal_or_zero(price, source(columns::FINAL_PRICE, price_col));
            let (initial_stock, stock_issue) =
                decimal_or_zero(stock, source(stock_header, stock_col));

            for issue in [price_issue, stock_issue].into_iter().flatten() {
                tracing::warn!("{issue}");
                catalog.parse_errors.push(issue);
            }

            catalog.items.push(CatalogItem {
                code: cell_text(code),
                description: cell_text(description),
                presentation_unit: cell_text(unit),
                final_price: round_price(final_price),
                initial_stock,
            });
        }

        Ok(catalog)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Cells that fell back to 0 while loading
    pub fn parse_errors(&self) -> &[ParseError] {
        &self.parse_errors
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First item with exactly this code
    pub fn find(&self, code: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.code == code)
    }

    /// Items whose code or description contains `filter`, ignoring case.
    ///
    /// An empty filter returns every item, in catalog order.
    pub fn search(&self, filter: &str) -> Vec<&CatalogItem> {
        if filter.is_empty() {
            return self.items.iter().collect();
        }
        let needle = filter.to_lowercase();
        self.items.iter().filter(|item| item.matches(&needle)).collect()
    }
}

/// Load the catalog from the store.
///
/// Fails with [`Error::MissingSource`] before reading anything when the
/// store file is absent.
pub fn load_catalog(store: &Store) -> Result<Catalog> {
    store.ensure_exists()?;
    let workbook = store.load()?;
    let catalog = Catalog::from_workbook(&workbook)?;
    tracing::info!(
        items = catalog.len(),
        parse_errors = catalog.parse_errors().len(),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Header cells for a catalog sheet, in the order the source workbook uses
pub fn catalog_header() -> [CellValue; 5] {
    [
        columns::CODE,
        columns::DESCRIPTION,
        columns::PRESENTATION_UNIT,
        columns::FINAL_PRICE,
        columns::INITIAL_STOCK,
    ]
    .map(CellValue::from)
}
