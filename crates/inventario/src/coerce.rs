//! Typed reads of spreadsheet cells, each with an explicit fallback.

use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use inventario_core::{CellAddress, CellValue, Worksheet};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::error::{Error, ParseError, Result};
use crate::schema::movements::TIMESTAMP_FORMAT;

/// Column positions of a sheet, located by the text of its header row
#[derive(Debug)]
pub(crate) struct Columns<'a> {
    section: &'a str,
    row: u32,
    headers: Vec<(String, u16)>,
}

impl<'a> Columns<'a> {
    /// Read the header row: the first row with a cell reading exactly `anchor`,
    /// else the first non-blank row. Title rows above the header are skipped.
    pub(crate) fn from_header(section: &'a str, sheet: &Worksheet, anchor: &str) -> Self {
        let row = sheet
            .iter_cells()
            .find(|(_, _, value)| cell_text(value) == anchor)
            .or_else(|| sheet.iter_cells().find(|(_, _, value)| !value.is_blank()))
            .map_or(0, |(row, _, _)| row);
        let headers = sheet
            .iter_cells()
            .skip_while(|(r, _, _)| *r < row)
            .take_while(|(r, _, _)| *r == row)
            .map(|(_, col, value)| (cell_text(value), col))
            .collect();
        Self {
            section,
            row,
            headers,
        }
    }

    /// Rows below the header, up to the last row holding a value
    pub(crate) fn data_rows(&self, sheet: &Worksheet) -> RangeInclusive<u32> {
        (self.row + 1)..=sheet.last_row().unwrap_or(0)
    }

    /// Column of the first header equal to `name`
    pub(crate) fn find(&self, name: &str) -> Option<u16> {
        self.headers
            .iter()
            .find(|(header, _)| header == name)
            .map(|&(_, col)| col)
    }

    pub(crate) fn require(&self, name: &str) -> Result<u16> {
        self.find(name).ok_or_else(|| Error::MissingColumn {
            section: self.section.to_string(),
            column: name.to_string(),
        })
    }
}

/// Text shown for a cell; integral numbers have no fraction ("1001", not "1001.0")
pub(crate) fn cell_text(value: &CellValue) -> String {
    value.effective_value().to_string()
}

/// Numeric reading of a cell: numbers, booleans, cached formula results and numeric text.
///
/// `None` for blanks and for anything that does not read as a finite number.
pub(crate) fn cell_decimal(value: &CellValue) -> Option<Decimal> {
    match value.effective_value() {
        CellValue::Number(n) => finite_decimal(*n),
        CellValue::Boolean(b) => Some(Decimal::from(u8::from(*b))),
        CellValue::String(s) => parse_decimal_text(s),
        _ => None,
    }
}

/// Decimal with the digits the float prints as, so 249.9 stays 249.9
fn finite_decimal(n: f64) -> Option<Decimal> {
    if !n.is_finite() {
        return None;
    }
    Decimal::from_str(&n.to_string())
        .ok()
        .or_else(|| Decimal::from_f64(n))
}

fn parse_decimal_text(s: &str) -> Option<Decimal> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    Decimal::from_str(t)
        .or_else(|_| Decimal::from_scientific(t))
        .ok()
        .or_else(|| t.parse::<f64>().ok().and_then(finite_decimal))
}

/// Where a value came from, for [`ParseError`] reports
#[derive(Debug, Clone, Copy)]
pub(crate) struct CellSource<'a> {
    pub section: &'a str,
    pub column: &'a str,
    pub row: u32,
    pub col: u16,
}

impl CellSource<'_> {
    fn parse_error(&self, value: &CellValue, expected: &'static str) -> ParseError {
        ParseError {
            section: self.section.to_string(),
            cell: CellAddress::new(self.row, self.col).to_a1_string(),
            column: self.column.to_string(),
            raw: cell_text(value),
            expected,
        }
    }
}

/// Decimal value of a cell; blanks read as 0, anything unreadable as 0 plus a [`ParseError`]
pub(crate) fn decimal_or_zero(
    value: &CellValue,
    source: CellSource<'_>,
) -> (Decimal, Option<ParseError>) {
    if value.is_blank() {
        return (Decimal::ZERO, None);
    }
    match cell_decimal(value) {
        Some(d) => (d, None),
        None => (Decimal::ZERO, Some(source.parse_error(value, "a number"))),
    }
}

/// Whole, non-negative quantity; unreadable or fractional values read as 0 plus a [`ParseError`]
pub(crate) fn quantity_or_zero(
    value: &CellValue,
    source: CellSource<'_>,
) -> (u64, Option<ParseError>) {
    if value.is_blank() {
        return (0, None);
    }
    match cell_decimal(value)
        .filter(|d| d.fract().is_zero())
        .and_then(|d| d.to_u64())
    {
        Some(q) => (q, None),
        None => (0, Some(source.parse_error(value, "a whole quantity"))),
    }
}

/// Timestamp stored as text in [`TIMESTAMP_FORMAT`] (or ISO `T` form), or as an Excel date serial
pub(crate) fn cell_timestamp(value: &CellValue) -> Option<NaiveDateTime> {
    match value.effective_value() {
        CellValue::String(s) => {
            let s = s.trim();
            NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .ok()
        }
        CellValue::Number(n) => excel_serial_to_datetime(*n),
        _ => None,
    }
}

/// Convert an Excel 1900-system date serial to a date-time, rounded to the second
pub(crate) fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Day 0 is 1899-12-30 once Excel's fictitious 1900-02-29 is accounted for
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round();
    epoch.checked_add_signed(Duration::try_seconds(seconds as i64)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn source() -> CellSource<'static> {
        CellSource {
            section: "Productos VALMEX",
            column: "PF (Precio Final)",
            row: 3,
            col: 3,
        }
    }

    #[test]
    fn test_cell_decimal() {
        assert_eq!(cell_decimal(&CellValue::Number(12.5)), Some(Decimal::new(125, 1)));
        assert_eq!(cell_decimal(&CellValue::string(" 7.25 ")), Some(Decimal::new(725, 2)));
        assert_eq!(cell_decimal(&CellValue::string("1e2")), Some(Decimal::from(100)));
        assert_eq!(cell_decimal(&CellValue::Boolean(true)), Some(Decimal::ONE));
        assert_eq!(cell_decimal(&CellValue::string("$12.00")), None);
        assert_eq!(cell_decimal(&CellValue::string("NaN")), None);
        assert_eq!(cell_decimal(&CellValue::Number(f64::INFINITY)), None);
        assert_eq!(
            cell_decimal(&CellValue::formula("B2*2", Some(CellValue::Number(4.0)))),
            Some(Decimal::from(4))
        );
    }

    #[test]
    fn test_decimal_or_zero_reports_unreadable_values() {
        let (value, issue) = decimal_or_zero(&CellValue::string("consultar"), source());
        assert_eq!(value, Decimal::ZERO);
        let issue = issue.unwrap();
        assert_eq!(issue.cell, "D4");
        assert_eq!(issue.raw, "consultar");

        // Blank is not a parse failure
        assert_eq!(decimal_or_zero(&CellValue::Empty, source()), (Decimal::ZERO, None));
    }

    #[test]
    fn test_quantity_or_zero() {
        assert_eq!(quantity_or_zero(&CellValue::Number(5.0), source()), (5, None));
        assert_eq!(quantity_or_zero(&CellValue::string("12"), source()).0, 12);
        assert!(quantity_or_zero(&CellValue::Number(2.5), source()).1.is_some());
        assert!(quantity_or_zero(&CellValue::Number(-3.0), source()).1.is_some());
    }

    #[test]
    fn test_header_row_below_a_title() {
        let mut sheet = Worksheet::new("Productos VALMEX");
        sheet.set_cell_value("A1", "Lista de precios 2024").unwrap();
        sheet.set_cell_value("B3", "Codigo").unwrap();
        sheet.set_cell_value("C3", "Descripcion").unwrap();
        sheet.set_cell_value("B4", "A1").unwrap();
        sheet.set_cell_value("B6", "A2").unwrap();

        let columns = Columns::from_header("Productos VALMEX", &sheet, "Codigo");
        assert_eq!(columns.find("Codigo"), Some(1));
        assert_eq!(columns.find("Descripcion"), Some(2));
        assert_eq!(columns.find("Lista de precios 2024"), None);
        assert_eq!(columns.data_rows(&sheet), 3..=5);

        // Without the anchor the first non-blank row is the header
        let columns = Columns::from_header("Productos VALMEX", &sheet, "Clave");
        assert_eq!(columns.find("Lista de precios 2024"), Some(0));
        assert!(matches!(
            columns.require("Clave"),
            Err(Error::MissingColumn { ref column, .. }) if column == "Clave"
        ));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&CellValue::Number(1001.0)), "1001");
        assert_eq!(cell_text(&CellValue::string("A-7")), "A-7");
        assert_eq!(cell_text(&CellValue::Empty), "");
    }

    #[test]
    fn test_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(
            cell_timestamp(&CellValue::string("2024-03-01 14:30:00")),
            Some(expected)
        );
        assert_eq!(
            cell_timestamp(&CellValue::string("2024-03-01T14:30:00")),
            Some(expected)
        );
        // 45352 = 2024-03-01, plus 14.5 hours
        assert_eq!(
            cell_timestamp(&CellValue::Number(45352.0 + 14.5 / 24.0)),
            Some(expected)
        );
        assert_eq!(cell_timestamp(&CellValue::string("ayer")), None);
    }
}
