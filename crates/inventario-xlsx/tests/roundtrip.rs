//! End-to-end tests for the XLSX codec (write -> read, and reading Excel-shaped packages)

use std::io::{Cursor, Write};

use inventario_core::{CellValue, NameScope, SharedFormula, Workbook};
use inventario_xlsx::{XlsxError, XlsxReader, XlsxWriter};
use pretty_assertions::assert_eq;

fn roundtrip(wb: &Workbook) -> Workbook {
    let buf = XlsxWriter::write(wb, Cursor::new(Vec::new())).unwrap().into_inner();
    XlsxReader::read(Cursor::new(buf)).unwrap()
}

/// Sheet order, names and every value type survive a rewrite
#[test]
fn test_roundtrip_values_and_sheet_order() {
    let mut wb = Workbook::empty();
    let catalog = wb.add_worksheet_with_name("Productos VALMEX").unwrap();
    let sheet = wb.worksheet_mut(catalog).unwrap();
    sheet.append_row(["Codigo", "Descripcion", "PF (Precio Final)"]).unwrap();
    sheet
        .append_row([CellValue::from(1001), "Pintura <Azul> & Co".into(), 249.9.into()])
        .unwrap();
    sheet.set_cell_value("D2", true).unwrap();
    sheet
        .set_cell_value("E2", CellValue::formula("C2*2", Some(CellValue::Number(499.8))))
        .unwrap();
    sheet.set_cell_value("F2", "  padded  ").unwrap();
    sheet.set_cell_value("G2", "line\r\nbreak").unwrap();

    wb.add_worksheet_with_name("Entradas").unwrap();

    let wb2 = roundtrip(&wb);
    let names: Vec<&str> = wb2.worksheets().map(|s| s.name()).collect();
    assert_eq!(names, vec!["Productos VALMEX", "Entradas"]);

    let sheet2 = wb2.worksheet_by_name("Productos VALMEX").unwrap();
    assert_eq!(sheet2.get_value("A2").unwrap(), CellValue::Number(1001.0));
    assert_eq!(
        sheet2.get_value("B2").unwrap().as_string(),
        Some("Pintura <Azul> & Co")
    );
    assert_eq!(sheet2.get_value("C2").unwrap().as_number(), Some(249.9));
    assert_eq!(sheet2.get_value("D2").unwrap(), CellValue::Boolean(true));
    let formula = sheet2.get_value("E2").unwrap();
    assert_eq!(formula.formula_text(), Some("C2*2"));
    assert_eq!(formula.as_number(), Some(499.8));
    assert_eq!(sheet2.get_value("F2").unwrap().as_string(), Some("  padded  "));
    assert_eq!(sheet2.get_value("G2").unwrap().as_string(), Some("line\r\nbreak"));

    assert!(wb2.worksheet_by_name("Entradas").unwrap().is_empty());
}

#[test]
fn test_read_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Inventario.xlsx");

    let mut wb = Workbook::new();
    wb.worksheet_mut(0).unwrap().append_row(["a", "b"]).unwrap();
    let bytes = XlsxWriter::write(&wb, Cursor::new(Vec::new())).unwrap().into_inner();
    std::fs::write(&path, bytes).unwrap();

    let wb2 = XlsxReader::read_file(&path).unwrap();
    assert_eq!(wb2.sheet_count(), 1);
    assert_eq!(
        wb2.worksheet(0).unwrap().get_value("B1").unwrap().as_string(),
        Some("b")
    );
}

#[test]
fn test_not_a_package() {
    let err = XlsxReader::read(Cursor::new(b"Codigo,Descripcion\n".to_vec())).unwrap_err();
    assert!(matches!(err, XlsxError::Zip(_)));
}

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="&quot;$&quot;#,##0.00"/></numFmts>
  <fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts>
  <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
  <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
  </cellXfs>
  <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

/// Build a package the way Excel lays it out: shared strings, rich text,
/// rows without explicit cell references, a shared formula group, styled
/// cells, column widths and defined names.
fn excel_shaped_package() -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));

    let parts: [(&str, &str); 6] = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#,
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Productos VALMEX" sheetId="1" r:id="rId7"/></sheets>
  <definedNames>
    <definedName name="Precios">'Productos VALMEX'!$C$2:$C$6</definedName>
    <definedName name="_xlnm.Print_Area" localSheetId="0" hidden="1">'Productos VALMEX'!$A$1:$B$6</definedName>
  </definedNames>
</workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/hoja1.xml"/>
</Relationships>"#,
        ),
        (
            "xl/sharedStrings.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="3" uniqueCount="3">
  <si><t>Codigo</t></si>
  <si><r><rPr><b/></rPr><t xml:space="preserve">Inventario </t></r><r><t>Inical</t></r><rPh><t>x</t></rPh></si>
  <si><t>A_x000D_B</t></si>
</sst>"#,
        ),
        (
            "xl/worksheets/hoja1.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <cols><col min="1" max="1" width="12.7109375" customWidth="1"/><col min="2" max="3" width="40" customWidth="1"/></cols>
  <sheetData>
    <row r="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1" s="1" t="s"><v>1</v></c></row>
    <row><c t="s"><v>2</v></c><c s="3"/><c s="2"><v>12.5</v></c></row>
    <row r="5"><c r="A5"><f t="shared" ref="A5:A6" si="0">C2*2</f><v>25</v></c></row>
    <row r="6"><c r="A6"><f t="shared" si="0"/><v>50</v></c><c r="B6" t="e"><v>#N/A</v></c></row>
  </sheetData>
</worksheet>"#,
        ),
        ("xl/styles.xml", STYLES),
    ];

    for (name, content) in parts {
        zip.start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[test]
fn test_read_excel_shaped_package() {
    let wb = XlsxReader::read(Cursor::new(excel_shaped_package())).unwrap();
    let sheet = wb.worksheet_by_name("Productos VALMEX").unwrap();

    assert_eq!(sheet.get_value("A1").unwrap().as_string(), Some("Codigo"));
    // Rich-text runs are concatenated, phonetic hints dropped
    assert_eq!(
        sheet.get_value("B1").unwrap().as_string(),
        Some("Inventario Inical")
    );
    // Cells without `r` are positioned by order within the row after row 1
    assert_eq!(sheet.get_value("A2").unwrap().as_string(), Some("A\rB"));
    assert!(sheet.get_value("B2").unwrap().is_empty());
    assert_eq!(sheet.get_value("C2").unwrap().as_number(), Some(12.5));

    let master = sheet.get_value("A5").unwrap();
    assert_eq!(master.formula_text(), Some("C2*2"));
    assert_eq!(master.as_number(), Some(25.0));
    let member = sheet.get_value("A6").unwrap();
    assert_eq!(member.as_number(), Some(50.0));
    assert_eq!(
        member.shared_formula_group(),
        Some(&SharedFormula {
            index: 0,
            range: None
        })
    );
    assert_eq!(sheet.get_value("B6").unwrap().to_string(), "#N/A");
}

/// Reading a package and writing it back keeps what the operator set up in
/// Excel: shared formulas, cell formats, column widths and names
#[test]
fn test_rewrite_keeps_formulas_and_formatting() {
    let original = XlsxReader::read(Cursor::new(excel_shaped_package())).unwrap();
    let wb = roundtrip(&original);
    let sheet = wb.worksheet_by_name("Productos VALMEX").unwrap();

    let master = sheet.get_value("A5").unwrap();
    assert_eq!(master.formula_text(), Some("C2*2"));
    assert_eq!(
        master.shared_formula_group().and_then(|g| g.range).map(|r| r.to_string()),
        Some("A5:A6".to_string())
    );
    let member = sheet.get_value("A6").unwrap();
    assert_eq!(member.shared_formula_group().map(|g| g.index), Some(0));
    assert_eq!(member.as_number(), Some(50.0));

    // Style indices, including the one on a cell with no value
    assert_eq!(sheet.style_at(0, 0), Some(1));
    assert_eq!(sheet.style_at(1, 1), Some(3));
    assert!(sheet.get_value("B2").unwrap().is_empty());
    assert_eq!(sheet.style_at(1, 2), Some(2));
    assert_eq!(sheet.style_at(1, 0), None);
    assert_eq!(wb.stylesheet(), Some(STYLES));

    let widths: Vec<(u16, f64)> = sheet
        .custom_column_widths()
        .iter()
        .map(|(&c, &w)| (c, w))
        .collect();
    assert_eq!(widths, vec![(0, 12.7109375), (1, 40.0), (2, 40.0)]);

    let names: Vec<(&str, NameScope, &str, bool)> = wb
        .defined_names()
        .iter()
        .map(|n| (n.name.as_str(), n.scope, n.refers_to.as_str(), n.hidden))
        .collect();
    assert_eq!(
        names,
        vec![
            ("Precios", NameScope::Workbook, "'Productos VALMEX'!$C$2:$C$6", false),
            (
                "_xlnm.Print_Area",
                NameScope::Sheet(0),
                "'Productos VALMEX'!$A$1:$B$6",
                true
            ),
        ]
    );
}

#[test]
fn test_workbook_built_in_memory_gets_default_stylesheet() {
    let mut wb = Workbook::empty();
    let index = wb.add_worksheet_with_name("Entradas").unwrap();
    let sheet = wb.worksheet_mut(index).unwrap();
    sheet.append_row(["Fecha"]).unwrap();
    // No stylesheet to point into: the index is not written
    sheet.set_style_at(0, 0, 9).unwrap();

    let wb2 = roundtrip(&wb);
    let sheet2 = wb2.worksheet_by_name("Entradas").unwrap();
    assert_eq!(sheet2.style_at(0, 0), None);
    assert!(wb2.stylesheet().is_some_and(|xml| xml.contains("<cellXfs count=\"1\">")));
}
