//! XLSX writer

use std::fmt::Write as _;
use std::io::{Seek, Write};

use crate::error::XlsxResult;
use crate::escape::{encode_excel_escapes, escape_xml};
use inventario_core::{CellAddress, CellValue, NameScope, SharedFormula, Workbook, Worksheet};

/// Stylesheet for workbooks that were not read from a package
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>
    <fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>
    <borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
    <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
    <cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
    <cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>
</styleSheet>"#;

/// XLSX file writer
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a workbook to a writer, returning the writer once the archive is finished.
    ///
    /// A stylesheet carried by the workbook is written back unchanged, along
    /// with every cell's style index. Without one, cells get the default style.
    pub fn write<W: Write + Seek>(workbook: &Workbook, writer: W) -> XlsxResult<W> {
        let mut zip = zip::ZipWriter::new(writer);

        Self::write_content_types(&mut zip, workbook)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_workbook_xml(&mut zip, workbook)?;
        Self::write_workbook_rels(&mut zip, workbook)?;
        let stylesheet = workbook.stylesheet();
        Self::write_part(&mut zip, "xl/styles.xml", stylesheet.unwrap_or(STYLES_XML))?;

        for (i, sheet) in workbook.worksheets().enumerate() {
            let xml = Self::worksheet_xml(sheet, stylesheet.is_some());
            Self::write_part(&mut zip, &format!("xl/worksheets/sheet{}.xml", i + 1), &xml)?;
        }

        Ok(zip.finish()?)
    }

    fn write_part<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        name: &str,
        content: &str,
    ) -> XlsxResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );

        for i in 0..workbook.sheet_count() {
            let _ = write!(
                content,
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            );
        }

        content.push_str("\n</Types>");
        Self::write_part(zip, "[Content_Types].xml", &content)
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> XlsxResult<()> {
        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;
        Self::write_part(zip, "_rels/.rels", content)
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>"#,
        );

        for (i, sheet) in workbook.worksheets().enumerate() {
            let _ = write!(
                content,
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(sheet.name()),
                i + 1,
                i + 1
            );
        }

        content.push_str("\n    </sheets>");

        if !workbook.defined_names().is_empty() {
            content.push_str("\n    <definedNames>");
            for defined in workbook.defined_names() {
                let _ = write!(content, "\n        <definedName name=\"{}\"", escape_xml(&defined.name));
                if let NameScope::Sheet(index) = defined.scope {
                    let _ = write!(content, " localSheetId=\"{}\"", index);
                }
                if defined.hidden {
                    content.push_str(" hidden=\"1\"");
                }
                let _ = write!(content, ">{}</definedName>", escape_xml(&defined.refers_to));
            }
            content.push_str("\n    </definedNames>");
        }

        content.push_str("\n</workbook>");
        Self::write_part(zip, "xl/workbook.xml", &content)
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        workbook: &Workbook,
    ) -> XlsxResult<()> {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..workbook.sheet_count() {
            let _ = write!(
                content,
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            );
        }

        let _ = write!(
            content,
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#,
            workbook.sheet_count() + 1
        );
        Self::write_part(zip, "xl/_rels/workbook.xml.rels", &content)
    }

    fn worksheet_xml(sheet: &Worksheet, keep_styles: bool) -> String {
        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
        );

        if let Some(range) = sheet.used_range() {
            let _ = write!(content, "\n    <dimension ref=\"A1:{}\"/>", range.end);
        }
        Self::push_columns(&mut content, sheet);
        content.push_str("\n    <sheetData>");

        let mut current_row: Option<u32> = None;
        for (row, col, value, style) in sheet.iter_formatted_cells() {
            if current_row != Some(row) {
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                let _ = write!(content, "\n        <row r=\"{}\">", row + 1);
                current_row = Some(row);
            }

            let cell_ref = CellAddress::new(row, col).to_a1_string();
            let style = style.filter(|_| keep_styles);
            Self::push_cell(&mut content, &cell_ref, value, style);
        }

        if current_row.is_some() {
            content.push_str("\n        </row>");
        }
        content.push_str("\n    </sheetData>\n</worksheet>");
        content
    }

    /// `<cols>`, one `<col>` per run of adjacent columns sharing a width
    fn push_columns(content: &mut String, sheet: &Worksheet) {
        let mut spans: Vec<(u16, u16, f64)> = Vec::new();
        for (&col, &width) in sheet.custom_column_widths() {
            match spans.last_mut() {
                Some((_, last, w)) if *last + 1 == col && *w == width => *last = col,
                _ => spans.push((col, col, width)),
            }
        }
        if spans.is_empty() {
            return;
        }

        content.push_str("\n    <cols>");
        for (first, last, width) in spans {
            let _ = write!(
                content,
                "\n        <col min=\"{}\" max=\"{}\" width=\"{}\" customWidth=\"1\"/>",
                first + 1,
                last + 1,
                width
            );
        }
        content.push_str("\n    </cols>");
    }

    fn push_cell(content: &mut String, cell_ref: &str, value: &CellValue, style: Option<u32>) {
        let s = style.map(|s| format!(" s=\"{}\"", s)).unwrap_or_default();
        match value {
            CellValue::Empty if s.is_empty() => {}
            CellValue::Empty => {
                let _ = write!(content, "\n            <c r=\"{}\"{}/>", cell_ref, s);
            }
            CellValue::Number(n) if !n.is_finite() => {
                log::warn!("non-finite number at {} written as #NUM!", cell_ref);
                let _ = write!(
                    content,
                    "\n            <c r=\"{}\"{} t=\"e\"><v>#NUM!</v></c>",
                    cell_ref, s
                );
            }
            CellValue::Number(n) => {
                let _ = write!(content, "\n            <c r=\"{}\"{}><v>{}</v></c>", cell_ref, s, n);
            }
            CellValue::String(text) => {
                let _ = write!(
                    content,
                    "\n            <c r=\"{}\"{} t=\"inlineStr\"><is>{}</is></c>",
                    cell_ref,
                    s,
                    Self::text_element(text)
                );
            }
            CellValue::Boolean(b) => {
                let _ = write!(
                    content,
                    "\n            <c r=\"{}\"{} t=\"b\"><v>{}</v></c>",
                    cell_ref,
                    s,
                    u8::from(*b)
                );
            }
            CellValue::Error(e) => {
                let _ = write!(
                    content,
                    "\n            <c r=\"{}\"{} t=\"e\"><v>{}</v></c>",
                    cell_ref,
                    s,
                    escape_xml(e.as_str())
                );
            }
            CellValue::Formula {
                text,
                cached_value,
                shared,
            } => {
                let cached_value = cached_value.as_deref().map(CellValue::effective_value);
                let (type_attr, cached) = match cached_value {
                    Some(CellValue::Number(n)) if n.is_finite() => ("", format!("<v>{}</v>", n)),
                    Some(CellValue::String(cached_text)) => (
                        " t=\"str\"",
                        format!("<v>{}</v>", escape_xml(&encode_excel_escapes(cached_text))),
                    ),
                    Some(CellValue::Boolean(b)) => {
                        (" t=\"b\"", format!("<v>{}</v>", u8::from(*b)))
                    }
                    Some(CellValue::Error(e)) => (" t=\"e\"", format!("<v>{}</v>", e.as_str())),
                    _ => ("", String::new()),
                };
                let _ = write!(
                    content,
                    "\n            <c r=\"{}\"{}{}>{}{}</c>",
                    cell_ref,
                    s,
                    type_attr,
                    Self::formula_element(text, shared.as_ref()),
                    cached
                );
            }
        }
    }

    /// `<f>` for a plain formula or a shared-formula group member
    fn formula_element(text: &str, shared: Option<&SharedFormula>) -> String {
        let formula = escape_xml(text.strip_prefix('=').unwrap_or(text));
        let Some(shared) = shared else {
            return format!("<f>{}</f>", formula);
        };
        let range = shared
            .range
            .map(|r| format!(" ref=\"{}\"", r))
            .unwrap_or_default();
        if formula.is_empty() {
            format!("<f t=\"shared\"{} si=\"{}\"/>", range, shared.index)
        } else {
            format!("<f t=\"shared\"{} si=\"{}\">{}</f>", range, shared.index, formula)
        }
    }

    /// `<t>` element for an inline string, preserving edge whitespace
    fn text_element(s: &str) -> String {
        let escaped = escape_xml(&encode_excel_escapes(s));
        if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
            format!("<t xml:space=\"preserve\">{}</t>", escaped)
        } else {
            format!("<t>{}</t>", escaped)
        }
    }
}
