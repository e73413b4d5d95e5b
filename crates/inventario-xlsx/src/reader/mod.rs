//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::escape::decode_excel_escapes;
use inventario_core::{
    CellAddress, CellError, CellRange, CellValue, DefinedName, NameScope, SharedFormula, Workbook,
    Worksheet, MAX_COLS,
};

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read a workbook from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a workbook from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let (sheet_info, defined_names) = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let mut workbook = Workbook::empty();
        if let Some(stylesheet) = Self::read_stylesheet(&mut archive)? {
            workbook.set_stylesheet(stylesheet);
        }

        // Position in workbook.xml -> position in the model, for sheet-scoped names
        let mut sheet_positions: HashMap<usize, usize> = HashMap::new();

        for (position, (name, r_id)) in sheet_info.iter().enumerate() {
            let Some(path) = sheet_paths.get(r_id) else {
                log::warn!("sheet '{}' has no worksheet relationship ({}), skipped", name, r_id);
                continue;
            };
            let mut worksheet = Worksheet::new(name.as_str());
            Self::read_worksheet(&mut archive, path, &mut worksheet, &shared_strings)?;
            let index = workbook.add_existing_worksheet(worksheet)?;
            sheet_positions.insert(position, index);
        }

        for mut defined in defined_names {
            if let NameScope::Sheet(position) = defined.scope {
                let Some(&index) = sheet_positions.get(&position) else {
                    log::warn!("defined name '{}' belongs to a skipped sheet, dropped", defined.name);
                    continue;
                };
                defined.scope = NameScope::Sheet(index);
            }
            workbook.add_defined_name(defined);
        }

        Ok(workbook)
    }

    /// The stylesheet part, kept as written so style indices stay valid on rewrite
    fn read_stylesheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Option<String>> {
        let mut file = match archive.by_name("xl/styles.xml") {
            Ok(f) => f,
            Err(_) => return Ok(None),
        };
        let mut xml = String::new();
        file.read_to_string(&mut xml)?;
        Ok(Some(xml))
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings), // No shared strings is valid
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));

        let mut buf = Vec::new();
        let mut current_string = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // Phonetic runs (<rPh>) carry a reading hint, not cell text
        let mut in_phonetic = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current_string.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => {
                    strings.push(String::new());
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current_string));
                        current_string.clear();
                        in_si = false;
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    current_string.push_str(&e.unescape()?);
                }
                Ok(Event::CData(e)) if in_t => {
                    current_string.push_str(&String::from_utf8_lossy(&e));
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    /// Read workbook.xml: sheet names and rIds in tab order, and defined names
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<(Vec<(String, String)>, Vec<DefinedName>)> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();
        let mut names = Vec::new();
        let mut current_name: Option<DefinedName> = None;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    let name = attr_value(&e, b"name");
                    let r_id = attr_value(&e, b"r:id");
                    if let (Some(name), Some(r_id)) = (name, r_id) {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Start(e)) if e.name().as_ref() == b"definedName" => {
                    current_name = Self::start_defined_name(&e);
                }
                Ok(Event::Text(e)) => {
                    if let Some(defined) = current_name.as_mut() {
                        defined.refers_to.push_str(&e.unescape()?);
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"definedName" => {
                    if let Some(defined) = current_name.take() {
                        names.push(defined);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok((sheets, names))
    }

    fn start_defined_name(e: &BytesStart) -> Option<DefinedName> {
        let Some(name) = attr_value(e, b"name") else {
            log::warn!("definedName without a name attribute, skipped");
            return None;
        };
        let scope = match attr_value(e, b"localSheetId").map(|id| id.parse::<usize>()) {
            Some(Ok(position)) => NameScope::Sheet(position),
            Some(Err(_)) => {
                log::warn!("defined name '{}' has an invalid localSheetId, skipped", name);
                return None;
            }
            None => NameScope::Workbook,
        };
        let mut defined = DefinedName::new(name, String::new(), scope);
        defined.hidden = attr_value(e, b"hidden").is_some_and(|v| is_true(&v));
        Some(defined)
    }

    /// Read workbook.xml.rels to get worksheet part paths keyed by rId
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    let rel_type = attr_value(&e, b"Type");

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Targets are relative to xl/ unless absolute
                            let full_path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Read the `<sheetData>` of one worksheet part
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));

        let mut buf = Vec::new();

        // Position tracking for rows/cells that omit their `r` attribute
        let mut current_row: Option<u32> = None;
        let mut next_col: u16 = 0;

        let mut cell: Option<PendingCell> = None;
        let mut text_target: Option<TextTarget> = None;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"row" => {
                        current_row = Some(Self::row_index(&e, current_row)?);
                        next_col = 0;
                    }
                    b"c" => {
                        let pending = Self::start_cell(&e, current_row, next_col)?;
                        next_col = pending.addr.col.saturating_add(1);
                        cell = Some(pending);
                    }
                    b"v" if cell.is_some() => text_target = Some(TextTarget::Value),
                    b"f" => {
                        if let Some(c) = cell.as_mut() {
                            c.start_formula(&e)?;
                            text_target = Some(TextTarget::Formula);
                        }
                    }
                    b"t" if cell.is_some() => text_target = Some(TextTarget::Inline),
                    b"col" => Self::read_column(&e, worksheet)?,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"row" => {
                        current_row = Some(Self::row_index(&e, current_row)?);
                        next_col = 0;
                    }
                    // A value-less cell only carries formatting
                    b"c" => {
                        let pending = Self::start_cell(&e, current_row, next_col)?;
                        next_col = pending.addr.col.saturating_add(1);
                        if let Some(style) = pending.style {
                            worksheet.set_style_at(pending.addr.row, pending.addr.col, style)?;
                        }
                    }
                    // Shared-formula members other than the first have no text
                    b"f" => {
                        if let Some(c) = cell.as_mut() {
                            c.start_formula(&e)?;
                        }
                    }
                    b"col" => Self::read_column(&e, worksheet)?,
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if let (Some(target), Some(c)) = (text_target, cell.as_mut()) {
                        c.push_text(target, &e.unescape()?);
                    }
                }
                Ok(Event::CData(e)) => {
                    if let (Some(target), Some(c)) = (text_target, cell.as_mut()) {
                        c.push_text(target, &String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"v" | b"f" | b"t" => text_target = None,
                    b"c" => {
                        if let Some(pending) = cell.take() {
                            let addr = pending.addr;
                            if let Some(style) = pending.style {
                                worksheet.set_style_at(addr.row, addr.col, style)?;
                            }
                            let value = pending.into_value(shared_strings)?;
                            worksheet.set_cell_value_at(addr.row, addr.col, value)?;
                        }
                    }
                    b"sheetData" => break,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    fn row_index(e: &BytesStart, previous: Option<u32>) -> XlsxResult<u32> {
        match attr_value(e, b"r") {
            Some(r) => {
                let n: u32 = r
                    .parse()
                    .map_err(|_| XlsxError::Parse(format!("Invalid row number: {}", r)))?;
                n.checked_sub(1)
                    .ok_or_else(|| XlsxError::Parse("Row number 0".into()))
            }
            None => Ok(previous.map_or(0, |p| p + 1)),
        }
    }

    fn start_cell(e: &BytesStart, row: Option<u32>, next_col: u16) -> XlsxResult<PendingCell> {
        let addr = match attr_value(e, b"r") {
            Some(r) => CellAddress::parse(&r)?,
            None => CellAddress::new(row.unwrap_or(0), next_col),
        };
        let style = match attr_value(e, b"s") {
            Some(s) => Some(
                s.parse::<u32>()
                    .map_err(|_| XlsxError::Parse(format!("Invalid style index at {}: {}", addr, s)))?,
            ),
            None => None,
        };
        Ok(PendingCell {
            addr,
            cell_type: attr_value(e, b"t"),
            style,
            value: None,
            inline: None,
            formula: None,
            shared: None,
        })
    }

    /// `<col min max width>`: widths apply to every column in `min..=max` (1-based)
    fn read_column(e: &BytesStart, worksheet: &mut Worksheet) -> XlsxResult<()> {
        let bound = |key: &[u8]| attr_value(e, key).and_then(|v| v.parse::<u16>().ok());
        let (Some(min), Some(max)) = (bound(b"min"), bound(b"max")) else {
            log::debug!("<col> without min/max ignored");
            return Ok(());
        };
        let Some(width) = attr_value(e, b"width").and_then(|w| w.parse::<f64>().ok()) else {
            return Ok(());
        };
        for col in min.max(1)..=max.min(MAX_COLS) {
            worksheet.set_column_width(col - 1, width)?;
        }
        Ok(())
    }
}

/// Which element the next text event belongs to
#[derive(Debug, Clone, Copy)]
enum TextTarget {
    Value,
    Formula,
    Inline,
}

/// A `<c>` element collected until its end tag
#[derive(Debug)]
struct PendingCell {
    addr: CellAddress,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    inline: Option<String>,
    formula: Option<String>,
    shared: Option<SharedFormula>,
}

impl PendingCell {
    /// Open the cell's `<f>` element, recording shared-formula membership
    fn start_formula(&mut self, e: &BytesStart) -> XlsxResult<()> {
        self.formula.get_or_insert_with(String::new);
        if attr_value(e, b"t").as_deref() != Some("shared") {
            return Ok(());
        }
        let Some(si) = attr_value(e, b"si") else {
            log::warn!("shared formula at {} has no group index", self.addr);
            return Ok(());
        };
        let index = si
            .parse::<u32>()
            .map_err(|_| XlsxError::Parse(format!("Invalid shared formula index: {}", si)))?;
        let range = attr_value(e, b"ref")
            .map(|r| CellRange::parse(&r))
            .transpose()?;
        self.shared = Some(SharedFormula { index, range });
        Ok(())
    }

    fn push_text(&mut self, target: TextTarget, text: &str) {
        let slot = match target {
            TextTarget::Value => &mut self.value,
            TextTarget::Formula => &mut self.formula,
            TextTarget::Inline => &mut self.inline,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    fn into_value(self, shared_strings: &[String]) -> XlsxResult<CellValue> {
        let cell_type = self.cell_type.as_deref();

        let value = match (cell_type, self.inline, self.value) {
            (Some("inlineStr"), Some(text), _) => CellValue::String(decode_excel_escapes(&text)),
            (Some("inlineStr"), None, _) => CellValue::Empty,
            (_, _, None) => CellValue::Empty,
            (_, _, Some(raw)) => Self::typed_value(cell_type, &raw, self.addr, shared_strings)?,
        };

        let cached = (!value.is_empty()).then_some(value);
        match (self.formula, self.shared) {
            (Some(text), Some(shared)) => Ok(CellValue::shared_formula(text, cached, shared)),
            (Some(text), None) if !text.is_empty() => Ok(CellValue::formula(text, cached)),
            (Some(_), None) => {
                log::debug!("empty formula at {} read as its cached value", self.addr);
                Ok(cached.unwrap_or_default())
            }
            (None, _) => Ok(cached.unwrap_or_default()),
        }
    }

    fn typed_value(
        cell_type: Option<&str>,
        raw: &str,
        addr: CellAddress,
        shared_strings: &[String],
    ) -> XlsxResult<CellValue> {
        Ok(match cell_type {
            Some("s") => {
                let idx: usize = raw.trim().parse().map_err(|_| {
                    XlsxError::Parse(format!("Invalid shared string index: {}", raw))
                })?;
                match shared_strings.get(idx) {
                    Some(s) => CellValue::String(s.clone()),
                    None => {
                        log::warn!(
                            "shared string index {} out of bounds at {}, read as empty",
                            idx,
                            addr
                        );
                        CellValue::Empty
                    }
                }
            }

            Some("b") => CellValue::Boolean(is_true(raw)),

            Some("e") => CellError::parse(raw)
                .map(CellValue::Error)
                .unwrap_or_else(|| CellValue::String(raw.to_string())),

            Some("str") => CellValue::String(decode_excel_escapes(raw)),

            None | Some("n") => match raw.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::String(raw.to_string()),
            },

            // "d" (ISO 8601 date) and anything unknown are kept as text
            Some(other) => {
                log::debug!("cell {} has type '{}', read as text", addr, other);
                CellValue::String(raw.to_string())
            }
        })
    }
}

fn is_true(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|s| s.to_string()))
}
