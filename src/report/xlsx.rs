//! Minimal single-sheet XLSX writer and reader
//!
//! An XLSX workbook is a zip container of SpreadsheetML parts. Only what a one-sheet report
//! needs is written: inline strings, numbers and booleans, no shared strings or styles.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::CompressionMethod;
use zip::write::FileOptions;

/// Excel refuses sheet names longer than this
pub const MAX_SHEET_NAME_LEN: usize = 31;

const SHEET_PART: &str = "xl/worksheets/sheet1.xml";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

/// One spreadsheet cell
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// Blank cell
    Empty,
    /// Inline string
    Text(String),
    /// Numeric cell, kept in its JSON textual form so no precision is lost
    Number(String),
    /// Boolean cell
    Bool(bool),
}

impl Cell {
    /// Text shown for this cell when read back
    pub fn display(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) | Cell::Number(s) => s.clone(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

/// Write `rows` as the only sheet of a new workbook at `path`
pub fn write_workbook(path: &Path, sheet_name: &str, rows: &[Vec<Cell>]) -> Result<()> {
    let file = File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook_xml(sheet_name)),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        (SHEET_PART, sheet_xml(rows)),
    ];
    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}

/// Read the first sheet of a workbook written by [`write_workbook`] as rows of display text
pub fn read_sheet(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut archive = zip::ZipArchive::new(File::open(path)?)?;
    let mut xml = String::new();
    archive.by_name(SHEET_PART)?.read_to_string(&mut xml)?;

    let row_re = compile(r#"(?s)<row[^>]*>(.*?)</row>"#)?;
    let cell_re = compile(r#"(?s)<c r="([A-Z]+)\d+"([^>]*?)(?:/>|>(.*?)</c>)"#)?;
    let text_re = compile(r#"(?s)<t[^>]*>(.*?)</t>"#)?;
    let value_re = compile(r#"(?s)<v>(.*?)</v>"#)?;

    let mut rows = Vec::new();
    for row in row_re.captures_iter(&xml) {
        let mut cells: Vec<String> = Vec::new();
        for cell in cell_re.captures_iter(&row[1]) {
            let column = column_index(&cell[1]);
            let attrs = &cell[2];
            let inner = cell.get(3).map(|m| m.as_str()).unwrap_or("");

            let text = if attrs.contains(r#"t="inlineStr""#) {
                text_re
                    .captures(inner)
                    .map(|c| unescape(&c[1]))
                    .unwrap_or_default()
            } else {
                let raw = value_re
                    .captures(inner)
                    .map(|c| unescape(&c[1]))
                    .unwrap_or_default();
                if attrs.contains(r#"t="b""#) {
                    (raw == "1").to_string()
                } else {
                    raw
                }
            };

            if cells.len() < column {
                cells.resize(column, String::new());
            }
            cells.push(text);
        }
        rows.push(cells);
    }
    Ok(rows)
}

/// Make `name` acceptable as a sheet name: no `[]:*?/\`, at most 31 characters
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    if cleaned.trim().is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

/// Spreadsheet column letters for a zero-based index (0 → A, 26 → AA)
pub fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn column_index(letters: &str) -> usize {
    letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1))
        .saturating_sub(1)
}

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
        ),
        escape(&sanitize_sheet_name(sheet_name))
    )
}

fn sheet_xml(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::from(concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\n",
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#
    ));

    for (r, row) in rows.iter().enumerate() {
        let row_num = r + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, row_num));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_name(c), row_num);
            match cell {
                Cell::Empty => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t></t></is></c>"#,
                    reference
                )),
                Cell::Text(text) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                    reference,
                    escape(text)
                )),
                Cell::Number(number) => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, number))
                }
                Cell::Bool(value) => xml.push_str(&format!(
                    r#"<c r="{}" t="b"><v>{}</v></c>"#,
                    reference,
                    u8::from(*value)
                )),
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters other than tab/newline are not allowed in XML 1.0
            c if (c as u32) < 0x20 && !matches!(c, '\t' | '\n' | '\r') => {}
            c => out.push(c),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Report(format!("invalid sheet pattern: {}", e)))
}
