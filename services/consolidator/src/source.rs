//! Source Reader
//!
//! Opens one agency file and returns its raw row-sets:
//! - delimited text with UTF-8 first and a Windows-1252 fallback
//! - spreadsheets through calamine (xlsx, xlsm, xls, ods), one sheet or all
//! - saved HTML pages: the first `<table>`, or a tab-separated text block
//!
//! Every table comes back rectangular; short rows are padded with empty cells.

use calamine::{open_workbook_auto, Data, DataType, Reader};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::ReadError;
use crate::schema::normalize_header;

// =============================================================================
// RAW TABLE
// =============================================================================

/// Untyped rows of cell text, padded to a fixed width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    name: String,
    rows: Vec<Vec<String>>,
    width: usize,
}

impl RawTable {
    pub fn new(name: impl Into<String>, mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Self {
            name: name.into(),
            rows,
            width,
        }
    }

    /// File name, plus `#sheet` for workbooks.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// =============================================================================
// SOURCE KINDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Csv,
    Spreadsheet,
    Html,
    Pdf,
}

impl SourceKind {
    /// Kind implied by a file extension.
    pub fn from_path(path: &Path) -> Option<SourceKind> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(SourceKind::Csv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(SourceKind::Spreadsheet),
            "html" | "htm" => Some(SourceKind::Html),
            "pdf" => Some(SourceKind::Pdf),
            _ => None,
        }
    }

    pub fn is_tabular(self) -> bool {
        !matches!(self, SourceKind::Pdf)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKind::Csv => "csv",
            SourceKind::Spreadsheet => "spreadsheet",
            SourceKind::Html => "html",
            SourceKind::Pdf => "pdf",
        })
    }
}

/// Which sheets of a workbook to read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SheetSelector {
    #[default]
    First,
    Named(String),
    All,
}

impl SheetSelector {
    /// `"*"` selects every sheet, anything else names one.
    pub fn parse(text: &str) -> SheetSelector {
        match text.trim() {
            "" => SheetSelector::First,
            "*" => SheetSelector::All,
            name => SheetSelector::Named(name.to_string()),
        }
    }
}

/// Read a source file into zero or more raw tables.
pub fn read_source(
    path: &Path,
    kind: SourceKind,
    sheet: &SheetSelector,
) -> Result<Vec<RawTable>, ReadError> {
    if !path.is_file() {
        return Err(ReadError::FileNotFound(path.to_path_buf()));
    }
    let name = file_label(path);
    match kind {
        SourceKind::Csv => {
            let text = decode_text(&read_bytes(path)?, path)?;
            Ok(vec![parse_delimited(&text, &name)])
        }
        SourceKind::Spreadsheet => read_workbook(path, sheet),
        SourceKind::Html => {
            let text = decode_text(&read_bytes(path)?, path)?;
            Ok(vec![parse_html(&text, &name)
                .ok_or_else(|| ReadError::NoTableFound(path.to_path_buf()))?])
        }
        SourceKind::Pdf => Err(ReadError::Unsupported(path.to_path_buf())),
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ReadError> {
    fs::read(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// =============================================================================
// TEXT DECODING
// =============================================================================

/// Decode file bytes: UTF-8 (BOM stripped), then UTF-16 when a BOM says so,
/// then Windows-1252. The fallback is refused when it produces control
/// characters, which means the bytes are binary or in some other encoding.
pub fn decode_text(bytes: &[u8], path: &Path) -> Result<String, ReadError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if encoding != UTF_8 {
            let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
            if !had_errors {
                debug!(file = %path.display(), encoding = encoding.name(), "decoded by BOM");
                return Ok(text.into_owned());
            }
        }
    }

    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(body) {
        return Ok(text.to_string());
    }

    let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(body);
    if had_errors || text.chars().any(is_disallowed_control) {
        return Err(ReadError::EncodingUnrecoverable {
            path: path.to_path_buf(),
            legacy: WINDOWS_1252.name(),
        });
    }
    warn!(file = %path.display(), "not valid UTF-8, decoded as windows-1252");
    Ok(text.into_owned())
}

fn is_disallowed_control(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

// =============================================================================
// DELIMITED TEXT
// =============================================================================

/// Pick the delimiter that occurs most over the first few non-blank lines.
/// Comma wins ties.
fn sniff_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();
    [b',', b'\t', b';']
        .into_iter()
        .max_by_key(|d| {
            let count: usize = sample.iter().map(|l| l.matches(char::from(*d)).count()).sum();
            (count, *d == b',')
        })
        .unwrap_or(b',')
}

/// Parse delimited text without treating any row as a header.
/// Rows the CSV reader rejects are skipped with a warning.
pub fn parse_delimited(text: &str, name: &str) -> RawTable {
    let delimiter = sniff_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (line_idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => warn!(file = name, line = line_idx + 1, error = %e, "skipping malformed CSV record"),
        }
    }
    RawTable::new(name, rows)
}

// =============================================================================
// SPREADSHEETS
// =============================================================================

/// Cell text as a person would read it in the sheet.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::DateTime(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        Data::Error(e) => e.to_string(),
    }
}

fn read_workbook(path: &Path, selector: &SheetSelector) -> Result<Vec<RawTable>, ReadError> {
    let workbook_err = |source| ReadError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let sheet_names = workbook.sheet_names().to_vec();
    debug!(file = %path.display(), sheets = ?sheet_names, "opened workbook");

    let selected: Vec<String> = match selector {
        SheetSelector::First => sheet_names.first().cloned().into_iter().collect(),
        SheetSelector::All => sheet_names.clone(),
        SheetSelector::Named(wanted) => {
            let exact = sheet_names.iter().find(|n| *n == wanted);
            let loose = || {
                let wanted = normalize_header(wanted);
                sheet_names.iter().find(|n| normalize_header(n) == wanted)
            };
            match exact.or_else(loose) {
                Some(name) => vec![name.clone()],
                None => {
                    return Err(ReadError::SheetNotFound {
                        path: path.to_path_buf(),
                        sheet: wanted.clone(),
                        available: sheet_names,
                    })
                }
            }
        }
    };

    let label = file_label(path);
    let mut tables = Vec::with_capacity(selected.len());
    for sheet in selected {
        let range = workbook.worksheet_range(&sheet).map_err(workbook_err)?;
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        debug!(sheet = %sheet, rows = rows.len(), "read sheet");
        tables.push(RawTable::new(format!("{}#{}", label, sheet), rows));
    }
    Ok(tables)
}

// =============================================================================
// HTML PAGES
// =============================================================================

static TABLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table").expect("table selector is valid"));
static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("row selector is valid"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, td").expect("cell selector is valid"));

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rows of the first `<table>` in the page, falling back to a tab-separated
/// block (pages saved as text). `None` when neither is present.
pub fn parse_html(text: &str, name: &str) -> Option<RawTable> {
    let document = Html::parse_document(text);
    if let Some(table) = document.select(&TABLE_SELECTOR).next() {
        let rows: Vec<Vec<String>> = table
            .select(&ROW_SELECTOR)
            .map(|tr| {
                tr.select(&CELL_SELECTOR)
                    .map(|cell| collapse_whitespace(&cell.text().collect::<String>()))
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect();
        if !rows.is_empty() {
            return Some(RawTable::new(name, rows));
        }
    }
    parse_tab_block(text).map(|rows| RawTable::new(name, rows))
}

/// Tab-separated block starting at the line that carries a use case name
/// header. Lines with fewer than three non-empty cells are ignored.
fn parse_tab_block(text: &str) -> Option<Vec<Vec<String>>> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines
        .iter()
        .position(|l| l.contains('\t') && normalize_header(l).contains("use case name"))?;

    let rows: Vec<Vec<String>> = lines[start..]
        .iter()
        .filter(|l| l.contains('\t'))
        .map(|l| l.split('\t').map(|c| c.trim().to_string()).collect::<Vec<_>>())
        .filter(|cells| cells.iter().filter(|c| !c.is_empty()).count() >= 3)
        .collect();
    (rows.len() >= 2).then_some(rows)
}
