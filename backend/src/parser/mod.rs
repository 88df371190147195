//! Spreadsheet parser with format, encoding and delimiter auto-detection.
//!
//! Converts spreadsheet rows into dynamic [`Row`] maps keyed by header name.
//! Excel workbooks (first worksheet) and delimited text exports are both
//! supported; anything else is rejected before a single row is produced.
//! No household-specific logic here.

mod workbook;

pub use workbook::parse_workbook;

use serde_json::Value;
use std::path::Path;

use crate::error::{SourceError, SourceResult};
use crate::models::Row;

/// Zip container signature (`.xlsx`, `.xlsm`, `.ods`).
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// OLE compound document signature (legacy `.xls`).
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Physical layout of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// CSV, TSV or another delimited text export
    Delimited,
    /// Office Open XML workbook
    Xlsx,
    /// Legacy binary workbook
    Xls,
}

impl SourceFormat {
    /// Detect the format from the leading bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(ZIP_MAGIC) {
            Self::Xlsx
        } else if bytes.starts_with(OLE_MAGIC) {
            Self::Xls
        } else {
            Self::Delimited
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delimited => "delimited",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
        }
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed rows, one map per data line
    pub records: Vec<Row>,
    /// Detected container format
    pub format: SourceFormat,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter (`,` for workbooks)
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// A leading UTF-8 byte order mark is dropped.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Detect the delimiter by counting occurrences in the header line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse delimited text into rows with an explicit delimiter.
///
/// Empty cells become `null`; missing trailing cells are `null` too.
/// Extra cells beyond the header are ignored.
///
/// # Example
/// ```ignore
/// let result = parse_str("Household ID,Household Name\n100001,Smith Family", ',')?;
/// assert_eq!(result.records[0]["Household ID"], "100001");
/// ```
pub fn parse_str(content: &str, delimiter: char) -> SourceResult<ParseResult> {
    parse_with_metadata(content, delimiter, "utf-8".to_string())
}

/// Parse a spreadsheet file with auto-detection of format, encoding and delimiter.
///
/// # Example
/// ```ignore
/// let result = parse_file_auto("/data/household-balance-report.xlsx")?;
/// println!("Format: {}, Rows: {}", result.format.as_str(), result.records.len());
/// ```
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> SourceResult<ParseResult> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SourceError::NotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    parse_bytes_auto(&bytes)
}

/// Parse spreadsheet bytes with auto-detection of format, encoding and delimiter.
///
/// Workbooks are recognized by their container signature. Everything else
/// must be text: NUL bytes are rejected.
pub fn parse_bytes_auto(bytes: &[u8]) -> SourceResult<ParseResult> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(SourceError::EmptyFile);
    }

    let format = SourceFormat::sniff(bytes);
    if format != SourceFormat::Delimited {
        return parse_workbook(bytes.to_vec(), format);
    }

    if let Some(offset) = bytes.iter().position(|b| *b == 0) {
        return Err(SourceError::ParseError(format!(
            "binary content at byte {}: not a spreadsheet export",
            offset
        )));
    }

    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);

    parse_with_metadata(&content, delimiter, encoding)
}

/// Reject blank or garbled header lines.
fn check_headers(headers: &[String]) -> SourceResult<()> {
    if headers.iter().all(|h| h.is_empty()) {
        return Err(SourceError::NoHeaders);
    }
    if let Some(bad) = headers.iter().find(|h| h.chars().any(char::is_control)) {
        return Err(SourceError::ParseError(format!(
            "Line 1: header {:?} contains control characters",
            bad
        )));
    }
    Ok(())
}

/// Build one row from trimmed cell texts. Returns `None` for a line with no
/// content at all.
fn build_row<I>(headers: &[String], cells: I) -> Option<Row>
where
    I: IntoIterator<Item = Option<String>>,
{
    let cells: Vec<Option<String>> = cells.into_iter().collect();
    if cells.iter().all(Option::is_none) {
        return None;
    }

    let mut row = Row::new();
    for (i, header) in headers.iter().enumerate() {
        if header.is_empty() {
            continue;
        }
        let value = match cells.get(i) {
            Some(Some(text)) => Value::String(text.clone()),
            _ => Value::Null,
        };
        row.insert(header.clone(), value);
    }
    Some(row)
}

fn parse_with_metadata(content: &str, delimiter: char, encoding: String) -> SourceResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(SourceError::EmptyFile);
    }

    let delimiter_byte = u8::try_from(delimiter)
        .map_err(|_| SourceError::ParseError(format!("unsupported delimiter '{}'", delimiter)))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter_byte)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SourceError::ParseError(format!("Line 1: cannot read header: {}", e)))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    check_headers(&headers)?;

    let mut records = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2; // +1 for 0-index, +1 for header
        let record = result.map_err(|e| SourceError::ParseError(format!("Line {}: {}", line, e)))?;

        let cells = record
            .iter()
            .map(|cell| (!cell.is_empty()).then(|| cell.to_string()));
        if let Some(row) = build_row(&headers, cells) {
            records.push(row);
        }
    }

    Ok(ParseResult {
        records,
        format: SourceFormat::Delimited,
        encoding,
        delimiter,
        headers,
    })
}
