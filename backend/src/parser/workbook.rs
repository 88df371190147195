//! Excel workbook reading through calamine.
//!
//! Only the first worksheet is read. Its first row is the header and every
//! cell is carried as trimmed text, the same shape the delimited path yields.

use calamine::{Data, Range, Reader, Xls, Xlsx};
use std::fmt::Display;
use std::io::Cursor;

use super::{build_row, check_headers, ParseResult, SourceFormat};
use crate::error::{SourceError, SourceResult};

/// Parse workbook bytes of the given format.
pub fn parse_workbook(bytes: Vec<u8>, format: SourceFormat) -> SourceResult<ParseResult> {
    let range = match format {
        SourceFormat::Xlsx => first_sheet::<Xlsx<Cursor<Vec<u8>>>>(bytes)?,
        SourceFormat::Xls => first_sheet::<Xls<Cursor<Vec<u8>>>>(bytes)?,
        SourceFormat::Delimited => {
            return Err(SourceError::ParseError("not a workbook".to_string()));
        }
    };
    parse_range(&range, format)
}

fn first_sheet<R>(bytes: Vec<u8>) -> SourceResult<Range<Data>>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: Display,
{
    let mut workbook = R::new(Cursor::new(bytes))
        .map_err(|e| SourceError::ParseError(format!("cannot open workbook: {}", e)))?;

    match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => Ok(range),
        Some(Err(e)) => Err(SourceError::ParseError(format!("cannot read first worksheet: {}", e))),
        None => Err(SourceError::EmptyFile),
    }
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        other => {
            let text = other.to_string();
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
    }
}

fn parse_range(range: &Range<Data>, format: SourceFormat) -> SourceResult<ParseResult> {
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(cells) => cells.iter().map(|c| cell_text(c).unwrap_or_default()).collect(),
        None => return Err(SourceError::EmptyFile),
    };
    check_headers(&headers)?;

    let records = rows
        .filter_map(|cells| build_row(&headers, cells.iter().map(cell_text)))
        .collect();

    Ok(ParseResult {
        records,
        format,
        encoding: "utf-8".to_string(),
        delimiter: ',',
        headers,
    })
}
