//! Excel workbook decoding for spreadsheet imports

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde_json::{Map, Number, Value};

use super::{FaqRow, rows_from_records};
use crate::{Error, Result};

/// File extensions accepted as Excel workbooks
pub const WORKBOOK_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Whether a file name carries a workbook extension
#[must_use]
pub fn is_workbook_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Parse rows from the first worksheet of an Excel workbook
///
/// The first row holds the headers. Empty cells are left out of a row, so a
/// row without an `Answer` cell is skipped like any other answerless row.
///
/// # Errors
///
/// Returns error if the bytes are not a readable workbook or it has no sheets
pub fn parse_workbook(bytes: &[u8]) -> Result<Vec<FaqRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| Error::Ingest(format!("unreadable workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Ingest("workbook has no worksheets".to_string()))?
        .map_err(|e| Error::Ingest(format!("unreadable worksheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let records: Vec<Map<String, Value>> = rows
        .map(|row| {
            headers
                .iter()
                .zip(row)
                .filter(|(name, _)| !name.is_empty())
                .filter_map(|(name, cell)| cell_value(cell).map(|value| (name.clone(), value)))
                .collect()
        })
        .filter(|record: &Map<String, Value>| !record.is_empty())
        .collect();

    Ok(rows_from_records(&records))
}

/// Convert a cell into the JSON value a row export would carry
fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.trim().is_empty() => None,
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Bool(b) => Some(Value::Bool(*b)),
        Data::Int(n) => Some(Value::Number((*n).into())),
        #[allow(clippy::cast_possible_truncation)]
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            Some(Value::Number((*f as i64).into()))
        }
        Data::Float(f) => Number::from_f64(*f).map(Value::Number),
        other => Some(Value::String(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &[u8] = include_bytes!("../../tests/fixtures/faq.xlsx");

    #[test]
    fn test_workbook_names() {
        assert!(is_workbook_name("faq.xlsx"));
        assert!(is_workbook_name("Legacy FAQ.XLS"));
        assert!(!is_workbook_name("faq.csv"));
        assert!(!is_workbook_name("xlsx"));
    }

    #[test]
    fn test_parse_first_sheet() {
        let rows = parse_workbook(FIXTURE).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            FaqRow {
                category: "Services".to_string(),
                question: "Do you offer hosting?".to_string(),
                answer: "Yes, we offer web hosting and VPS hosting.".to_string(),
            }
        );
        assert_eq!(rows[1].category, super::super::DEFAULT_CATEGORY);
        assert_eq!(rows[1].answer, "Our office is in Mumbai.");
        assert_eq!(rows[2].answer, "42");
        assert!(rows.iter().all(|row| row.category != "Ignored"));
    }

    #[test]
    fn test_garbage_is_an_ingest_error() {
        assert!(matches!(
            parse_workbook(b"definitely not a workbook"),
            Err(Error::Ingest(_))
        ));
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_value(&Data::Empty), None);
        assert_eq!(cell_value(&Data::String("  ".to_string())), None);
        assert_eq!(cell_value(&Data::Float(3.0)), Some(Value::from(3)));
        assert_eq!(cell_value(&Data::Float(2.5)), Some(Value::from(2.5)));
        assert_eq!(cell_value(&Data::Bool(true)), Some(Value::Bool(true)));
    }
}
