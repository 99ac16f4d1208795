//! CSV decoding of uploaded spreadsheets.

use crate::error::{PipelineError, Result};
use std::collections::HashMap;

/// A decoded table: normalized header names and one map per data row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    /// Cells keyed by header. Cells missing from a short row are absent.
    pub rows: Vec<HashMap<String, String>>,
}

/// Pick the delimiter that occurs most often in the header line.
pub fn detect_delimiter(header_line: &str) -> char {
    [',', ';', '\t', '|']
        .iter()
        .copied()
        .max_by_key(|&d| (header_line.matches(d).count(), d == ','))
        .filter(|&d| header_line.contains(d))
        .unwrap_or(',')
}

/// Trim a header cell, drop surrounding quotes and turn non-breaking spaces
/// into plain ones.
pub fn normalize_cell(cell: &str) -> String {
    let s = cell.trim();
    let s = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(s);
    s.replace('\u{00A0}', " ").trim().to_string()
}

/// Decode CSV bytes into a `Dataset`.
///
/// The first line is the header. Rows whose cells are all blank are skipped.
pub fn decode_csv(bytes: &[u8]) -> Result<Dataset> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let first_line = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    let header_line = std::str::from_utf8(first_line)
        .map_err(|_| PipelineError::Decode("header is not valid UTF-8".to_string()))?;
    if header_line.trim().is_empty() {
        return Err(PipelineError::Decode("missing header row".to_string()));
    }
    let delimiter = detect_delimiter(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_cell).collect();
    if headers.iter().any(String::is_empty) {
        return Err(PipelineError::Decode("header cells must not be empty".to_string()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row = HashMap::with_capacity(headers.len());
        for (header, cell) in headers.iter().zip(record.iter()) {
            row.entry(header.clone()).or_insert_with(|| cell.to_string());
        }
        rows.push(row);
    }

    Ok(Dataset { headers, rows })
}
