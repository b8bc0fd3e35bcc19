use std::collections::{BTreeMap, BTreeSet};

use super::model::{Cell, RawTable, TYPE_COLUMN};
use crate::error::IngestError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Knobs for reading delimited text.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Field separator byte, `b','` by default.
    pub delimiter: u8,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Parse an uploaded buffer into a [`RawTable`] using default options.
pub fn parse(bytes: &[u8]) -> Result<RawTable, IngestError> {
    parse_with(bytes, ParseOptions::default())
}

/// Parse delimited text with a header row.
///
/// Layout: first record holds the column names, every following record is a
/// data row. Rows shorter than the header leave the trailing columns missing;
/// rows longer than the header are rejected. Blank lines are skipped.
///
/// The `Type` column is categorical: its cells are kept verbatim as text so
/// labels compare exactly. All other cells are typed via [`Cell::guess`].
pub fn parse_with(bytes: &[u8], options: ParseOptions) -> Result<RawTable, IngestError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::MalformedInput(format!("reading header: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if columns.is_empty() {
        return Err(IngestError::MalformedInput(
            "no header row found".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for name in &columns {
        if !seen.insert(name.as_str()) {
            return Err(IngestError::MalformedInput(format!(
                "duplicate column '{name}' in header"
            )));
        }
    }

    let mut rows = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| IngestError::MalformedInput(format!("row {row_no}: {e}")))?;

        if record.len() > columns.len() {
            return Err(IngestError::MalformedInput(format!(
                "row {row_no}: {} fields but header has {}",
                record.len(),
                columns.len()
            )));
        }

        let mut row = BTreeMap::new();
        for (col_name, value) in columns.iter().zip(record.iter()) {
            row.insert(col_name.clone(), classify(col_name, value));
        }
        rows.push(row);
    }

    log::debug!("parsed {} rows with columns {:?}", rows.len(), columns);

    Ok(RawTable { columns, rows })
}

fn classify(column: &str, value: &str) -> Cell {
    if column == TYPE_COLUMN {
        if value.is_empty() {
            Cell::Missing
        } else {
            Cell::Text(value.to_string())
        }
    } else {
        Cell::guess(value)
    }
}
