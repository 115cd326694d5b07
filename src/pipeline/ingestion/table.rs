use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use tracing::debug;

use crate::error::{ReportError, Result};

/// Untyped upload contents: trimmed header names and one string per cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Upload formats, chosen from the object name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Spreadsheet,
}

impl UploadFormat {
    pub fn from_file_name(name: &str) -> Self {
        if name.ends_with(".csv") {
            UploadFormat::Csv
        } else {
            UploadFormat::Spreadsheet
        }
    }
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell text at (row, column); missing trailing cells read as empty
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn push_row(&mut self, mut cells: Vec<String>) {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return;
        }
        if cells.len() < self.headers.len() {
            cells.resize(self.headers.len(), String::new());
        }
        self.rows.push(cells);
    }
}

/// Parse an uploaded object into a [`RawTable`]
pub fn load_table(file_name: &str, bytes: &[u8]) -> Result<RawTable> {
    let table = match UploadFormat::from_file_name(file_name) {
        UploadFormat::Csv => read_csv(bytes)?,
        UploadFormat::Spreadsheet => read_spreadsheet(bytes)?,
    };
    debug!(
        "Loaded {} rows x {} columns from {}",
        table.len(),
        table.headers.len(),
        file_name
    );
    Ok(table)
}

pub fn read_csv(bytes: &[u8]) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let mut table = RawTable {
        headers: rdr.headers()?.iter().map(|h| h.trim().to_string()).collect(),
        rows: Vec::new(),
    };

    for record in rdr.records() {
        let record = record?;
        table.push_row(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(table)
}

/// First worksheet, first row as header
pub fn read_spreadsheet(bytes: &[u8]) -> Result<RawTable> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::Parse("workbook has no worksheets".to_string()))??;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|c| cell_to_string(c).trim().to_string())
            .collect(),
        None => return Ok(RawTable::default()),
    };

    let mut table = RawTable {
        headers,
        rows: Vec::new(),
    };
    for row in rows {
        table.push_row(row.iter().map(cell_to_string).collect());
    }
    Ok(table)
}

/// Render a spreadsheet cell the way the normalizer expects to read it back
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => float_to_string(*f),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => naive.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => float_to_string(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#{:?}", e),
    }
}

/// Integral floats lose the `.0` so mobile numbers and postcodes keep their digits
fn float_to_string(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}
