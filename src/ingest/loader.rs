//! Tabular file loader
//!
//! Reads a delimited text file (`csv`) or the first worksheet of a
//! spreadsheet (`xlsx`, `xls`, `xlsm`, `ods` via calamine) into a `Table`.
//! The first row is always the header row.

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::path::Path;
use std::str::FromStr;
use tracing::{error, info};

use crate::error::PipelineError;
use crate::types::{Cell, Table};

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

impl FileFormat {
    /// Map a file extension (case-insensitive, without the dot) to a format.
    pub fn from_extension(ext: &str) -> Result<Self, PipelineError> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            // calamine reads macro-enabled and OpenDocument workbooks with
            // the same API, so they ride along with xlsx.
            "xlsx" | "xlsm" | "ods" => Ok(Self::Xlsx),
            "xls" => Ok(Self::Xls),
            _ => Err(PipelineError::UnsupportedFormat {
                extension: ext.to_string(),
            }),
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn is_spreadsheet(self) -> bool {
        matches!(self, Self::Xlsx | Self::Xls)
    }
}

impl FromStr for FileFormat {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim_start_matches('.'))
    }
}

/// Load a tabular file into memory.
///
/// `format` overrides extension-based detection. No partial table is ever
/// returned: any read or parse failure yields `PipelineError::Load`.
pub fn load_table(path: &Path, format: Option<FileFormat>) -> Result<Table, PipelineError> {
    let format = match format {
        Some(f) => f,
        None => FileFormat::from_path(path)?,
    };

    let result = if format.is_spreadsheet() {
        read_spreadsheet(path)
    } else {
        read_csv(path)
    };

    match result {
        Ok(table) => {
            info!(
                path = %path.display(),
                format = ?format,
                rows = table.len(),
                columns = table.columns().len(),
                "Successfully loaded data"
            );
            Ok(table)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Error loading data");
            Err(e)
        }
    }
}

// ============================================================================
// Delimited text
// ============================================================================

fn read_csv(path: &Path) -> Result<Table, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::load(path, e))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::load(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(PipelineError::load(path, "no header row"));
    }

    // Short rows are padded with empty cells by `Table::new`; long rows have
    // no column to land in.
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PipelineError::load(path, e))?;
        if record.len() > headers.len() {
            let line = record.position().map_or(0, csv::Position::line);
            return Err(PipelineError::load(
                path,
                format!(
                    "line {line}: expected {} fields, saw {}",
                    headers.len(),
                    record.len()
                ),
            ));
        }
        rows.push(record.iter().map(Cell::from_text).collect());
    }

    Ok(Table::new(headers, rows))
}

// ============================================================================
// Spreadsheets
// ============================================================================

fn read_spreadsheet(path: &Path) -> Result<Table, PipelineError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| PipelineError::load(path, e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PipelineError::load(path, "workbook has no worksheets"))?
        .map_err(|e| PipelineError::load(path, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(header_name).collect(),
        None => return Err(PipelineError::load(path, "no header row")),
    };

    let body = rows.map(|row| row.iter().map(spreadsheet_cell).collect()).collect();
    Ok(Table::new(headers, body))
}

fn header_name(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn spreadsheet_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Float(v) => Cell::Number(*v),
        Data::Bool(v) => Cell::Bool(*v),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_text(s),
        Data::DateTime(dt) => excel_serial_to_utc(dt.as_f64()).map_or(Cell::Empty, Cell::Timestamp),
    }
}

/// Convert an Excel serial date (days since 1899-12-30, 1900 date system)
/// to a UTC timestamp, rounded to the millisecond.
fn excel_serial_to_utc(serial: f64) -> Option<DateTime<Utc>> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    let naive = epoch.checked_add_signed(Duration::milliseconds(millis))?;
    Some(naive.and_utc())
}
