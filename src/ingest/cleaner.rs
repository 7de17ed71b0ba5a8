//! Data Cleaner
//!
//! Normalizes and validates a freshly loaded table before it may be
//! persisted:
//!
//! 1. Column names: lowercase, spaces → underscores
//! 2. Required numeric columns must exist
//! 3. Numeric columns coerced to `f64` (unparseable → missing)
//! 4. Rows with a missing numeric value dropped
//! 5. `created_at` filled with the processing time where absent
//! 6. Negative numeric values clamped to zero
//!
//! Any failure aborts the whole table. Cleaning an already clean table is a
//! no-op.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashSet;
use tracing::{error, info, warn};

use crate::error::{PipelineError, SchemaProblem};
use crate::types::{columns, Cell, Table};

/// Naive timestamp layouts accepted in a `created_at` column (taken as UTC)
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Counters describing what the cleaner changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub input_rows: usize,
    pub dropped_rows: usize,
    pub clamped_values: usize,
    pub filled_timestamps: usize,
}

impl CleanStats {
    pub fn kept_rows(&self) -> usize {
        self.input_rows - self.dropped_rows
    }
}

/// Output of a successful clean
#[derive(Debug, Clone)]
pub struct Cleaned {
    pub table: Table,
    pub stats: CleanStats,
}

/// Lowercase a column name and replace spaces with underscores.
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Clean a table; `now` fills missing `created_at` values.
pub fn clean(mut table: Table, now: DateTime<Utc>) -> Result<Cleaned, PipelineError> {
    let mut stats = CleanStats {
        input_rows: table.len(),
        ..CleanStats::default()
    };

    table.rename_columns(normalize_column_name);
    validate_schema(&table).inspect_err(|e| error!(error = %e, "Error cleaning data"))?;

    for column in columns::REQUIRED_NUMERIC {
        table.map_column(column, coerce_numeric);
    }

    let numeric_idx: Vec<usize> = columns::REQUIRED_NUMERIC
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();
    table.retain_rows(|row| {
        numeric_idx
            .iter()
            .all(|&i| matches!(row[i], Cell::Number(_)))
    });
    stats.dropped_rows = stats.input_rows - table.len();

    if table.column_index(columns::CREATED_AT).is_none() {
        stats.filled_timestamps = table.len();
        table.push_column(columns::CREATED_AT, Cell::Timestamp(now));
    } else {
        let mut filled = 0;
        table.map_column(columns::CREATED_AT, |cell| {
            coerce_timestamp(cell).map_or_else(
                || {
                    filled += 1;
                    Cell::Timestamp(now)
                },
                Cell::Timestamp,
            )
        });
        stats.filled_timestamps = filled;
        if filled > 0 {
            warn!(rows = filled, "created_at blank or unparseable, using processing time");
        }
    }

    for column in columns::REQUIRED_NUMERIC {
        table.map_column(column, |cell| match cell {
            Cell::Number(v) if *v < 0.0 => {
                stats.clamped_values += 1;
                Cell::Number(0.0)
            }
            other => other.clone(),
        });
    }

    if stats.dropped_rows > 0 {
        warn!(
            dropped = stats.dropped_rows,
            "Dropped rows with missing or non-numeric required values"
        );
    }
    info!(
        input_rows = stats.input_rows,
        kept_rows = stats.kept_rows(),
        clamped = stats.clamped_values,
        "Cleaned data"
    );

    Ok(Cleaned { table, stats })
}

fn validate_schema(table: &Table) -> Result<(), PipelineError> {
    let mut seen = HashSet::new();
    for name in table.columns() {
        if !seen.insert(name.as_str()) {
            return Err(PipelineError::Schema {
                column: name.clone(),
                problem: SchemaProblem::Duplicate,
            });
        }
    }

    for column in columns::REQUIRED_NUMERIC {
        if !seen.contains(column) {
            return Err(PipelineError::missing_column(column));
        }
    }
    Ok(())
}

/// Coerce to a finite number; anything else becomes `Cell::Empty`.
fn coerce_numeric(cell: &Cell) -> Cell {
    let value = match cell {
        Cell::Number(v) => Some(*v),
        Cell::Text(s) => s.trim().parse::<f64>().ok(),
        Cell::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Cell::Empty | Cell::Timestamp(_) => None,
    };
    value.filter(|v| v.is_finite()).map_or(Cell::Empty, Cell::Number)
}

fn coerce_timestamp(cell: &Cell) -> Option<DateTime<Utc>> {
    match cell {
        Cell::Timestamp(ts) => Some(*ts),
        Cell::Text(s) => parse_timestamp(s),
        _ => None,
    }
}

/// Parse the timestamp layouts commonly found in exported revenue files.
///
/// Offsets are honoured; naive values are taken as UTC; a bare date means
/// midnight.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
