//! In-memory tabular data: Cell, Table

use chrono::{DateTime, Utc};
use tracing::debug;

use super::record::{columns, Record};
use crate::error::{PipelineError, SchemaProblem};

/// A single loosely typed value as read from an input file
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl Cell {
    /// Build a cell from raw text, mapping blank strings to `Empty`.
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// Ordered rows sharing one set of column names.
///
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create a table, padding short rows with `Cell::Empty` and truncating
    /// long ones so the width invariant holds.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate one column's cells, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Replace every column name with `rename(old)`.
    pub fn rename_columns(&mut self, rename: impl Fn(&str) -> String) {
        for name in &mut self.columns {
            *name = rename(name);
        }
    }

    /// Append a column with the same value in every row.
    pub fn push_column(&mut self, name: &str, fill: Cell) {
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(fill.clone());
        }
    }

    /// Rewrite every cell of one column in place. No-op if the column is absent.
    pub fn map_column(&mut self, name: &str, mut f: impl FnMut(&Cell) -> Cell) {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                row[idx] = f(&row[idx]);
            }
        }
    }

    /// Keep only rows matching the predicate; relative order is preserved.
    pub fn retain_rows(&mut self, keep: impl FnMut(&Vec<Cell>) -> bool) {
        self.rows.retain(keep);
    }

    /// Convert a cleaned table into records.
    ///
    /// Requires the three numeric columns to hold `Cell::Number` and
    /// `created_at` to hold `Cell::Timestamp`; anything else means the table
    /// has not been through the cleaner. Extra columns are ignored.
    pub fn to_records(&self) -> Result<Vec<Record>, PipelineError> {
        let index = |name: &str| {
            self.column_index(name)
                .ok_or_else(|| PipelineError::missing_column(name))
        };
        let demand = index(columns::PREDICTED_DEMAND)?;
        let refund = index(columns::REFUND_AMOUNT)?;
        let revenue = index(columns::ACTUAL_REVENUE)?;
        let created = index(columns::CREATED_AT)?;

        let ignored: Vec<&str> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| ![demand, refund, revenue, created].contains(i))
            .map(|(_, c)| c.as_str())
            .collect();
        if !ignored.is_empty() {
            debug!(columns = ?ignored, "Ignoring columns without a store counterpart");
        }

        let invalid = |column: &str| PipelineError::Schema {
            column: column.to_string(),
            problem: SchemaProblem::InvalidValue,
        };

        self.rows
            .iter()
            .map(|row| {
                Ok(Record {
                    predicted_demand: row[demand]
                        .as_number()
                        .ok_or_else(|| invalid(columns::PREDICTED_DEMAND))?,
                    refund_amount: row[refund]
                        .as_number()
                        .ok_or_else(|| invalid(columns::REFUND_AMOUNT))?,
                    actual_revenue: row[revenue]
                        .as_number()
                        .ok_or_else(|| invalid(columns::ACTUAL_REVENUE))?,
                    created_at: row[created]
                        .as_timestamp()
                        .ok_or_else(|| invalid(columns::CREATED_AT))?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["a".into(), "b".into()],
            vec![
                vec![Cell::Number(1.0), Cell::from_text("x")],
                vec![Cell::Number(2.0)],
            ],
        )
    }

    #[test]
    fn test_short_rows_padded() {
        let t = sample();
        assert_eq!(t.rows()[1], vec![Cell::Number(2.0), Cell::Empty]);
    }

    #[test]
    fn test_from_text_blank_is_empty() {
        assert_eq!(Cell::from_text("   "), Cell::Empty);
        assert_eq!(Cell::from_text(" 12 "), Cell::Text("12".into()));
    }

    #[test]
    fn test_retain_preserves_order() {
        let mut t = Table::new(
            vec!["v".into()],
            (0..5).map(|i| vec![Cell::Number(f64::from(i))]).collect(),
        );
        t.retain_rows(|row| row[0].as_number().is_some_and(|v| v as i64 % 2 == 0));
        let values: Vec<f64> = t.column("v").unwrap().filter_map(Cell::as_number).collect();
        assert_eq!(values, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_to_records_requires_cleaned_cells() {
        let t = Table::new(
            vec![
                "predicted_demand".into(),
                "refund_amount".into(),
                "actual_revenue".into(),
                "created_at".into(),
            ],
            vec![vec![
                Cell::Text("100".into()),
                Cell::Number(0.0),
                Cell::Number(500.0),
                Cell::Timestamp(Utc::now()),
            ]],
        );
        match t.to_records() {
            Err(PipelineError::Schema { column, problem }) => {
                assert_eq!(column, "predicted_demand");
                assert_eq!(problem, SchemaProblem::InvalidValue);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}
