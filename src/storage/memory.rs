//! In-memory record store
//!
//! Same contract as the PostgreSQL backend (sequential ids from 1, ordered
//! reads, all-or-nothing corrections). Not durable; data is lost on drop.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

use super::{checked_table_name, RecordStore};
use crate::error::PipelineError;
use crate::types::{Correction, Record, StoredRecord};

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<StoredRecord>,
    last_id: i64,
}

/// In-memory store for testing and dry runs
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: HashMap<String, MemoryTable>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rows of `table` (empty if it was never written).
    pub fn rows(&self, table: &str) -> &[StoredRecord] {
        self.tables
            .get(table)
            .map(|t| t.rows.as_slice())
            .unwrap_or_default()
    }

    fn table_mut(&mut self, table: &str) -> Result<&mut MemoryTable, PipelineError> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| PipelineError::Persistence(format!("table '{table}' does not exist")))
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn append(&mut self, table: &str, records: &[Record]) -> Result<Vec<i64>, PipelineError> {
        let table = checked_table_name(table)?;
        let t = self.tables.entry(table.to_string()).or_default();

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            t.last_id += 1;
            t.rows.push(StoredRecord::new(t.last_id, record.clone()));
            ids.push(t.last_id);
        }
        debug!(table, rows = ids.len(), "Appended records in memory");
        Ok(ids)
    }

    async fn fetch_all(&mut self, table: &str) -> Result<Vec<StoredRecord>, PipelineError> {
        let table = checked_table_name(table)?;
        Ok(self.table_mut(table)?.rows.clone())
    }

    async fn apply_corrections(
        &mut self,
        table: &str,
        corrections: &[Correction],
    ) -> Result<usize, PipelineError> {
        let table = checked_table_name(table)?;
        let t = self.table_mut(table)?;

        // Stage on a copy so a failing id leaves the table untouched.
        let mut staged = t.rows.clone();
        for c in corrections {
            let row = staged
                .iter_mut()
                .find(|r| r.id == c.id)
                .ok_or_else(|| PipelineError::Correction {
                    id: c.id,
                    message: "no row with this id".to_string(),
                })?;
            row.record.actual_revenue = c.corrected;
        }
        t.rows = staged;
        Ok(corrections.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(revenue: f64) -> Record {
        Record {
            predicted_demand: 10.0,
            refund_amount: 0.0,
            actual_revenue: revenue,
            created_at: Utc::now(),
        }
    }

    fn correction(id: i64, corrected: f64) -> Correction {
        Correction {
            id,
            previous: 0.0,
            corrected,
            deviation: 1.0,
        }
    }

    #[tokio::test]
    async fn test_ids_sequential_across_appends() {
        let mut store = InMemoryStore::new();
        let first = store.append("predictions", &[record(1.0), record(2.0)]).await.unwrap();
        let second = store.append("predictions", &[record(3.0)]).await.unwrap();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(second, vec![3]);
        assert_eq!(store.fetch_all("predictions").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_table_is_persistence_error() {
        let mut store = InMemoryStore::new();
        assert!(matches!(
            store.fetch_all("predictions").await,
            Err(PipelineError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_corrections_all_or_nothing() {
        let mut store = InMemoryStore::new();
        store.append("predictions", &[record(100.0), record(200.0)]).await.unwrap();

        let result = store
            .apply_corrections("predictions", &[correction(1, 150.0), correction(99, 1.0)])
            .await;
        assert!(matches!(result, Err(PipelineError::Correction { id: 99, .. })));
        assert!((store.rows("predictions")[0].record.actual_revenue - 100.0).abs() < f64::EPSILON);

        let applied = store
            .apply_corrections("predictions", &[correction(2, 180.0)])
            .await
            .unwrap();
        assert_eq!(applied, 1);
        assert!((store.rows("predictions")[1].record.actual_revenue - 180.0).abs() < f64::EPSILON);
    }
}
