//! Record Storage
//!
//! `RecordStore` is the narrow interface both stages use to reach the
//! relational store: bulk append, full read-back, and a transactional batch
//! of corrections. Backends:
//! - `PgRecordStore`: PostgreSQL over a single `sqlx` connection
//! - `InMemoryStore`: process-local store for tests and dry runs

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgRecordStore;

use async_trait::async_trait;

use crate::config::validation::is_valid_table_name;
use crate::error::PipelineError;
use crate::types::{Correction, Record, StoredRecord};

/// Trait for pluggable record storage backends
#[async_trait]
pub trait RecordStore: Send {
    /// Append records to `table`, returning the assigned ids in input order.
    ///
    /// An empty slice writes nothing and returns no ids.
    async fn append(&mut self, table: &str, records: &[Record]) -> Result<Vec<i64>, PipelineError>;

    /// Read every row of `table`, ordered by id.
    async fn fetch_all(&mut self, table: &str) -> Result<Vec<StoredRecord>, PipelineError>;

    /// Replace `actual_revenue` for each correction's id, atomically.
    ///
    /// Either every update is committed or none is. An id that matches no
    /// row fails the batch with `PipelineError::Correction`.
    async fn apply_corrections(
        &mut self,
        table: &str,
        corrections: &[Correction],
    ) -> Result<usize, PipelineError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Reject table names that cannot be safely spliced into SQL.
pub fn checked_table_name(table: &str) -> Result<&str, PipelineError> {
    if is_valid_table_name(table) {
        Ok(table)
    } else {
        Err(PipelineError::Persistence(format!(
            "invalid table name '{table}'"
        )))
    }
}
