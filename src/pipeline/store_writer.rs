//! Stage 1: load, clean and persist

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::PipelineError;
use crate::ingest::{clean, load_table, CleanStats, Cleaned, FileFormat};
use crate::storage::RecordStore;
use crate::types::Table;

/// Outcome of writing one cleaned table to the store
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub stats: CleanStats,
    pub rows_written: usize,
    /// Store ids of the written rows, in table order
    pub ids: Vec<i64>,
}

/// Clean `table` and append the surviving rows to `table_name`.
///
/// Cleaning always runs first, so a table that fails schema validation
/// never reaches the store.
pub async fn push_to_store<S>(
    store: &mut S,
    table: Table,
    table_name: &str,
    now: DateTime<Utc>,
) -> Result<IngestSummary, PipelineError>
where
    S: RecordStore + ?Sized,
{
    let Cleaned { table, stats } = clean(table, now)?;
    let records = table.to_records()?;
    let ids = store.append(table_name, &records).await?;

    info!(
        table = table_name,
        rows = ids.len(),
        dropped = stats.dropped_rows,
        backend = store.backend_name(),
        "Successfully pushed rows to store"
    );
    Ok(IngestSummary {
        stats,
        rows_written: ids.len(),
        ids,
    })
}

/// Load `path`, then [`push_to_store`].
pub async fn ingest_file<S>(
    store: &mut S,
    path: &Path,
    format: Option<FileFormat>,
    table_name: &str,
    now: DateTime<Utc>,
) -> Result<IngestSummary, PipelineError>
where
    S: RecordStore + ?Sized,
{
    let table = load_table(path, format)?;
    push_to_store(store, table, table_name, now).await
}
