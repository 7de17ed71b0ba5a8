//! Revenue Pipeline: ingest, regress, correct
//!
//! Two-stage batch pipeline over a relational table of revenue records.
//!
//! ## Architecture
//!
//! - **Ingest**: Load CSV/spreadsheet files, normalize and validate them
//! - **Storage**: `RecordStore` trait with PostgreSQL and in-memory backends
//! - **ML Engine**: Seeded split, OLS regression, metrics, reports, corrections
//! - **Pipeline**: The two stages wired over a `RecordStore`

pub mod config;
pub mod error;
pub mod types;
pub mod ingest;
pub mod storage;
pub mod ml_engine;
pub mod pipeline;

// Re-export configuration
pub use config::PipelineConfig;

// Re-export error types
pub use error::{PipelineError, SchemaProblem};

// Re-export commonly used types
pub use types::{columns, Cell, Correction, Record, ResultRow, StoredRecord, Table};

// Re-export storage
pub use storage::{InMemoryStore, PgRecordStore, RecordStore};

// Re-export stages
pub use pipeline::{ingest_file, push_to_store, train_and_correct, IngestSummary, TrainingReport};
