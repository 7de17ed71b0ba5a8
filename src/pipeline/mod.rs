//! Pipeline Stages
//!
//! ```text
//! STAGE 1 (ingest): file -> Table -> clean -> Records -> store.append
//! STAGE 2 (train):  store.fetch_all -> split -> fit -> evaluate
//!                   -> results CSV + plot -> plan corrections
//!                   -> store.apply_corrections (unless dry run)
//! ```
//!
//! Both stages take a `RecordStore` so the same code runs against
//! PostgreSQL in production and `InMemoryStore` in tests.

mod store_writer;
mod trainer;

pub use store_writer::{ingest_file, push_to_store, IngestSummary};
pub use trainer::{train_and_correct, TrainingReport};
