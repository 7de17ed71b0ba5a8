//! Ingest stage building blocks
//!
//! - `loader`: file → `Table` (CSV via `csv`, spreadsheets via `calamine`)
//! - `cleaner`: `Table` → normalized, validated `Table`

pub mod cleaner;
pub mod loader;

pub use cleaner::{clean, normalize_column_name, CleanStats, Cleaned};
pub use loader::{load_table, FileFormat};
