//! Shared data structures for the revenue pipeline
//!
//! - `Table` / `Cell`: loosely typed rows straight out of a CSV or workbook
//! - `Record` / `StoredRecord`: validated rows as they live in the store
//! - `columns`: canonical column names shared by the cleaner and the store

mod record;
mod table;

pub use record::*;
pub use table::*;
