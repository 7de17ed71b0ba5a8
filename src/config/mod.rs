//! Pipeline Configuration Module
//!
//! Configuration is loaded from TOML and passed explicitly to each stage;
//! there is no process-wide config state.
//!
//! ## Loading Order
//!
//! 1. `--config <PATH>` on the command line
//! 2. `REVENUE_CONFIG` environment variable (path to TOML file)
//! 3. `pipeline.toml` in the current working directory
//! 4. Built-in defaults (`config::defaults`)
//!
//! Connection fields can then be overridden from the environment
//! (`REVENUE_DB_HOST`, `REVENUE_DB_PORT`, `REVENUE_DB_NAME`,
//! `REVENUE_DB_USER`, `REVENUE_TABLE`, `DATABASE_URL`). The store password is
//! read from `REVENUE_DB_PASSWORD` (or `PGPASSWORD`) and never from a file.

mod pipeline_config;
pub mod defaults;
pub mod validation;

pub use pipeline_config::*;
