//! System-wide default constants.
//!
//! Centralises the fixed values of the pipeline. Grouped by stage for easy
//! discovery; each one can be overridden through `PipelineConfig`.

// ============================================================================
// Store
// ============================================================================

/// Destination table for cleaned records.
pub const DEFAULT_TABLE: &str = "predictions";

/// Default PostgreSQL database name.
pub const DEFAULT_DB_NAME: &str = "revenue_analysis";

/// Default PostgreSQL host.
pub const DEFAULT_DB_HOST: &str = "localhost";

/// Default PostgreSQL port.
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default PostgreSQL role.
pub const DEFAULT_DB_USER: &str = "postgres";

/// Rows per multi-row INSERT statement.
///
/// 4 bind parameters per row keeps a chunk far below the 65 535 parameter
/// limit of the Postgres wire protocol.
pub const INSERT_CHUNK_ROWS: usize = 1_000;

/// PostgreSQL truncates identifiers longer than this.
pub const MAX_TABLE_NAME_LEN: usize = 63;

// ============================================================================
// Training
// ============================================================================

/// Fraction of rows held out for the test partition.
pub const TEST_FRACTION: f64 = 0.2;

/// Seed for the train/test shuffle.
pub const SPLIT_SEED: u64 = 42;

/// Minimum stored rows before a split is attempted.
///
/// Two rows is the smallest count that leaves one row on each side.
pub const MIN_TRAINING_ROWS: usize = 2;

// ============================================================================
// Correction
// ============================================================================

/// Relative deviation above which a stored value is replaced (5%).
pub const CORRECTION_THRESHOLD: f64 = 0.05;

// ============================================================================
// Output
// ============================================================================

/// Scatter plot file name.
pub const PLOT_FILE: &str = "revenue_prediction_complete.png";

/// Results table file name.
pub const RESULTS_FILE: &str = "results_complete.csv";

/// Plot size in pixels (width, height).
pub const PLOT_SIZE: (u32, u32) = (1200, 600);
