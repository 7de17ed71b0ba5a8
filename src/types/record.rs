//! Record types: Record, StoredRecord, ResultRow

use chrono::{DateTime, Utc};

/// Canonical column names after normalization
pub mod columns {
    pub const PREDICTED_DEMAND: &str = "predicted_demand";
    pub const REFUND_AMOUNT: &str = "refund_amount";
    pub const ACTUAL_REVENUE: &str = "actual_revenue";
    pub const CREATED_AT: &str = "created_at";

    /// Numeric columns every row must carry, in validation order
    pub const REQUIRED_NUMERIC: [&str; 3] = [PREDICTED_DEMAND, REFUND_AMOUNT, ACTUAL_REVENUE];
}

/// One validated row of revenue data
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Forecast demand (non-negative)
    pub predicted_demand: f64,
    /// Refunded amount (non-negative)
    pub refund_amount: f64,
    /// Recorded revenue (non-negative); the regression target
    pub actual_revenue: f64,
    /// Source timestamp, or processing time when the source had none
    pub created_at: DateTime<Utc>,
}

/// A record as persisted, with its store-assigned identifier
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: i64,
    pub record: Record,
}

impl StoredRecord {
    pub fn new(id: i64, record: Record) -> Self {
        Self { id, record }
    }

    /// Predictor vector in model order: (predicted_demand, refund_amount)
    pub fn features(&self) -> [f64; 2] {
        [self.record.predicted_demand, self.record.refund_amount]
    }

    pub fn target(&self) -> f64 {
        self.record.actual_revenue
    }
}

/// One line of the evaluation results: the actual value next to the model's
/// prediction for a single stored row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRow {
    pub id: i64,
    pub actual_revenue: f64,
    pub predicted_revenue: f64,
    pub refund_amount: f64,
    pub predicted_demand: f64,
}

/// A planned write-back of the model's prediction over a stored value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correction {
    /// Store identifier of the row to update
    pub id: i64,
    /// Value currently stored in `actual_revenue`
    pub previous: f64,
    /// Model prediction that replaces it
    pub corrected: f64,
    /// |previous − corrected| / previous
    pub deviation: f64,
}
