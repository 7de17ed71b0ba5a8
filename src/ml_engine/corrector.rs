//! Deviation-based correction planning
//!
//! A stored `actual_revenue` is replaced by the model's prediction when the
//! relative deviation `|actual − predicted| / actual` is strictly greater
//! than the threshold. Rows with a zero actual have no defined deviation and
//! are skipped.

use tracing::debug;

use crate::types::{Correction, ResultRow};

/// Output of [`plan_corrections`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionPlan {
    pub corrections: Vec<Correction>,
    /// Rows left alone because `actual_revenue` was zero
    pub skipped_zero_actual: usize,
    /// Rows looked at
    pub examined: usize,
}

impl CorrectionPlan {
    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }
}

/// Relative deviation of `predicted` from `actual`, or `None` when `actual`
/// is zero.
pub fn relative_deviation(actual: f64, predicted: f64) -> Option<f64> {
    if actual == 0.0 {
        None
    } else {
        Some((actual - predicted).abs() / actual.abs())
    }
}

/// Pick the rows whose stored value should be overwritten by the prediction.
///
/// Corrected values are clamped at zero so stored revenue stays
/// non-negative.
pub fn plan_corrections(results: &[ResultRow], threshold: f64) -> CorrectionPlan {
    let mut plan = CorrectionPlan {
        examined: results.len(),
        ..CorrectionPlan::default()
    };

    for row in results {
        let Some(deviation) = relative_deviation(row.actual_revenue, row.predicted_revenue) else {
            plan.skipped_zero_actual += 1;
            continue;
        };
        if deviation > threshold {
            plan.corrections.push(Correction {
                id: row.id,
                previous: row.actual_revenue,
                corrected: row.predicted_revenue.max(0.0),
                deviation,
            });
        }
    }

    debug!(
        examined = plan.examined,
        planned = plan.corrections.len(),
        skipped_zero_actual = plan.skipped_zero_actual,
        threshold,
        "Planned corrections"
    );
    plan
}
