//! Regression metrics and model evaluation

use statrs::statistics::Statistics;

use super::regression::RevenueModel;
use super::split::SplitIndices;
use crate::error::PipelineError;
use crate::types::{ResultRow, StoredRecord};

/// Error metrics over one set of (actual, predicted) pairs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegressionMetrics {
    pub samples: usize,
    pub mse: f64,
    pub rmse: f64,
    /// Coefficient of determination. For a constant target this is 1.0 on a
    /// perfect fit and 0.0 otherwise.
    pub r2: f64,
}

impl RegressionMetrics {
    /// Compute MSE, RMSE and R². `None` when the inputs are empty or differ
    /// in length.
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Option<Self> {
        if actual.is_empty() || actual.len() != predicted.len() {
            return None;
        }

        let ss_res: f64 = actual
            .iter()
            .zip(predicted)
            .map(|(a, p)| (a - p).powi(2))
            .sum();
        let mse = ss_res / actual.len() as f64;

        let constant_target = actual.iter().all(|&a| a == actual[0]);
        let r2 = if constant_target {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            let mean = actual.iter().mean();
            let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
            1.0 - ss_res / ss_tot
        };

        Some(Self {
            samples: actual.len(),
            mse,
            rmse: mse.sqrt(),
            r2,
        })
    }
}

/// Metrics over the full dataset and the held-out partition, plus the
/// per-row predictions for the full dataset.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub full: RegressionMetrics,
    pub test: RegressionMetrics,
    /// One row per stored record, in store order
    pub results: Vec<ResultRow>,
}

/// Predict every stored row and score both the full set and the test split.
pub fn evaluate(
    model: &RevenueModel,
    rows: &[StoredRecord],
    split: &SplitIndices,
) -> Result<Evaluation, PipelineError> {
    let predictions = model.predict(rows);
    let actual: Vec<f64> = rows.iter().map(StoredRecord::target).collect();

    let full = RegressionMetrics::compute(&actual, &predictions).ok_or(
        PipelineError::InsufficientData {
            rows: rows.len(),
            required: 1,
        },
    )?;

    let test_actual: Vec<f64> = split.test.iter().map(|&i| actual[i]).collect();
    let test_predicted: Vec<f64> = split.test.iter().map(|&i| predictions[i]).collect();
    let test = RegressionMetrics::compute(&test_actual, &test_predicted).ok_or(
        PipelineError::InsufficientData {
            rows: split.test.len(),
            required: 1,
        },
    )?;

    let results = rows
        .iter()
        .zip(&predictions)
        .map(|(row, &predicted)| ResultRow {
            id: row.id,
            actual_revenue: row.record.actual_revenue,
            predicted_revenue: predicted,
            refund_amount: row.record.refund_amount,
            predicted_demand: row.record.predicted_demand,
        })
        .collect();

    Ok(Evaluation {
        full,
        test,
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let m = RegressionMetrics::compute(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.r2, 1.0);
        assert_eq!(m.samples, 3);
    }

    #[test]
    fn test_known_values() {
        // residuals 1, -1, 0, 0 -> mse 0.5; mean 2.5, ss_tot 5 -> r2 = 1 - 2/5
        let m = RegressionMetrics::compute(&[1.0, 2.0, 3.0, 4.0], &[0.0, 3.0, 3.0, 4.0]).unwrap();
        assert!((m.mse - 0.5).abs() < 1e-12);
        assert!((m.rmse - 0.5_f64.sqrt()).abs() < 1e-12);
        assert!((m.r2 - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_constant_target() {
        let exact = RegressionMetrics::compute(&[5.0, 5.0], &[5.0, 5.0]).unwrap();
        assert_eq!(exact.r2, 1.0);
        let off = RegressionMetrics::compute(&[5.0, 5.0], &[4.0, 6.0]).unwrap();
        assert_eq!(off.r2, 0.0);
        assert!(off.r2.is_finite());
    }

    #[test]
    fn test_empty_or_mismatched() {
        assert!(RegressionMetrics::compute(&[], &[]).is_none());
        assert!(RegressionMetrics::compute(&[1.0], &[1.0, 2.0]).is_none());
    }
}
