//! Revenue regression model
//!
//! Ordinary least squares with intercept over two predictors
//! (`predicted_demand`, `refund_amount`) against `actual_revenue`, solved by
//! linfa-linear.
//!
//! A predictor that is constant over the training rows carries no
//! information. It is left out of the solve and gets a zero coefficient.
//! With no varying predictor the model is the mean of the training targets.
//! Varying predictors go to the solver even when they are collinear; it
//! still returns a finite least-squares fit, though the split of weight
//! between the collinear columns is arbitrary. Only a solver error or a
//! non-finite coefficient is reported as `ModelFit`.

use linfa::prelude::*;
use linfa_linear::LinearRegression;
use ndarray::{Array1, Array2};
use statrs::statistics::Statistics;
use tracing::debug;

use crate::error::PipelineError;
use crate::types::{columns, StoredRecord};

/// Predictor names in coefficient order
pub const FEATURE_NAMES: [&str; 2] = [columns::PREDICTED_DEMAND, columns::REFUND_AMOUNT];

/// Fitted linear model: `revenue = intercept + Σ coefficient_j · feature_j`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevenueModel {
    intercept: f64,
    coefficients: [f64; 2],
}

impl RevenueModel {
    /// Fit on the given rows.
    pub fn fit(rows: &[&StoredRecord]) -> Result<Self, PipelineError> {
        let features: Vec<[f64; 2]> = rows.iter().map(|r| r.features()).collect();
        let targets: Vec<f64> = rows.iter().map(|r| r.target()).collect();
        Self::fit_arrays(&features, &targets)
    }

    /// Fit on raw feature rows and targets of equal length.
    pub fn fit_arrays(features: &[[f64; 2]], targets: &[f64]) -> Result<Self, PipelineError> {
        if features.is_empty() || features.len() != targets.len() {
            return Err(PipelineError::InsufficientData {
                rows: features.len().min(targets.len()),
                required: 1,
            });
        }

        let varying: Vec<usize> = (0..FEATURE_NAMES.len())
            .filter(|&j| {
                let first = features[0][j];
                features.iter().any(|f| f[j] != first)
            })
            .collect();

        if varying.is_empty() {
            debug!("No predictor varies over the training rows, fitting the mean");
            return Ok(Self {
                intercept: targets.iter().mean(),
                coefficients: [0.0; 2],
            });
        }

        let x = Array2::from_shape_fn((features.len(), varying.len()), |(i, k)| {
            features[i][varying[k]]
        });
        let y = Array1::from(targets.to_vec());
        let dataset = Dataset::new(x, y);

        let fitted = LinearRegression::new()
            .fit(&dataset)
            .map_err(|e| PipelineError::ModelFit(e.to_string()))?;

        let mut coefficients = [0.0; 2];
        for (k, &j) in varying.iter().enumerate() {
            coefficients[j] = fitted.params()[k];
        }
        let model = Self {
            intercept: fitted.intercept(),
            coefficients,
        };

        if !model.intercept.is_finite() || model.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PipelineError::ModelFit(
                "solver produced non-finite coefficients".to_string(),
            ));
        }

        debug!(
            intercept = model.intercept,
            demand_coef = model.coefficients[0],
            refund_coef = model.coefficients[1],
            "Fitted revenue model"
        );
        Ok(model)
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coefficients in `FEATURE_NAMES` order.
    pub fn coefficients(&self) -> [f64; 2] {
        self.coefficients
    }

    pub fn predict_one(&self, features: [f64; 2]) -> f64 {
        self.intercept
            + features
                .iter()
                .zip(self.coefficients.iter())
                .map(|(x, w)| x * w)
                .sum::<f64>()
    }

    pub fn predict(&self, rows: &[StoredRecord]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_one(r.features())).collect()
    }
}
