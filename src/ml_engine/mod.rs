//! ML Engine for Revenue Prediction
//!
//! Fits a linear model of `actual_revenue` on `predicted_demand` and
//! `refund_amount`, scores it, writes the evaluation artifacts and plans
//! write-back corrections for rows the model disagrees with.
//!
//! ## Architecture
//! - `split`: Seeded shuffle into train/test indices
//! - `regression`: OLS with intercept (linfa-linear)
//! - `metrics`: MSE / RMSE / R² over the full set and the test split (statrs)
//! - `report`: Results CSV and actual-vs-predicted plot (csv, plotters)
//! - `corrector`: Relative-deviation correction planning

pub mod split;
pub mod regression;
pub mod metrics;
pub mod report;
pub mod corrector;

// Re-export public types
pub use split::{train_test_split, SplitIndices};
pub use regression::RevenueModel;
pub use metrics::{evaluate, Evaluation, RegressionMetrics};
pub use report::{metrics_lines, render_plot, write_results_csv};
pub use corrector::{plan_corrections, CorrectionPlan};
