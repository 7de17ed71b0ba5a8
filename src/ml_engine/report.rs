//! Evaluation artifacts: results CSV and the actual-vs-predicted plot

use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use super::metrics::RegressionMetrics;
use crate::config::defaults::PLOT_SIZE;
use crate::error::PipelineError;
use crate::types::ResultRow;

/// Header of the results CSV, in column order
pub const RESULTS_HEADER: [&str; 4] = [
    "Actual_Revenue",
    "Predicted_Revenue",
    "Refund_Amount",
    "Predicted_Demand",
];

/// Metric lines shared by stdout, logs and the plot annotation.
pub fn metrics_lines(full: &RegressionMetrics, test: &RegressionMetrics) -> Vec<String> {
    vec![
        "Complete Dataset:".to_string(),
        format!("RMSE: {:.2}", full.rmse),
        format!("R²: {:.2}", full.r2),
        "Test Set:".to_string(),
        format!("RMSE: {:.2}", test.rmse),
        format!("R²: {:.2}", test.r2),
    ]
}

fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir).map_err(|e| {
            PipelineError::Report(format!("cannot create {}: {e}", dir.display()))
        }),
        _ => Ok(()),
    }
}

/// Write one CSV line per result row, in the order given.
pub fn write_results_csv(path: &Path, results: &[ResultRow]) -> Result<(), PipelineError> {
    ensure_parent(path)?;
    let report_err = |e: csv::Error| PipelineError::Report(format!("{}: {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(report_err)?;
    writer.write_record(RESULTS_HEADER).map_err(report_err)?;
    for row in results {
        writer
            .write_record([
                row.actual_revenue.to_string(),
                row.predicted_revenue.to_string(),
                row.refund_amount.to_string(),
                row.predicted_demand.to_string(),
            ])
            .map_err(report_err)?;
    }
    writer
        .flush()
        .map_err(|e| PipelineError::Report(format!("{}: {e}", path.display())))?;

    info!(path = %path.display(), rows = results.len(), "Results saved");
    Ok(())
}

/// Axis range covering every value, padded so points do not sit on the
/// frame.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

/// Render the actual-vs-predicted scatter plot as a PNG.
pub fn render_plot(
    path: &Path,
    results: &[ResultRow],
    full: &RegressionMetrics,
    test: &RegressionMetrics,
) -> Result<(), PipelineError> {
    ensure_parent(path)?;
    draw_plot(path, results, full, test)
        .map_err(|e| PipelineError::Report(format!("{}: {e}", path.display())))?;
    info!(path = %path.display(), "Plot saved");
    Ok(())
}

fn draw_plot(
    path: &Path,
    results: &[ResultRow],
    full: &RegressionMetrics,
    test: &RegressionMetrics,
) -> Result<(), Box<dyn std::error::Error>> {
    let refund_points: Vec<(f64, f64)> = results
        .iter()
        .filter(|r| r.refund_amount > 0.0)
        .map(|r| (r.actual_revenue, r.predicted_demand - r.refund_amount))
        .collect();

    // Perfect prediction line spans actual and predicted only.
    let (line_lo, line_hi) = results
        .iter()
        .flat_map(|r| [r.actual_revenue, r.predicted_revenue])
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    let (x_lo, x_hi) = padded_range(results.iter().map(|r| r.actual_revenue));
    let (y_lo, y_hi) = padded_range(
        results
            .iter()
            .map(|r| r.predicted_revenue)
            .chain(refund_points.iter().map(|p| p.1))
            .chain([line_lo, line_hi]),
    );

    let root = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Actual vs Predicted Revenue (Complete Dataset)",
            ("sans-serif", 24),
        )
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Actual Revenue")
        .y_desc("Predicted Revenue")
        .draw()?;

    chart
        .draw_series(results.iter().map(|r| {
            Circle::new(
                (r.actual_revenue, r.predicted_revenue),
                3,
                BLUE.mix(0.5).filled(),
            )
        }))?
        .label("Actual vs Predicted")
        .legend(|(x, y)| Circle::new((x, y), 4, BLUE.filled()));

    chart
        .draw_series(
            refund_points
                .iter()
                .map(|&p| Circle::new(p, 4, RED.mix(0.7).filled())),
        )?
        .label("Refund Points")
        .legend(|(x, y)| Circle::new((x, y), 4, RED.filled()));

    if line_lo.is_finite() && line_hi.is_finite() {
        chart
            .draw_series(LineSeries::new(
                [(line_lo, line_lo), (line_hi, line_hi)],
                BLACK.stroke_width(2),
            ))?
            .label("Perfect Prediction")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    // Metrics box in the upper-left corner of the plotting area.
    let lines = metrics_lines(full, test);
    let (box_x, box_y) = (100, 50);
    root.draw(&Rectangle::new(
        [(box_x - 8, box_y - 8), (box_x + 170, box_y + 20 * lines.len() as i32)],
        WHITE.mix(0.8).filled(),
    ))?;
    for (i, line) in lines.iter().enumerate() {
        root.draw(&Text::new(
            line.as_str(),
            (box_x, box_y + 20 * i as i32),
            ("sans-serif", 16),
        ))?;
    }

    root.present()?;
    Ok(())
}
