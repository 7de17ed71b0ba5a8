//! Stage 2: train, evaluate, report and correct

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::ml_engine::{
    evaluate, plan_corrections, render_plot, train_test_split, write_results_csv, CorrectionPlan,
    Evaluation, RevenueModel,
};
use crate::storage::RecordStore;
use crate::types::StoredRecord;

/// Everything stage 2 produced
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub model: RevenueModel,
    pub evaluation: Evaluation,
    pub plan: CorrectionPlan,
    /// Corrections written to the store (0 on a dry run)
    pub applied: usize,
    pub results_path: PathBuf,
    /// `None` when plotting is disabled
    pub plot_path: Option<PathBuf>,
}

/// Run stage 2 against `store`.
///
/// With `dry_run` (or `correction.enabled = false`) corrections are planned
/// and reported but not written.
pub async fn train_and_correct<S>(
    store: &mut S,
    config: &PipelineConfig,
    dry_run: bool,
) -> Result<TrainingReport, PipelineError>
where
    S: RecordStore + ?Sized,
{
    let table = config.database.table.as_str();
    let rows = store.fetch_all(table).await?;
    info!(table, rows = rows.len(), backend = store.backend_name(), "Loaded stored records");

    let training = &config.training;
    let split = train_test_split(rows.len(), training.test_fraction, training.seed, training.min_rows)?;
    let train: Vec<&StoredRecord> = split.train.iter().map(|&i| &rows[i]).collect();
    let model = RevenueModel::fit(&train)?;

    let evaluation = evaluate(&model, &rows, &split)?;
    info!(
        rmse = evaluation.full.rmse,
        r2 = evaluation.full.r2,
        samples = evaluation.full.samples,
        "Complete dataset metrics"
    );
    info!(
        rmse = evaluation.test.rmse,
        r2 = evaluation.test.r2,
        samples = evaluation.test.samples,
        "Test set metrics"
    );

    let plot_path = if config.output.plot {
        let path = config.output.plot_path();
        render_plot(&path, &evaluation.results, &evaluation.full, &evaluation.test)?;
        Some(path)
    } else {
        None
    };
    let results_path = config.output.results_path();
    write_results_csv(&results_path, &evaluation.results)?;

    let plan = plan_corrections(&evaluation.results, config.correction.threshold);
    if plan.skipped_zero_actual > 0 {
        warn!(
            rows = plan.skipped_zero_actual,
            "Skipped rows with zero actual revenue (deviation undefined)"
        );
    }

    let write_back = config.correction.enabled && !dry_run;
    let applied = if write_back && !plan.is_empty() {
        let applied = store.apply_corrections(table, &plan.corrections).await?;
        info!(table, corrected = applied, "Store updated with corrected values");
        applied
    } else {
        if !plan.is_empty() {
            info!(
                planned = plan.corrections.len(),
                "Corrections planned but not written (dry run)"
            );
        }
        0
    };

    Ok(TrainingReport {
        rows: rows.len(),
        train_rows: split.train.len(),
        test_rows: split.test.len(),
        model,
        evaluation,
        plan,
        applied,
        results_path,
        plot_path,
    })
}
