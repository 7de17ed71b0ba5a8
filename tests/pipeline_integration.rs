//! Pipeline Integration Tests
//!
//! Runs both stages end to end against `InMemoryStore`: file ingest, model
//! training, results CSV, correction planning and write-back. No database
//! or display is needed (plots are disabled).

use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;

use revenue_pipeline::config::PipelineConfig;
use revenue_pipeline::{
    ingest_file, push_to_store, train_and_correct, Cell, InMemoryStore, PipelineError, Record,
    RecordStore, Table,
};

const TABLE: &str = "predictions";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn test_config(output_dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.output.dir = output_dir.to_path_buf();
    config.output.plot = false;
    config
}

fn record(demand: f64, refund: f64, revenue: f64) -> Record {
    Record {
        predicted_demand: demand,
        refund_amount: refund,
        actual_revenue: revenue,
        created_at: now(),
    }
}

fn numeric_table(rows: &[[f64; 3]]) -> Table {
    Table::new(
        vec![
            "Predicted Demand".to_string(),
            "Refund Amount".to_string(),
            "Actual Revenue".to_string(),
        ],
        rows.iter()
            .map(|r| r.iter().map(|v| Cell::Number(*v)).collect())
            .collect(),
    )
}

// ============================================================================
// Stage 1
// ============================================================================

#[tokio::test]
async fn ingest_csv_into_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("revenue.csv");
    std::fs::write(
        &path,
        "Predicted Demand,Refund Amount,Actual Revenue,created_at\n\
         100,0,500,2024-01-15 08:00:00\n\
         80,5,N/A,\n\
         120,-3,610,\n",
    )
    .unwrap();

    let mut store = InMemoryStore::new();
    let summary = ingest_file(&mut store, &path, None, TABLE, now()).await.unwrap();

    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.ids, vec![1, 2]);
    assert_eq!(summary.stats.dropped_rows, 1);
    assert_eq!(summary.stats.clamped_values, 1);

    let stored = store.fetch_all(TABLE).await.unwrap();
    assert_eq!(
        stored[0].record.created_at,
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
    );
    assert_eq!(stored[1].record.refund_amount, 0.0);
    assert_eq!(stored[1].record.created_at, now());
}

#[tokio::test]
async fn schema_error_writes_nothing() {
    let table = Table::new(
        vec!["Predicted Demand".to_string(), "Actual Revenue".to_string()],
        vec![vec![Cell::Number(1.0), Cell::Number(2.0)]],
    );
    let mut store = InMemoryStore::new();

    let result = push_to_store(&mut store, table, TABLE, now()).await;
    assert!(matches!(result, Err(PipelineError::Schema { .. })));
    assert!(store.rows(TABLE).is_empty());
}

#[tokio::test]
async fn unsupported_extension_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("revenue.json");
    std::fs::write(&path, "{}").unwrap();

    let mut store = InMemoryStore::new();
    let result = ingest_file(&mut store, &path, None, TABLE, now()).await;
    assert!(matches!(
        result,
        Err(PipelineError::UnsupportedFormat { ref extension }) if extension == "json"
    ));
}

// ============================================================================
// Stage 2
// ============================================================================

#[tokio::test]
async fn two_rows_yield_exactly_one_correction() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut store = InMemoryStore::new();
    push_to_store(
        &mut store,
        numeric_table(&[[10.0, 0.0, 100.0], [20.0, 0.0, 200.0]]),
        TABLE,
        now(),
    )
    .await
    .unwrap();

    let report = train_and_correct(&mut store, &config, false).await.unwrap();

    assert_eq!(report.rows, 2);
    assert_eq!(report.train_rows, 1);
    assert_eq!(report.test_rows, 1);
    for m in [report.evaluation.full, report.evaluation.test] {
        assert!(m.mse.is_finite());
        assert!(m.rmse.is_finite());
        assert!(m.r2.is_finite());
    }
    assert_eq!(report.plan.corrections.len(), 1);
    assert_eq!(report.applied, 1);
    assert!(report.plot_path.is_none());

    // The single training row defines the prediction for both rows, so
    // after write-back they agree.
    let stored = store.rows(TABLE);
    assert_eq!(
        stored[0].record.actual_revenue,
        stored[1].record.actual_revenue
    );

    let csv = std::fs::read_to_string(&report.results_path).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "Actual_Revenue,Predicted_Revenue,Refund_Amount,Predicted_Demand"
    );
    assert!(lines[1].starts_with("100,"));
    assert!(lines[2].starts_with("200,"));
}

#[tokio::test]
async fn dry_run_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut store = InMemoryStore::new();
    store
        .append(TABLE, &[record(10.0, 0.0, 100.0), record(20.0, 0.0, 200.0)])
        .await
        .unwrap();

    let report = train_and_correct(&mut store, &config, true).await.unwrap();
    assert_eq!(report.plan.corrections.len(), 1);
    assert_eq!(report.applied, 0);

    let revenues: Vec<f64> = store
        .rows(TABLE)
        .iter()
        .map(|r| r.record.actual_revenue)
        .collect();
    assert_eq!(revenues, vec![100.0, 200.0]);
}

#[tokio::test]
async fn disabled_corrections_are_only_planned() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.correction.enabled = false;

    let mut store = InMemoryStore::new();
    store
        .append(TABLE, &[record(10.0, 0.0, 100.0), record(20.0, 0.0, 200.0)])
        .await
        .unwrap();

    let report = train_and_correct(&mut store, &config, false).await.unwrap();
    assert!(!report.plan.is_empty());
    assert_eq!(report.applied, 0);
}

#[tokio::test]
async fn exact_linear_data_needs_no_correction() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    // revenue = 50 + 4·demand − 2·refund, plus one zero-revenue row that
    // also sits on the plane (demand 0, refund 25).
    let mut records: Vec<Record> = (1..=19)
        .map(|i| {
            let demand = f64::from(i) * 10.0;
            let refund = f64::from(i % 5);
            record(demand, refund, 50.0 + 4.0 * demand - 2.0 * refund)
        })
        .collect();
    records.push(record(0.0, 25.0, 0.0));

    let mut store = InMemoryStore::new();
    store.append(TABLE, &records).await.unwrap();

    let report = train_and_correct(&mut store, &config, false).await.unwrap();

    assert!((report.model.intercept() - 50.0).abs() < 1e-6);
    assert!((report.model.coefficients()[0] - 4.0).abs() < 1e-6);
    assert!((report.model.coefficients()[1] + 2.0).abs() < 1e-6);
    assert!(report.evaluation.full.rmse < 1e-6);
    assert!((report.evaluation.full.r2 - 1.0).abs() < 1e-9);
    assert_eq!(report.plan.skipped_zero_actual, 1);
    assert!(report.plan.is_empty());
    assert_eq!(report.applied, 0);
}

#[tokio::test]
async fn same_data_same_seed_same_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.correction.enabled = false;

    let records: Vec<Record> = (0..30)
        .map(|i| {
            let x = f64::from(i);
            record(x * 3.0, (x * 7.0) % 11.0, 20.0 + x * 9.0 + (x * 13.0) % 17.0)
        })
        .collect();

    let mut a = InMemoryStore::new();
    a.append(TABLE, &records).await.unwrap();
    let mut b = InMemoryStore::new();
    b.append(TABLE, &records).await.unwrap();

    let first = train_and_correct(&mut a, &config, false).await.unwrap();
    let second = train_and_correct(&mut b, &config, false).await.unwrap();

    assert_eq!(first.model, second.model);
    assert_eq!(first.evaluation.test, second.evaluation.test);
    assert_eq!(first.plan, second.plan);
}

#[tokio::test]
async fn single_row_is_insufficient() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut store = InMemoryStore::new();
    store.append(TABLE, &[record(10.0, 0.0, 100.0)]).await.unwrap();

    let result = train_and_correct(&mut store, &config, false).await;
    assert!(matches!(
        result,
        Err(PipelineError::InsufficientData { rows: 1, required: 2 })
    ));
    assert!(!config.output.results_path().exists());
}

#[tokio::test]
async fn missing_table_is_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let mut store = InMemoryStore::new();
    let result = train_and_correct(&mut store, &config, false).await;
    assert!(matches!(result, Err(PipelineError::Persistence(_))));
}
