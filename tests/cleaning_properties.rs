//! Cleaning Properties
//!
//! Invariants the cleaner must hold for any input table: schema errors name
//! the missing column, the drop count matches the rows with unusable
//! values, stored numbers are never negative, and cleaning twice changes
//! nothing. Tables are generated from a fixed seed so failures reproduce.

use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use revenue_pipeline::ingest::{clean, load_table};
use revenue_pipeline::{columns, Cell, PipelineError, SchemaProblem, Table};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn headers() -> Vec<String> {
    ["Predicted Demand", "Refund Amount", "Actual Revenue"]
        .iter()
        .map(|h| (*h).to_string())
        .collect()
}

/// Random numeric cell, flagged with whether it survives coercion.
fn random_cell(rng: &mut StdRng) -> (Cell, bool) {
    match rng.gen_range(0..10) {
        0 => (Cell::from_text("N/A"), false),
        1 => (Cell::Empty, false),
        2 => (Cell::Number(-rng.gen_range(1.0..500.0)), true),
        3 => (Cell::Text(format!("{:.2}", rng.gen_range(0.0..1000.0))), true),
        _ => (Cell::Number(rng.gen_range(0.0..1000.0)), true),
    }
}

/// Generate a table and the number of rows that must survive cleaning.
fn random_table(seed: u64, rows: usize) -> (Table, usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut survivors = 0;
    let body = (0..rows)
        .map(|_| {
            let cells: Vec<(Cell, bool)> = (0..3).map(|_| random_cell(&mut rng)).collect();
            if cells.iter().all(|(_, usable)| *usable) {
                survivors += 1;
            }
            cells.into_iter().map(|(c, _)| c).collect()
        })
        .collect();
    (Table::new(headers(), body), survivors)
}

#[test]
fn drop_count_matches_unusable_rows() {
    for seed in 0..20 {
        let (table, survivors) = random_table(seed, 60);
        let cleaned = clean(table, now()).unwrap();
        assert_eq!(cleaned.table.len(), survivors, "seed {seed}");
        assert_eq!(cleaned.stats.input_rows, 60);
        assert_eq!(cleaned.stats.dropped_rows, 60 - survivors, "seed {seed}");
        assert_eq!(cleaned.stats.kept_rows(), survivors);
    }
}

#[test]
fn stored_values_are_never_negative() {
    for seed in 0..20 {
        let (table, _) = random_table(seed, 60);
        let records = clean(table, now()).unwrap().table.to_records().unwrap();
        for r in &records {
            assert!(r.predicted_demand >= 0.0, "seed {seed}: {r:?}");
            assert!(r.refund_amount >= 0.0, "seed {seed}: {r:?}");
            assert!(r.actual_revenue >= 0.0, "seed {seed}: {r:?}");
            assert_eq!(r.created_at, now());
        }
    }
}

#[test]
fn cleaning_is_idempotent() {
    for seed in 0..10 {
        let (table, _) = random_table(seed, 40);
        let once = clean(table, now()).unwrap();
        let later = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let twice = clean(once.table.clone(), later).unwrap();

        assert_eq!(twice.table, once.table, "seed {seed}");
        assert_eq!(twice.stats.dropped_rows, 0);
        assert_eq!(twice.stats.clamped_values, 0);
        assert_eq!(twice.stats.filled_timestamps, 0);
    }
}

#[test]
fn missing_column_is_named() {
    for missing in columns::REQUIRED_NUMERIC {
        let header: Vec<String> = columns::REQUIRED_NUMERIC
            .iter()
            .filter(|c| **c != missing)
            .map(|c| (*c).to_string())
            .collect();
        let table = Table::new(header, vec![vec![Cell::Number(1.0), Cell::Number(2.0)]]);

        match clean(table, now()) {
            Err(PipelineError::Schema { column, problem }) => {
                assert_eq!(column, missing);
                assert_eq!(problem, SchemaProblem::Missing);
            }
            other => panic!("expected schema error for {missing}, got {other:?}"),
        }
    }
}

#[test]
fn headline_csv_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("revenue.csv");
    std::fs::write(
        &path,
        "Predicted Demand,Refund Amount,Actual Revenue\n100,0,500\n100,0,N/A\n",
    )
    .unwrap();

    let table = load_table(&path, None).unwrap();
    let cleaned = clean(table, now()).unwrap();

    assert_eq!(
        &cleaned.table.columns()[..3],
        &["predicted_demand", "refund_amount", "actual_revenue"]
    );
    assert_eq!(cleaned.stats.dropped_rows, 1);

    let records = cleaned.table.to_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].predicted_demand, 100.0);
    assert_eq!(records[0].refund_amount, 0.0);
    assert_eq!(records[0].actual_revenue, 500.0);
    assert_eq!(records[0].created_at, now());
}

#[test]
fn short_csv_row_is_dropped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("revenue.csv");
    std::fs::write(
        &path,
        "Predicted Demand,Refund Amount,Actual Revenue\n100,0,500\n80,5\n",
    )
    .unwrap();

    let cleaned = clean(load_table(&path, None).unwrap(), now()).unwrap();
    assert_eq!(cleaned.stats.input_rows, 2);
    assert_eq!(cleaned.stats.dropped_rows, 1);

    let records = cleaned.table.to_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].actual_revenue, 500.0);
}
