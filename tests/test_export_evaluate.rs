//! Integration test: export + evaluation-load round trip

use autoregress::cache::{read_predictions, RunCache, PREDICTIONS_FILE};
use autoregress::config::EngineConfig;
use autoregress::error::AutoRegressError;
use autoregress::evaluate::{EvalOptions, EvaluationLoader};
use autoregress::export::export_run;
use autoregress::worker::{execute, MemorySink, TrainRequest};
use std::io::Write;
use std::path::{Path, PathBuf};

struct Row {
    sqft: f64,
    city: &'static str,
    age: f64,
    price: f64,
}

fn scenario_rows(n: usize) -> Vec<Row> {
    let cities = ["NYC", "LA", "SF"];
    (0..n)
        .map(|i| {
            let sqft = 800.0 + (i as f64) * 4.0;
            let age = (i % 40) as f64;
            let city = cities[i % 3];
            let city_bonus = (i % 3) as f64 * 50.0;
            let price = 50.0 + 0.3 * sqft - 2.0 * age + city_bonus + ((i % 7) as f64) * 0.5;
            Row {
                sqft,
                city,
                age,
                price,
            }
        })
        .collect()
}

fn write_training_csv(path: &Path, rows: &[Row]) {
    let mut file = std::fs::File::create(path).unwrap();
    writeln!(file, "sqft,city,age,price").unwrap();
    for r in rows {
        writeln!(file, "{},{},{},{}", r.sqft, r.city, r.age, r.price).unwrap();
    }
}

/// Train on the scenario data and export the run; returns the bundle dir
/// and the rows used
fn trained_bundle(tmp: &Path) -> (PathBuf, Vec<Row>, PathBuf) {
    let rows = scenario_rows(500);
    let csv = tmp.join("houses.csv");
    write_training_csv(&csv, &rows);

    let request = TrainRequest::new(csv, "price")
        .with_config(EngineConfig::default().with_runs_root(tmp.join("runs")));
    let mut sink = MemorySink::default();
    let summary = execute(&request, &mut sink).unwrap();

    let cache = RunCache::at(tmp.join("runs")).unwrap();
    let bundle_dir = tmp.join("exported");
    export_run(&cache, &summary.run_id, &bundle_dir).unwrap();

    (bundle_dir, rows, summary.run_dir)
}

#[test]
fn test_export_then_evaluate_reproduces_val_predictions() {
    let tmp = tempfile::tempdir().unwrap();
    let (bundle_dir, rows, run_dir) = trained_bundle(tmp.path());

    let val_predictions = read_predictions(&run_dir.join(PREDICTIONS_FILE)).unwrap();
    assert_eq!(val_predictions.len(), 100);

    // Rebuild the validation split as a new CSV, without the target column
    let eval_csv = tmp.path().join("val_only.csv");
    let mut file = std::fs::File::create(&eval_csv).unwrap();
    writeln!(file, "sqft,city,age").unwrap();
    for p in &val_predictions {
        let r = &rows[p.row];
        writeln!(file, "{},{},{}", r.sqft, r.city, r.age).unwrap();
    }
    drop(file);

    let loader = EvaluationLoader::load(&bundle_dir).unwrap();
    let report = loader
        .evaluate(&eval_csv, &EvalOptions::default())
        .unwrap();

    assert_eq!(report.predictions.len(), 100);
    assert!(report.metrics.is_none());
    assert!(report.actuals.is_none());

    for (eval_pred, val_pred) in report.predictions.iter().zip(val_predictions.iter()) {
        assert!(
            (eval_pred - val_pred.predicted).abs() < 1e-6,
            "prediction drifted: {} vs {}",
            eval_pred,
            val_pred.predicted
        );
    }
}

#[test]
fn test_evaluate_with_target_computes_metrics() {
    let tmp = tempfile::tempdir().unwrap();
    let (bundle_dir, rows, _) = trained_bundle(tmp.path());

    let eval_csv = tmp.path().join("with_target.csv");
    write_training_csv(&eval_csv, &rows[..80]);

    let loader = EvaluationLoader::load(&bundle_dir).unwrap();
    let report = loader
        .evaluate(&eval_csv, &EvalOptions::default())
        .unwrap();

    assert_eq!(report.n_rows, 80);
    assert!(!report.truncated);
    let metrics = report.metrics.unwrap();
    assert!(metrics.r2 > 0.9, "r2 = {}", metrics.r2);
    assert_eq!(report.actuals.unwrap().len(), 80);
}

#[test]
fn test_evaluate_row_cap_truncates_with_warning() {
    let tmp = tempfile::tempdir().unwrap();
    let (bundle_dir, rows, _) = trained_bundle(tmp.path());

    let eval_csv = tmp.path().join("big.csv");
    write_training_csv(&eval_csv, &rows[..250]);

    let loader = EvaluationLoader::load(&bundle_dir).unwrap();
    let report = loader
        .evaluate(&eval_csv, &EvalOptions::default())
        .unwrap();

    assert!(report.truncated);
    assert_eq!(report.n_rows, 100);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("evaluating only")));
}

#[test]
fn test_evaluate_missing_column_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let (bundle_dir, rows, _) = trained_bundle(tmp.path());

    // Drop the "age" feature column
    let eval_csv = tmp.path().join("missing_col.csv");
    let mut file = std::fs::File::create(&eval_csv).unwrap();
    writeln!(file, "sqft,city").unwrap();
    for r in &rows[..20] {
        writeln!(file, "{},{}", r.sqft, r.city).unwrap();
    }
    drop(file);

    let loader = EvaluationLoader::load(&bundle_dir).unwrap();
    let err = loader
        .evaluate(&eval_csv, &EvalOptions::default())
        .unwrap_err();

    match err {
        AutoRegressError::SchemaMismatch { missing, .. } => {
            assert_eq!(missing, vec!["age".to_string()]);
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
}

#[test]
fn test_evaluate_extra_column_is_a_warning() {
    let tmp = tempfile::tempdir().unwrap();
    let (bundle_dir, rows, _) = trained_bundle(tmp.path());

    let eval_csv = tmp.path().join("extra_col.csv");
    let mut file = std::fs::File::create(&eval_csv).unwrap();
    writeln!(file, "sqft,city,age,bogus").unwrap();
    for r in &rows[..20] {
        writeln!(file, "{},{},{},1", r.sqft, r.city, r.age).unwrap();
    }
    drop(file);

    let loader = EvaluationLoader::load(&bundle_dir).unwrap();
    let report = loader
        .evaluate(&eval_csv, &EvalOptions::default())
        .unwrap();

    assert_eq!(report.predictions.len(), 20);
    assert!(report.warnings.iter().any(|w| w.contains("bogus")));
}

#[test]
fn test_evaluate_handles_unseen_category() {
    let tmp = tempfile::tempdir().unwrap();
    let (bundle_dir, rows, _) = trained_bundle(tmp.path());

    let eval_csv = tmp.path().join("unseen.csv");
    let mut file = std::fs::File::create(&eval_csv).unwrap();
    writeln!(file, "sqft,city,age").unwrap();
    for r in &rows[..10] {
        writeln!(file, "{},Tokyo,{}", r.sqft, r.age).unwrap();
    }
    drop(file);

    let loader = EvaluationLoader::load(&bundle_dir).unwrap();
    let report = loader
        .evaluate(&eval_csv, &EvalOptions::default())
        .unwrap();

    // Unseen category encodes as all zeros; predictions still come out
    assert_eq!(report.predictions.len(), 10);
    assert!(report.predictions.iter().all(|p| p.is_finite()));
}

#[test]
fn test_eval_outputs_written_when_requested() {
    let tmp = tempfile::tempdir().unwrap();
    let (bundle_dir, rows, _) = trained_bundle(tmp.path());

    let eval_csv = tmp.path().join("scored.csv");
    write_training_csv(&eval_csv, &rows[..30]);

    let out_dir = tmp.path().join("eval_out");
    let loader = EvaluationLoader::load(&bundle_dir).unwrap();
    loader
        .evaluate(
            &eval_csv,
            &EvalOptions {
                max_rows: 100,
                out_dir: Some(out_dir.clone()),
            },
        )
        .unwrap();

    assert!(out_dir.join("eval_metrics.json").exists());
    assert!(out_dir.join("eval_predictions.csv").exists());
}
