//! Integration test: full pipeline end-to-end

use boostflow::prelude::*;
use polars::prelude::*;
use std::fs;

#[derive(Default)]
struct MemorySink {
    persisted: Vec<RunArtifacts>,
}

impl ArtifactSink for MemorySink {
    fn persist(&mut self, artifacts: &RunArtifacts) -> Result<()> {
        self.persisted.push(artifacts.clone());
        Ok(())
    }
}

fn quick_config() -> TrainerConfig {
    TrainerConfig {
        num_boost_round: 60,
        min_child_samples: 2,
        num_leaves: 7,
        ..Default::default()
    }
}

/// Two well-separated clusters; every classifier should be perfect here.
fn separable_binary_df(n: usize) -> DataFrame {
    let f1: Vec<f64> = (0..n).map(|i| (i % 2) as f64 * 10.0 + (i / 2) as f64 * 0.01).collect();
    let f2: Vec<f64> = (0..n).map(|i| (i % 2) as f64 * -5.0 + (i / 2) as f64 * 0.02).collect();
    let label: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "benign" } else { "malignant" }).collect();
    df!("f1" => &f1, "f2" => &f2, "label" => &label).unwrap()
}

fn four_class_df(n: usize) -> DataFrame {
    let f1: Vec<f64> = (0..n).map(|i| (i % 4) as f64 * 5.0 + (i / 4) as f64 * 0.01).collect();
    let f2: Vec<f64> = (0..n).map(|i| (i % 4) as f64 * -3.0 + (i / 4) as f64 * 0.015).collect();
    let label: Vec<&str> = (0..n)
        .map(|i| match i % 4 {
            0 => "citron",
            1 => "fig",
            2 => "plum",
            _ => "quince",
        })
        .collect();
    df!("f1" => &f1, "f2" => &f2, "label" => &label).unwrap()
}

#[test]
fn test_scenario_separable_binary_is_perfect() {
    let df = separable_binary_df(200);
    let mut sink = MemorySink::default();
    let run = Pipeline::new(quick_config())
        .run_frame(&df, "label", &mut sink)
        .unwrap();

    assert!((run.metrics.get("accuracy").unwrap() - 1.0).abs() < 1e-12);
    assert!((run.metrics.get("auc").unwrap() - 1.0).abs() < 1e-12);
}

#[test]
fn test_scenario_constant_label_fails_informatively() {
    let f: Vec<f64> = (0..30).map(|i| i as f64).collect();
    let label: Vec<&str> = (0..30).map(|_| "always").collect();
    let df = df!("f" => &f, "label" => &label).unwrap();

    let mut sink = MemorySink::default();
    let err = Pipeline::new(quick_config())
        .run_frame(&df, "label", &mut sink)
        .unwrap_err();

    assert!(matches!(err, BoostflowError::InvalidDatasetError(_)));
    assert!(sink.persisted.is_empty(), "no artifacts on failure");
}

#[test]
fn test_scenario_four_class_reports_per_class_aucs() {
    let df = four_class_df(200);
    let mut sink = MemorySink::default();
    let config = TrainerConfig {
        objective: Objective::Multiclass,
        ..quick_config()
    };
    let run = Pipeline::new(config).run_frame(&df, "label", &mut sink).unwrap();

    let per_class: Vec<(&str, f64)> = run
        .metrics
        .iter()
        .filter(|(name, _)| name.starts_with("auc_class_"))
        .collect();
    assert_eq!(per_class.len(), 4, "one AUC key per class: {:?}", per_class);
    for label in ["citron", "fig", "plum", "quince"] {
        assert!(run.metrics.get(&format!("auc_class_{}", label)).is_some());
    }

    let macro_auc = run.metrics.get("auc_macro").unwrap();
    assert!((0.0..=1.0).contains(&macro_auc));
    let mean = per_class.iter().map(|(_, v)| v).sum::<f64>() / per_class.len() as f64;
    assert!((macro_auc - mean).abs() < 1e-12);
}

#[test]
fn test_metrics_are_bounded() {
    let df = separable_binary_df(100);
    let mut sink = MemorySink::default();
    let run = Pipeline::new(quick_config())
        .run_frame(&df, "label", &mut sink)
        .unwrap();

    for (name, value) in run.metrics.iter() {
        assert!(
            (0.0..=1.0).contains(&value),
            "{} = {} out of [0, 1]",
            name,
            value
        );
    }
}

#[test]
fn test_directory_sink_writes_all_artifacts() {
    let df = four_class_df(120);
    let out_dir = std::env::temp_dir().join(format!("boostflow_test_run_{}", std::process::id()));
    let _ = fs::remove_dir_all(&out_dir);

    let config = TrainerConfig {
        objective: Objective::Multiclass,
        ..quick_config()
    };
    let mut sink = DirectorySink::new(out_dir.clone());
    Pipeline::new(config).run_frame(&df, "label", &mut sink).unwrap();

    for file in ["model.json", "metrics.json", "labels.json"] {
        assert!(out_dir.join(file).exists(), "missing artifact {}", file);
    }

    let labels_doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("labels.json")).unwrap()).unwrap();
    let labels: Vec<&str> = labels_doc["labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["citron", "fig", "plum", "quince"]);

    let _ = fs::remove_dir_all(&out_dir);
}

#[test]
fn test_run_loads_csv_from_disk() {
    let dir = std::env::temp_dir().join(format!("boostflow_test_csv_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();

    let csv_path = dir.join("train.csv");
    let mut csv = String::from("f1,label\n");
    for i in 0..60 {
        csv.push_str(&format!(
            "{},{}\n",
            (i % 2) as f64 * 8.0 + (i / 2) as f64 * 0.01,
            if i % 2 == 0 { "no" } else { "yes" }
        ));
    }
    fs::write(&csv_path, csv).unwrap();

    let mut sink = MemorySink::default();
    let run = Pipeline::new(quick_config())
        .run(&csv_path, "label", &mut sink)
        .unwrap();

    assert_eq!(run.encoding.classes(), &["no", "yes"]);
    assert!(run.metrics.get("accuracy").unwrap() > 0.9);

    let _ = fs::remove_dir_all(&dir);
}
