//! Integration test: scoring service over persisted artifacts

use boostflow::prelude::*;
use polars::prelude::*;
use std::fs;
use std::path::PathBuf;

fn quick_config() -> TrainerConfig {
    TrainerConfig {
        num_boost_round: 40,
        min_child_samples: 2,
        num_leaves: 7,
        ..Default::default()
    }
}

fn fruit_df(n: usize) -> DataFrame {
    let size: Vec<f64> = (0..n).map(|i| (i % 3) as f64 * 6.0 + (i / 3) as f64 * 0.01).collect();
    let label: Vec<&str> = (0..n)
        .map(|i| match i % 3 {
            0 => "citron",
            1 => "fig",
            _ => "plum",
        })
        .collect();
    df!("size" => &size, "label" => &label).unwrap()
}

fn train_into(dir: &PathBuf) -> TrainingRun {
    let _ = fs::remove_dir_all(dir);
    let config = TrainerConfig {
        objective: Objective::Multiclass,
        ..quick_config()
    };
    let mut sink = DirectorySink::new(dir.clone());
    Pipeline::new(config)
        .run_frame(&fruit_df(150), "label", &mut sink)
        .unwrap()
}

#[test]
fn test_service_round_trips_persisted_artifacts() {
    let dir = std::env::temp_dir().join(format!("boostflow_test_serve_{}", std::process::id()));
    train_into(&dir);

    let service = ScoringService::load(&dir).unwrap();
    let body = service.score_json(
        r#"{"data": [{"size": 0.0}, {"size": 6.0}, {"size": 12.0}]}"#,
    );
    let response: ScoreResponse = serde_json::from_str(&body).unwrap();

    assert_eq!(response.predictions, vec!["citron", "fig", "plum"]);
    assert_eq!(response.probabilities.len(), 3);
    for label in ["citron", "fig", "plum"] {
        let column = &response.probabilities[label];
        assert_eq!(column.len(), 3);
        for &p in column {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_service_rejects_unknown_feature_as_error_json() {
    let dir = std::env::temp_dir().join(format!("boostflow_test_serve_err_{}", std::process::id()));
    train_into(&dir);

    let service = ScoringService::load(&dir).unwrap();
    let body = service.score_json(r#"{"data": [{"weight": 3.0}]}"#);
    let value: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert!(value.get("error").is_some());
    assert!(value.get("predictions").is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_service_from_run_without_disk() {
    let config = quick_config();
    let df = df!(
        "size" => &(0..80).map(|i| (i % 2) as f64 * 9.0 + (i / 2) as f64 * 0.01).collect::<Vec<f64>>(),
        "label" => &(0..80).map(|i| if i % 2 == 0 { "small" } else { "large" }).collect::<Vec<&str>>()
    )
    .unwrap();

    struct NullSink;
    impl ArtifactSink for NullSink {
        fn persist(&mut self, _artifacts: &RunArtifacts) -> Result<()> {
            Ok(())
        }
    }

    let mut sink = NullSink;
    let run = Pipeline::new(config).run_frame(&df, "label", &mut sink).unwrap();

    let service = ScoringService::new(run.model, run.encoding);
    let response = service
        .score(&ScoreRequest {
            data: vec![
                [("size".to_string(), 0.2)].into_iter().collect(),
                [("size".to_string(), 8.9)].into_iter().collect(),
            ],
        })
        .unwrap();

    assert_eq!(response.predictions, vec!["small", "large"]);
}
