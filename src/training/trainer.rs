//! Boosting loop with validation-driven early stopping
//!
//! The trainer owns the round loop: it computes gradients for the configured
//! objective, grows one tree per class per round, scores the validation
//! partition with the objective's loss after every round, and returns the
//! ensemble truncated to the round with the best validation loss.

use super::booster::{grow_tree, sigmoid, softmax_inplace, Booster, ModelOutput, TreeNode};
use super::callback::EarlyStopping;
use super::config::{Objective, TrainerConfig};
use crate::error::{BoostflowError, Result};
use crate::preprocessing::Partition;
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A fitted model: the boosted ensemble plus the metadata the evaluator and
/// scoring service need. Immutable once training completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    booster: Booster,
    pub feature_names: Vec<String>,
    /// Split counts per feature; length equals the feature column count.
    pub importances: Vec<f64>,
    /// Number of boosting rounds kept in the returned ensemble.
    pub best_iteration: usize,
    /// Validation loss at the best round.
    pub best_score: f64,
}

impl TrainedModel {
    pub fn objective(&self) -> Objective {
        self.booster.objective()
    }

    pub fn num_classes(&self) -> usize {
        self.booster.num_classes()
    }

    pub fn num_features(&self) -> usize {
        self.booster.num_features()
    }

    /// Score a feature matrix. Output shape depends on the objective.
    pub fn predict_output(&self, x: &Array2<f64>) -> Result<ModelOutput> {
        if x.ncols() != self.booster.num_features() {
            return Err(BoostflowError::DataError(format!(
                "feature count mismatch: model expects {}, got {}",
                self.booster.num_features(),
                x.ncols()
            )));
        }
        Ok(self.booster.predict_output(x))
    }
}

/// Fits a boosted-tree ensemble against a training partition, using a
/// held-out validation partition for early stopping.
pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train a model. Deterministic for a fixed config and fixed partitions.
    pub fn train(
        &self,
        train: &Partition,
        valid: &Partition,
        feature_names: &[String],
    ) -> Result<TrainedModel> {
        if train.is_empty() {
            return Err(BoostflowError::TrainingError(
                "training partition is empty".to_string(),
            ));
        }
        if valid.is_empty() {
            return Err(BoostflowError::TrainingError(
                "validation partition is empty; early stopping has no signal".to_string(),
            ));
        }
        if self.config.num_boost_round == 0 {
            return Err(BoostflowError::TrainingError(
                "num_boost_round must be at least 1".to_string(),
            ));
        }
        let num_features = train.features.ncols();
        if feature_names.len() != num_features {
            return Err(BoostflowError::TrainingError(format!(
                "{} feature names for {} feature columns",
                feature_names.len(),
                num_features
            )));
        }

        let max_code = train
            .labels
            .iter()
            .chain(valid.labels.iter())
            .fold(0.0f64, |m, &v| m.max(v)) as usize;
        let num_classes = match self.config.objective {
            Objective::Binary => {
                if max_code > 1 {
                    return Err(BoostflowError::TrainingError(format!(
                        "binary objective but {} classes present",
                        max_code + 1
                    )));
                }
                2
            }
            Objective::Multiclass => {
                let k = max_code + 1;
                if k < 2 {
                    return Err(BoostflowError::TrainingError(
                        "multiclass objective needs at least 2 classes".to_string(),
                    ));
                }
                k
            }
        };

        let n = train.len();
        info!(
            rows = n,
            valid_rows = valid.len(),
            classes = num_classes,
            objective = ?self.config.objective,
            "starting boosting"
        );

        let base_scores = initial_scores(self.config.objective, &train.labels, num_classes);
        let mut booster = Booster::new(
            self.config.objective,
            num_classes,
            num_features,
            self.config.learning_rate,
            base_scores.clone(),
        );
        let width = booster.trees_per_round();

        // Raw score caches, updated incrementally as trees are added.
        let mut raw_train = Array2::from_shape_fn((n, width), |(_, c)| base_scores[c]);
        let mut raw_valid = Array2::from_shape_fn((valid.len(), width), |(_, c)| base_scores[c]);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.seed);
        let mut stopper = EarlyStopping::new(self.config.early_stopping_rounds);
        let all_rows: Vec<usize> = (0..n).collect();

        for round in 0..self.config.num_boost_round {
            let (gradients, hessians) =
                objective_gradients(self.config.objective, &raw_train, &train.labels, num_classes);

            let mut round_trees = Vec::with_capacity(width);
            for class in 0..width {
                let tree = grow_tree(
                    &train.features,
                    &gradients[class],
                    &hessians[class],
                    &all_rows,
                    &self.config,
                    &mut rng,
                );
                update_raw(
                    &mut raw_train,
                    &train.features,
                    &tree,
                    class,
                    self.config.learning_rate,
                );
                update_raw(
                    &mut raw_valid,
                    &valid.features,
                    &tree,
                    class,
                    self.config.learning_rate,
                );
                round_trees.push(tree);
            }
            booster.push_round(round_trees);

            let loss = validation_loss(self.config.objective, &raw_valid, &valid.labels);
            if !loss.is_finite() {
                return Err(BoostflowError::TrainingError(format!(
                    "validation loss diverged at round {}",
                    round + 1
                )));
            }
            debug!(round = round + 1, loss, "boosting round");

            if stopper.should_stop(loss) {
                info!(
                    round = round + 1,
                    best_round = stopper.best_round() + 1,
                    "early stopping"
                );
                break;
            }
        }

        let best_iteration = stopper.best_round() + 1;
        booster.truncate_rounds(best_iteration);
        let importances = booster.split_counts();
        let best_score = stopper.best_loss().unwrap_or(f64::NAN);

        info!(best_iteration, best_score, "training complete");

        Ok(TrainedModel {
            booster,
            feature_names: feature_names.to_vec(),
            importances,
            best_iteration,
            best_score,
        })
    }
}

fn initial_scores(objective: Objective, labels: &Array1<f64>, num_classes: usize) -> Vec<f64> {
    let n = labels.len() as f64;
    match objective {
        Objective::Binary => {
            let pos = labels.iter().filter(|&&v| v >= 0.5).count() as f64;
            let p = (pos / n).clamp(1e-6, 1.0 - 1e-6);
            vec![(p / (1.0 - p)).ln()]
        }
        Objective::Multiclass => {
            let mut priors = vec![0.0; num_classes];
            for &v in labels {
                priors[v as usize] += 1.0;
            }
            priors.into_iter().map(|c| (c / n).max(1e-6).ln()).collect()
        }
    }
}

/// Per-class gradients and hessians of the objective's loss at the current
/// raw scores.
fn objective_gradients(
    objective: Objective,
    raw: &Array2<f64>,
    labels: &Array1<f64>,
    num_classes: usize,
) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let n = raw.nrows();
    match objective {
        Objective::Binary => {
            let mut grad = vec![0.0; n];
            let mut hess = vec![0.0; n];
            for i in 0..n {
                let p = sigmoid(raw[[i, 0]]);
                grad[i] = p - labels[i];
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }
            (vec![grad], vec![hess])
        }
        Objective::Multiclass => {
            let mut grads = vec![vec![0.0; n]; num_classes];
            let mut hessians = vec![vec![0.0; n]; num_classes];
            let mut probs = vec![0.0; num_classes];
            for i in 0..n {
                for (c, p) in probs.iter_mut().enumerate() {
                    *p = raw[[i, c]];
                }
                softmax_inplace(&mut probs);
                let y = labels[i] as usize;
                for c in 0..num_classes {
                    let p = probs[c];
                    grads[c][i] = p - if c == y { 1.0 } else { 0.0 };
                    hessians[c][i] = (p * (1.0 - p)).max(1e-16);
                }
            }
            (grads, hessians)
        }
    }
}

fn update_raw(
    raw: &mut Array2<f64>,
    x: &Array2<f64>,
    tree: &TreeNode,
    class: usize,
    learning_rate: f64,
) {
    for (i, row) in x.rows().into_iter().enumerate() {
        raw[[i, class]] += learning_rate * tree.predict(row);
    }
}

/// Log loss of the objective on a partition, from raw scores.
fn validation_loss(objective: Objective, raw: &Array2<f64>, labels: &Array1<f64>) -> f64 {
    let n = raw.nrows();
    let mut total = 0.0;
    match objective {
        Objective::Binary => {
            for i in 0..n {
                let p = sigmoid(raw[[i, 0]]).clamp(1e-15, 1.0 - 1e-15);
                let y = labels[i];
                total -= y * p.ln() + (1.0 - y) * (1.0 - p).ln();
            }
        }
        Objective::Multiclass => {
            let k = raw.ncols();
            let mut probs = vec![0.0; k];
            for i in 0..n {
                for (c, p) in probs.iter_mut().enumerate() {
                    *p = raw[[i, c]];
                }
                softmax_inplace(&mut probs);
                let y = labels[i] as usize;
                total -= probs[y].max(1e-15).ln();
            }
        }
    }
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn separable_binary(n_per_class: usize) -> (Partition, Partition) {
        // Class 0 clusters near 0, class 1 near 10; trivially separable.
        let make = |n: usize, offset: f64| {
            let features = Array2::from_shape_fn((2 * n, 2), |(i, j)| {
                let class = (i % 2) as f64;
                class * 10.0 + offset + (i / 2) as f64 * 0.01 + j as f64 * 0.1
            });
            let labels = Array1::from_iter((0..2 * n).map(|i| (i % 2) as f64));
            Partition { features, labels }
        };
        (make(n_per_class, 0.0), make(n_per_class / 2, 0.3))
    }

    fn quick_config() -> TrainerConfig {
        TrainerConfig {
            num_boost_round: 30,
            min_child_samples: 2,
            num_leaves: 7,
            ..Default::default()
        }
    }

    #[test]
    fn test_binary_training_separates_classes() {
        let (train, valid) = separable_binary(30);
        let names = vec!["f0".to_string(), "f1".to_string()];
        let model = Trainer::new(quick_config()).train(&train, &valid, &names).unwrap();

        let output = model.predict_output(&valid.features).unwrap();
        let predicted = output.predicted_classes();
        let correct = predicted
            .iter()
            .zip(valid.labels.iter())
            .filter(|(&p, &y)| p as f64 == y)
            .count();
        assert_eq!(correct, valid.len());
        assert_eq!(model.importances.len(), 2);
    }

    #[test]
    fn test_training_is_deterministic() {
        let (train, valid) = separable_binary(20);
        let names = vec!["f0".to_string(), "f1".to_string()];
        let trainer = Trainer::new(quick_config());

        let a = trainer.train(&train, &valid, &names).unwrap();
        let b = trainer.train(&train, &valid, &names).unwrap();

        let pa = match a.predict_output(&train.features).unwrap() {
            ModelOutput::Binary(p) => p,
            _ => panic!("binary objective must yield binary output"),
        };
        let pb = match b.predict_output(&train.features).unwrap() {
            ModelOutput::Binary(p) => p,
            _ => panic!("binary objective must yield binary output"),
        };
        assert_eq!(pa, pb);
        assert_eq!(a.best_iteration, b.best_iteration);
    }

    #[test]
    fn test_empty_validation_rejected() {
        let (train, _) = separable_binary(10);
        let valid = Partition {
            features: Array2::zeros((0, 2)),
            labels: Array1::zeros(0),
        };
        let names = vec!["f0".to_string(), "f1".to_string()];
        let err = Trainer::new(quick_config()).train(&train, &valid, &names).unwrap_err();
        assert!(matches!(err, BoostflowError::TrainingError(_)));
    }

    #[test]
    fn test_binary_objective_rejects_three_classes() {
        let features = Array2::from_shape_fn((9, 1), |(i, _)| i as f64);
        let labels = Array1::from_iter((0..9).map(|i| (i % 3) as f64));
        let part = Partition { features, labels };
        let names = vec!["f0".to_string()];

        let err = Trainer::new(quick_config())
            .train(&part, &part.clone(), &names)
            .unwrap_err();
        assert!(matches!(err, BoostflowError::TrainingError(_)));
    }

    #[test]
    fn test_multiclass_output_is_row_stochastic() {
        let features = Array2::from_shape_fn((60, 1), |(i, _)| (i % 3) as f64 * 5.0 + (i / 3) as f64 * 0.01);
        let labels = Array1::from_iter((0..60).map(|i| (i % 3) as f64));
        let part = Partition { features, labels };
        let names = vec!["f0".to_string()];

        let config = TrainerConfig {
            objective: Objective::Multiclass,
            ..quick_config()
        };
        let model = Trainer::new(config).train(&part, &part.clone(), &names).unwrap();

        match model.predict_output(&part.features).unwrap() {
            ModelOutput::Multiclass(proba) => {
                assert_eq!(proba.ncols(), 3);
                for row in proba.rows() {
                    let sum: f64 = row.iter().sum();
                    assert!((sum - 1.0).abs() < 1e-9);
                }
            }
            _ => panic!("multiclass objective must yield per-class output"),
        }
    }
}
