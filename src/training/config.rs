//! Training configuration

use serde::{Deserialize, Serialize};

/// Loss the booster optimizes; also the validation metric monitored for
/// early stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Objective {
    Binary,
    Multiclass,
}

/// Hyperparameters for a training run.
///
/// Deserializes with `#[serde(default)]`, so a hyperparameter file only needs
/// the options it wants to override; everything else takes the defaults
/// below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub objective: Objective,
    /// Upper bound on leaves per tree (leaf-wise growth).
    pub num_leaves: usize,
    pub learning_rate: f64,
    /// Fraction of feature columns sampled per tree.
    pub feature_fraction: f64,
    /// Maximum boosting rounds; early stopping may end training sooner.
    pub num_boost_round: usize,
    /// Rounds without validation-loss improvement before stopping.
    pub early_stopping_rounds: usize,
    pub max_depth: Option<usize>,
    pub min_child_samples: usize,
    pub reg_lambda: f64,
    pub reg_alpha: f64,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            objective: Objective::Binary,
            num_leaves: 31,
            learning_rate: 0.1,
            feature_fraction: 1.0,
            num_boost_round: 100,
            early_stopping_rounds: 20,
            max_depth: None,
            min_child_samples: 20,
            reg_lambda: 0.0,
            reg_alpha: 0.0,
            seed: 42,
        }
    }
}
