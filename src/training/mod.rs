//! Boosted-tree model training
//!
//! The trainer drives the boosting loop and early stopping; the booster grows
//! trees and turns raw scores into probabilities. The rest of the pipeline
//! only sees [`TrainedModel`] and [`ModelOutput`].

mod booster;
mod callback;
mod config;
mod trainer;

pub use booster::{Booster, ModelOutput};
pub use callback::EarlyStopping;
pub use config::{Objective, TrainerConfig};
pub use trainer::{TrainedModel, Trainer};
