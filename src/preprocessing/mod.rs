//! Dataset preparation: label encoding and train/validation splitting

mod encoder;
mod split;

pub use encoder::LabelEncoding;
pub use split::{split, Partition, SplitOutput, SPLIT_SEED, VALIDATION_FRACTION};
