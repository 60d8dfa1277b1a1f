//! Leaf-wise gradient-boosted trees
//!
//! The boosting component behind the trainer. Trees grow leaf-wise
//! (best-first) under a `num_leaves` bound, with per-tree feature subsampling
//! and L1/L2 leaf regularization. Binary models boost a single sigmoid score;
//! multi-class models boost one tree per class per round and normalize with a
//! softmax. The rest of the pipeline treats [`Booster`] as opaque: it sees
//! probabilities and split counts, never tree structure.

use super::config::{Objective, TrainerConfig};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub(crate) fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        match self {
            TreeNode::Leaf { value } => *value,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if row[*feature] <= *threshold {
                    left.predict(row)
                } else {
                    right.predict(row)
                }
            }
        }
    }

    fn count_splits(&self, counts: &mut [f64]) {
        if let TreeNode::Split {
            feature, left, right, ..
        } = self
        {
            counts[*feature] += 1.0;
            left.count_splits(counts);
            right.count_splits(counts);
        }
    }
}

// ---- Tree building ----

fn leaf_weight(g: f64, h: f64, lambda: f64, alpha: f64) -> f64 {
    let g_adj = if g.abs() <= alpha {
        0.0
    } else {
        g - alpha * g.signum()
    };
    -g_adj / (h + lambda)
}

fn gain_term(g: f64, h: f64, lambda: f64) -> f64 {
    g * g / (h + lambda)
}

fn make_leaf(
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    lambda: f64,
    alpha: f64,
) -> TreeNode {
    let g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    TreeNode::Leaf {
        value: leaf_weight(g, h, lambda, alpha),
    }
}

/// Best threshold on one feature, or `None` if no split with positive gain
/// satisfies `min_child_samples` on both sides.
fn best_split_for_feature(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    feature: usize,
    reg_lambda: f64,
    min_child_samples: usize,
) -> Option<(f64, f64, Vec<usize>, Vec<usize>)> {
    let mut sorted: Vec<(usize, f64)> = indices.iter().map(|&i| (i, x[[i, feature]])).collect();
    sorted.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let total_g: f64 = indices.iter().map(|&i| gradients[i]).sum();
    let total_h: f64 = indices.iter().map(|&i| hessians[i]).sum();
    let base_score = gain_term(total_g, total_h, reg_lambda);

    let mut left_g = 0.0;
    let mut left_h = 0.0;
    let mut best_gain = f64::NEG_INFINITY;
    let mut best_threshold = 0.0;
    let mut best_pos = 0;

    for i in 0..sorted.len() - 1 {
        left_g += gradients[sorted[i].0];
        left_h += hessians[sorted[i].0];
        let right_g = total_g - left_g;
        let right_h = total_h - left_h;

        if i + 1 < min_child_samples || sorted.len() - i - 1 < min_child_samples {
            continue;
        }
        if sorted[i].1 == sorted[i + 1].1 {
            continue;
        }

        let gain = gain_term(left_g, left_h, reg_lambda)
            + gain_term(right_g, right_h, reg_lambda)
            - base_score;

        if gain > best_gain {
            best_gain = gain;
            best_threshold = (sorted[i].1 + sorted[i + 1].1) / 2.0;
            best_pos = i + 1;
        }
    }

    if best_gain <= 0.0 {
        return None;
    }

    let left_indices: Vec<usize> = sorted[..best_pos].iter().map(|&(i, _)| i).collect();
    let right_indices: Vec<usize> = sorted[best_pos..].iter().map(|&(i, _)| i).collect();
    Some((best_threshold, best_gain, left_indices, right_indices))
}

/// Best split across the sampled features for one node: the per-feature
/// candidates are searched in parallel, then reduced in feature order so the
/// result is deterministic.
fn best_split_over_features(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    node_indices: &[usize],
    features: &[usize],
    config: &TrainerConfig,
) -> Option<(usize, f64, f64, Vec<usize>, Vec<usize>)> {
    let candidates: Vec<_> = features
        .par_iter()
        .filter_map(|&feat| {
            best_split_for_feature(
                x,
                gradients,
                hessians,
                node_indices,
                feat,
                config.reg_lambda,
                config.min_child_samples,
            )
            .map(|(thr, gain, li, ri)| (feat, thr, gain, li, ri))
        })
        .collect();
    candidates
        .into_iter()
        .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
}

/// Grow one tree leaf-wise: always expand the pending split with the highest
/// gain until `num_leaves` is reached or no positive-gain split remains.
pub(crate) fn grow_tree(
    x: &Array2<f64>,
    gradients: &[f64],
    hessians: &[f64],
    indices: &[usize],
    config: &TrainerConfig,
    rng: &mut Xoshiro256PlusPlus,
) -> TreeNode {
    if indices.len() < config.min_child_samples * 2 {
        return make_leaf(
            gradients,
            hessians,
            indices,
            config.reg_lambda,
            config.reg_alpha,
        );
    }

    let n_features = x.ncols();
    let n_selected = ((n_features as f64 * config.feature_fraction).ceil() as usize).max(1);
    let mut feature_indices: Vec<usize> = (0..n_features).collect();
    feature_indices.shuffle(rng);
    feature_indices.truncate(n_selected);

    use std::cmp::Ordering;
    use std::collections::BinaryHeap;

    #[derive(Clone)]
    struct PendingSplit {
        gain: f64,
        node_id: usize,
        feature: usize,
        threshold: f64,
        left_indices: Vec<usize>,
        right_indices: Vec<usize>,
    }
    impl PartialEq for PendingSplit {
        fn eq(&self, other: &Self) -> bool {
            self.gain == other.gain
        }
    }
    impl Eq for PendingSplit {}
    impl PartialOrd for PendingSplit {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            self.gain.partial_cmp(&other.gain)
        }
    }
    impl Ord for PendingSplit {
        fn cmp(&self, other: &Self) -> Ordering {
            self.partial_cmp(other).unwrap_or(Ordering::Equal)
        }
    }

    enum NodeSlot {
        Leaf(Vec<usize>),
        Split {
            feature: usize,
            threshold: f64,
            left: usize,
            right: usize,
        },
    }

    let mut nodes: Vec<NodeSlot> = vec![NodeSlot::Leaf(indices.to_vec())];
    let mut depths: Vec<usize> = vec![0];
    let mut heap: BinaryHeap<PendingSplit> = BinaryHeap::new();
    let max_depth_limit = config.max_depth.unwrap_or(usize::MAX);

    if let Some((feat, thr, gain, li, ri)) =
        best_split_over_features(x, gradients, hessians, indices, &feature_indices, config)
    {
        heap.push(PendingSplit {
            gain,
            node_id: 0,
            feature: feat,
            threshold: thr,
            left_indices: li,
            right_indices: ri,
        });
    }

    let mut n_leaves = 1usize;

    while n_leaves < config.num_leaves {
        let split = match heap.pop() {
            Some(s) if s.gain > 0.0 => s,
            _ => break,
        };
        if depths[split.node_id] >= max_depth_limit {
            continue;
        }

        let depth = depths[split.node_id];
        let left_id = nodes.len();
        let right_id = nodes.len() + 1;

        nodes.push(NodeSlot::Leaf(split.left_indices.clone()));
        nodes.push(NodeSlot::Leaf(split.right_indices.clone()));
        depths.push(depth + 1);
        depths.push(depth + 1);

        nodes[split.node_id] = NodeSlot::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        n_leaves += 1;

        if depth + 1 < max_depth_limit {
            for (child_id, child_indices) in
                [(left_id, &split.left_indices), (right_id, &split.right_indices)]
            {
                if child_indices.len() < config.min_child_samples * 2 {
                    continue;
                }
                if let Some((feat, thr, gain, li, ri)) = best_split_over_features(
                    x,
                    gradients,
                    hessians,
                    child_indices,
                    &feature_indices,
                    config,
                ) {
                    heap.push(PendingSplit {
                        gain,
                        node_id: child_id,
                        feature: feat,
                        threshold: thr,
                        left_indices: li,
                        right_indices: ri,
                    });
                }
            }
        }
    }

    fn to_node(
        nodes: &[NodeSlot],
        idx: usize,
        g: &[f64],
        h: &[f64],
        lambda: f64,
        alpha: f64,
    ) -> TreeNode {
        match &nodes[idx] {
            NodeSlot::Leaf(indices) => make_leaf(g, h, indices, lambda, alpha),
            NodeSlot::Split {
                feature,
                threshold,
                left,
                right,
            } => TreeNode::Split {
                feature: *feature,
                threshold: *threshold,
                left: Box::new(to_node(nodes, *left, g, h, lambda, alpha)),
                right: Box::new(to_node(nodes, *right, g, h, lambda, alpha)),
            },
        }
    }
    to_node(
        &nodes,
        0,
        gradients,
        hessians,
        config.reg_lambda,
        config.reg_alpha,
    )
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

pub(crate) fn softmax_inplace(row: &mut [f64]) {
    let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in row.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in row.iter_mut() {
        *v /= sum;
    }
}

// ---- Fitted ensemble ----

/// Model output on a feature matrix; the shape depends on the task.
#[derive(Debug, Clone)]
pub enum ModelOutput {
    /// Probability of the positive class (code 1), one score per row.
    Binary(Array1<f64>),
    /// Per-row probability vector, one column per class.
    Multiclass(Array2<f64>),
}

impl ModelOutput {
    pub fn len(&self) -> usize {
        match self {
            ModelOutput::Binary(p) => p.len(),
            ModelOutput::Multiclass(p) => p.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Predicted class per row: binary thresholds the score at 0.5,
    /// multi-class takes the first maximum (lowest class index wins ties).
    pub fn predicted_classes(&self) -> Vec<usize> {
        match self {
            ModelOutput::Binary(p) => p.iter().map(|&p| usize::from(p >= 0.5)).collect(),
            ModelOutput::Multiclass(proba) => proba
                .rows()
                .into_iter()
                .map(|row| {
                    let mut best = 0;
                    let mut best_val = f64::NEG_INFINITY;
                    for (i, &v) in row.iter().enumerate() {
                        if v > best_val {
                            best_val = v;
                            best = i;
                        }
                    }
                    best
                })
                .collect(),
        }
    }
}

/// A fitted boosted-tree ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booster {
    objective: Objective,
    num_classes: usize,
    num_features: usize,
    learning_rate: f64,
    base_scores: Vec<f64>,
    trees: Vec<TreeNode>,
}

impl Booster {
    pub(crate) fn new(
        objective: Objective,
        num_classes: usize,
        num_features: usize,
        learning_rate: f64,
        base_scores: Vec<f64>,
    ) -> Self {
        Self {
            objective,
            num_classes,
            num_features,
            learning_rate,
            base_scores,
            trees: Vec::new(),
        }
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    /// Trees fitted per boosting round: one for binary, K for multi-class.
    pub fn trees_per_round(&self) -> usize {
        match self.objective {
            Objective::Binary => 1,
            Objective::Multiclass => self.num_classes,
        }
    }

    pub fn num_rounds(&self) -> usize {
        self.trees.len() / self.trees_per_round()
    }

    pub(crate) fn push_round(&mut self, round: Vec<TreeNode>) {
        debug_assert_eq!(round.len(), self.trees_per_round());
        self.trees.extend(round);
    }

    /// Drop every tree after the given round count, restoring the ensemble
    /// snapshot at that round.
    pub(crate) fn truncate_rounds(&mut self, rounds: usize) {
        self.trees.truncate(rounds * self.trees_per_round());
    }

    /// Raw additive scores before the link function, one column per class
    /// slot (a single column for binary).
    pub fn raw_scores(&self, x: &Array2<f64>) -> Array2<f64> {
        let width = self.trees_per_round();
        let mut raw = Array2::from_shape_fn((x.nrows(), width), |(_, c)| self.base_scores[c]);
        for (t, tree) in self.trees.iter().enumerate() {
            let class = t % width;
            for (i, row) in x.rows().into_iter().enumerate() {
                raw[[i, class]] += self.learning_rate * tree.predict(row);
            }
        }
        raw
    }

    /// Probability-shaped output for a feature matrix.
    pub fn predict_output(&self, x: &Array2<f64>) -> ModelOutput {
        let mut raw = self.raw_scores(x);
        match self.objective {
            Objective::Binary => ModelOutput::Binary(raw.column(0).mapv(sigmoid)),
            Objective::Multiclass => {
                for mut row in raw.rows_mut() {
                    if let Some(slice) = row.as_slice_mut() {
                        softmax_inplace(slice);
                    }
                }
                ModelOutput::Multiclass(raw)
            }
        }
    }

    /// Split counts per feature over the kept trees.
    pub fn split_counts(&self) -> Vec<f64> {
        let mut counts = vec![0.0; self.num_features];
        for tree in &self.trees {
            tree.count_splits(&mut counts);
        }
        counts
    }
}
