//! Gradient-boosted regression trees on lagged scaled closes.
//!
//! Squared-error boosting: start from the mean target, then repeatedly fit a
//! shallow tree to the residuals of a seeded row subsample and add it with a
//! shrinkage factor.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::window::{prepare, roll_forward, supervised, unscale};
use super::{ForecastModel, ModelError};
use crate::stats::mean;

const N_TREES: usize = 200;
const LEARNING_RATE: f64 = 0.05;
const MAX_DEPTH: usize = 4;
const MIN_LEAF: usize = 5;
const SUBSAMPLE: f64 = 0.9;
const MIN_SAMPLES: usize = 2 * MIN_LEAF;

#[derive(Debug, Clone)]
pub struct BoostedTreesModel {
    window: usize,
    seed: u64,
}

impl BoostedTreesModel {
    pub fn new(window: usize, seed: u64) -> Self {
        Self { window, seed }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A regression tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(v) => return v,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    fn fit(rows: &[Vec<f64>], residuals: &[f64], sample: Vec<usize>) -> Self {
        let mut tree = Tree { nodes: Vec::new() };
        tree.grow(rows, residuals, sample, 0);
        tree
    }

    /// Grow a subtree over `sample` and return its node index.
    fn grow(&mut self, rows: &[Vec<f64>], residuals: &[f64], sample: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        let value = sample.iter().map(|&i| residuals[i]).sum::<f64>() / sample.len().max(1) as f64;
        self.nodes.push(Node::Leaf(value));

        if depth >= MAX_DEPTH || sample.len() < 2 * MIN_LEAF {
            return idx;
        }
        let Some((feature, threshold)) = best_split(rows, residuals, &sample) else {
            return idx;
        };

        let (left_sample, right_sample): (Vec<usize>, Vec<usize>) =
            sample.into_iter().partition(|&i| rows[i][feature] <= threshold);
        let left = self.grow(rows, residuals, left_sample, depth + 1);
        let right = self.grow(rows, residuals, right_sample, depth + 1);
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }
}

/// Split with the largest squared-error reduction that leaves at least
/// `MIN_LEAF` rows on each side.
fn best_split(rows: &[Vec<f64>], residuals: &[f64], sample: &[usize]) -> Option<(usize, f64)> {
    let n = sample.len();
    let total: f64 = sample.iter().map(|&i| residuals[i]).sum();
    let parent_score = total * total / n as f64;
    let n_features = rows[sample[0]].len();

    let mut best: Option<(usize, f64)> = None;
    let mut best_gain = 1e-12;
    let mut order = sample.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| rows[a][feature].total_cmp(&rows[b][feature]));
        let mut left_sum = 0.0;
        for k in 0..n - 1 {
            left_sum += residuals[order[k]];
            let left_n = k + 1;
            let right_n = n - left_n;
            if left_n < MIN_LEAF || right_n < MIN_LEAF {
                continue;
            }
            let here = rows[order[k]][feature];
            let next = rows[order[k + 1]][feature];
            if here == next {
                continue;
            }
            let right_sum = total - left_sum;
            let score = left_sum * left_sum / left_n as f64 + right_sum * right_sum / right_n as f64;
            let gain = score - parent_score;
            if gain > best_gain {
                best_gain = gain;
                best = Some((feature, 0.5 * (here + next)));
            }
        }
    }
    best
}

/// Fitted boosted ensemble.
struct Booster {
    base: f64,
    trees: Vec<Tree>,
}

impl Booster {
    fn fit(rows: &[Vec<f64>], targets: &[f64], seed: u64) -> Self {
        let base = mean(targets);
        let mut predictions = vec![base; targets.len()];
        let mut rng = StdRng::seed_from_u64(seed);
        let mut trees = Vec::with_capacity(N_TREES);

        for _ in 0..N_TREES {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&predictions)
                .map(|(y, p)| y - p)
                .collect();
            let sample: Vec<usize> = (0..targets.len())
                .filter(|_| rng.gen_bool(SUBSAMPLE))
                .collect();
            if sample.is_empty() {
                continue;
            }
            let tree = Tree::fit(rows, &residuals, sample);
            for (p, row) in predictions.iter_mut().zip(rows) {
                *p += LEARNING_RATE * tree.predict(row);
            }
            trees.push(tree);
        }
        Self { base, trees }
    }

    fn predict(&self, x: &[f64]) -> f64 {
        self.base
            + self
                .trees
                .iter()
                .map(|t| LEARNING_RATE * t.predict(x))
                .sum::<f64>()
    }
}

impl ForecastModel for BoostedTreesModel {
    fn name(&self) -> &str {
        "boosted_trees"
    }

    fn forecast(&self, closes: &[f64], horizon: usize) -> Result<Vec<f64>, ModelError> {
        let prepared = prepare(closes, self.window, MIN_SAMPLES)?;
        let (rows, targets) = supervised(&prepared.scaled, self.window);
        let booster = Booster::fit(&rows, &targets, self.seed);
        let scaled = roll_forward(&prepared.scaled, self.window, horizon, |w| {
            Ok(booster.predict(w))
        })?;
        Ok(unscale(&prepared.scaler, &scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_tree_separates_two_levels() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let residuals: Vec<f64> = (0..20).map(|i| if i < 10 { -1.0 } else { 1.0 }).collect();
        let tree = Tree::fit(&rows, &residuals, (0..20).collect());
        assert_eq!(tree.predict(&[2.0]), -1.0);
        assert_eq!(tree.predict(&[15.0]), 1.0);
    }

    #[test]
    fn leaves_respect_min_size() {
        // Only one outlier row: no split may isolate it.
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64]).collect();
        let mut residuals = vec![0.0; 12];
        residuals[11] = 100.0;
        let tree = Tree::fit(&rows, &residuals, (0..12).collect());
        let right_mean = 100.0 / MIN_LEAF as f64;
        assert!(tree.predict(&[11.0]) <= right_mean + 1e-9);
    }

    #[test]
    fn constant_series_forecasts_constant() {
        let path = BoostedTreesModel::new(10, 3).forecast(&[25.0; 60], 8).unwrap();
        assert_eq!(path, vec![25.0; 8]);
    }

    #[test]
    fn seeded_fit_is_deterministic() {
        let closes: Vec<f64> = (0..80).map(|i| 30.0 + (i % 7) as f64).collect();
        let a = BoostedTreesModel::new(10, 4).forecast(&closes, 6).unwrap();
        let b = BoostedTreesModel::new(10, 4).forecast(&closes, 6).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn trees_do_not_extrapolate_a_trend() {
        let closes: Vec<f64> = (0..100).map(|i| 10.0 + i as f64).collect();
        let path = BoostedTreesModel::new(10, 2).forecast(&closes, 10).unwrap();
        for p in path {
            assert!((5.0..=115.0).contains(&p), "got {p}");
        }
    }
}
