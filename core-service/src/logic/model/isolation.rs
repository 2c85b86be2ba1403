//! Isolation Forest
//!
//! Fit and scored on the same request batch; nothing survives the request.
//! Scores follow the usual convention: `-2^(-E[h(x)] / c(ψ))`, in [-1, 0),
//! lower = more anomalous.

use ndarray::{Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::logic::config::PipelineConfig;
use super::OutlierDetector;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Raw score given to every record when the batch is too small to isolate
pub const NEUTRAL_SCORE: f64 = -0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationConfig {
    pub tree_count: usize,
    /// Upper bound on the per-tree sub-sample (ψ)
    pub max_samples: usize,
    pub contamination: f64,
    pub seed: u64,
}

impl From<&PipelineConfig> for IsolationConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            tree_count: config.tree_count,
            max_samples: config.max_samples,
            contamination: config.contamination,
            seed: config.random_seed,
        }
    }
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        size: usize,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(x: &Array2<f64>, rows: &mut [usize], max_depth: usize, rng: &mut StdRng) -> Self {
        let mut builder = TreeBuilder {
            x,
            max_depth,
            features: (0..x.ncols()).collect(),
            nodes: Vec::new(),
        };
        builder.split(rows, 0, rng);
        Self { nodes: builder.nodes }
    }

    fn path_length(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[id] {
                Node::Leaf { size } => return depth + average_path_length(size),
                Node::Split { feature, threshold, left, right, .. } => {
                    id = if row[feature] <= threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    max_depth: usize,
    features: Vec<usize>,
    nodes: Vec<Node>,
}

impl TreeBuilder<'_> {
    fn split(&mut self, rows: &mut [usize], depth: usize, rng: &mut StdRng) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if depth >= self.max_depth || rows.len() <= 1 {
            return id;
        }

        // Random feature order; the first one with spread in this node wins
        self.features.shuffle(rng);
        let chosen = self.features.iter().find_map(|&f| {
            let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                let v = self.x[[r, f]];
                (lo.min(v), hi.max(v))
            });
            (lo < hi).then_some((f, lo, hi))
        });
        let Some((feature, lo, hi)) = chosen else {
            return id;
        };

        let threshold = rng.gen_range(lo..hi);

        let mut mid = 0;
        for i in 0..rows.len() {
            if self.x[[rows[i], feature]] <= threshold {
                rows.swap(i, mid);
                mid += 1;
            }
        }

        let size = rows.len();
        let (left_rows, right_rows) = rows.split_at_mut(mid);
        let left = self.split(left_rows, depth + 1, rng);
        let right = self.split(right_rows, depth + 1, rng);

        self.nodes[id] = Node::Split { feature, threshold, size, left, right };
        id
    }
}

/// Ensemble of isolation trees over one batch
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
    feature_count: usize,
}

impl IsolationForest {
    pub fn fit(x: &Array2<f64>, config: &IsolationConfig) -> Self {
        let n = x.nrows();
        let sample_size = config.max_samples.min(n);
        let max_depth = if sample_size > 1 {
            (sample_size as f64).log2().ceil() as usize
        } else {
            0
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let trees = (0..config.tree_count)
            .map(|_| {
                let mut rows = if sample_size < n {
                    rand::seq::index::sample(&mut rng, n, sample_size).into_vec()
                } else {
                    (0..n).collect()
                };
                IsolationTree::grow(x, &mut rows, max_depth, &mut rng)
            })
            .collect();

        log::debug!(
            "Isolation forest fit: {} trees, ψ = {}, depth limit {}",
            config.tree_count,
            sample_size,
            max_depth
        );

        Self {
            trees,
            sample_size,
            feature_count: x.ncols(),
        }
    }

}

impl OutlierDetector for IsolationForest {
    fn score_samples(&self, x: &Array2<f64>) -> Vec<f64> {
        let normalizer = average_path_length(self.sample_size);
        if normalizer == 0.0 || self.trees.is_empty() {
            return vec![NEUTRAL_SCORE; x.nrows()];
        }

        x.axis_iter(Axis(0))
            .map(|row| {
                let mean_depth = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
                    / self.trees.len() as f64;
                -(2f64.powf(-mean_depth / normalizer))
            })
            .collect()
    }

    /// Split frequency weighted by node size, normalized to sum to 1.
    /// All zeros when no tree ever split.
    fn feature_importance(&self) -> Option<Vec<f64>> {
        let mut weights = vec![0.0f64; self.feature_count];
        for tree in &self.trees {
            for node in &tree.nodes {
                if let Node::Split { feature, size, .. } = node {
                    weights[*feature] += *size as f64;
                }
            }
        }

        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter_mut().for_each(|w| *w /= total);
        }
        Some(weights)
    }
}
