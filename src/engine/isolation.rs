//! Isolation-based outlier detection.
//!
//! A point that can be separated from the rest of a batch with few random
//! axis-aligned splits is more anomalous than one buried inside the bulk.
//! This is the standard isolation-forest construction: random subsampled
//! trees, expected-path-length scoring, and a contamination-quantile decision
//! threshold.
//!
//! The forest is fit fresh on every call with a fixed seed — scores are
//! reproducible by construction, and no model state survives across batches.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

/// Euler–Mascheroni constant, used by the average-path normalizer.
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// One point flagged by the forest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outlier {
    /// Index of the point in the input batch.
    pub index: usize,
    /// Decision score: threshold minus anomaly score, negative for outliers.
    /// Its magnitude is how far past the threshold the point landed.
    pub decision: f64,
}

/// A fitted forest of isolation trees.
pub struct IsolationForest {
    trees: Vec<Node>,
    /// Normalizer c(ψ) for the subsample size the trees were grown on.
    c_subsample: f64,
}

enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl IsolationForest {
    /// Fit a forest over the batch. Returns `None` for fewer than two points —
    /// isolation is undefined on a singleton.
    pub fn fit(data: &[Vec<f64>], trees: usize, max_subsample: usize, seed: u64) -> Option<Self> {
        if data.len() < 2 || trees == 0 {
            return None;
        }
        let subsample = data.len().min(max_subsample.max(2));
        let height_limit = (subsample as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(seed);

        let grown = (0..trees)
            .map(|_| {
                let indices = sample(&mut rng, data.len(), subsample).into_vec();
                grow(data, indices, 0, height_limit, &mut rng)
            })
            .collect();

        Some(Self {
            trees: grown,
            c_subsample: average_path_length(subsample),
        })
    }

    /// Anomaly score in (0, 1]: higher is more isolated.
    pub fn score(&self, point: &[f64]) -> f64 {
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, point, 0.0))
            .sum();
        let mean_path = total / self.trees.len() as f64;
        2f64.powf(-mean_path / self.c_subsample)
    }

    /// Score every point of the batch the forest was fit on.
    pub fn score_batch(&self, data: &[Vec<f64>]) -> Vec<f64> {
        data.iter().map(|p| self.score(p)).collect()
    }
}

/// Fit a seeded forest and flag the `contamination` fraction of the batch
/// with the highest anomaly scores.
///
/// Returns an empty list for batches of fewer than two points.
pub fn detect_outliers(
    data: &[Vec<f64>],
    contamination: f64,
    trees: usize,
    max_subsample: usize,
    seed: u64,
) -> Vec<Outlier> {
    let Some(forest) = IsolationForest::fit(data, trees, max_subsample, seed) else {
        return Vec::new();
    };
    let scores = forest.score_batch(data);

    let expected = ((contamination * data.len() as f64).ceil() as usize)
        .clamp(1, data.len().saturating_sub(1));

    // Threshold at the (expected + 1)-th highest score; everything strictly
    // above it is flagged. Ties collapse toward fewer flags, never more.
    let mut sorted = scores.clone();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let threshold = sorted[expected.min(sorted.len() - 1)];

    scores
        .iter()
        .enumerate()
        .filter(|(_, &s)| s > threshold)
        .map(|(index, &s)| Outlier {
            index,
            decision: threshold - s,
        })
        .collect()
}

/// Expected path length c(m) of an unsuccessful BST search over m points.
fn average_path_length(m: usize) -> f64 {
    match m {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = m as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn grow(
    data: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if indices.len() <= 1 || depth >= height_limit {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let dims = data[indices[0]].len();
    // Features with spread on this node's subset — constant columns cannot split.
    let candidates: Vec<(usize, f64, f64)> = (0..dims)
        .filter_map(|d| {
            let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
            for &i in &indices {
                lo = lo.min(data[i][d]);
                hi = hi.max(data[i][d]);
            }
            (hi > lo).then_some((d, lo, hi))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
    let value = rng.gen_range(lo..hi);

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| data[i][feature] < value);

    Node::Split {
        feature,
        value,
        left: Box::new(grow(data, left_idx, depth + 1, height_limit, rng)),
        right: Box::new(grow(data, right_idx, depth + 1, height_limit, rng)),
    }
}

fn path_length(node: &Node, point: &[f64], depth: f64) -> f64 {
    match node {
        Node::Leaf { size } => depth + average_path_length(*size),
        Node::Split {
            feature,
            value,
            left,
            right,
        } => {
            if point[*feature] < *value {
                path_length(left, point, depth + 1.0)
            } else {
                path_length(right, point, depth + 1.0)
            }
        }
    }
}
