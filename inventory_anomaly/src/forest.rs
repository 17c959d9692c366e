//! Isolation Forest
//!
//! An ensemble of random partitioning trees. Each tree is grown on a random
//! subsample by repeatedly picking a feature and a split value uniformly
//! between that feature's minimum and maximum, until points are isolated or
//! the depth limit is reached. Outliers sit in sparse regions and are
//! isolated after fewer splits, so a short average path length means an
//! anomalous point.
//!
//! Reference: "Isolation Forest" (Liu, Ting and Zhou, ICDM 2008)

use crate::error::{AnomalyError, Result};
use inventory_math::stats;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Subsample size used per tree when enough rows are available
pub const DEFAULT_MAX_SAMPLES: usize = 256;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// A node of an isolation tree
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
enum IsolationNode {
    /// Rows with `x[feature] <= threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: Box<IsolationNode>,
        right: Box<IsolationNode>,
    },
    /// Terminal node with the number of training rows that reached it
    Leaf { size: usize },
}

/// Settings for growing a forest
#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_samples: usize,
    /// Expected outlier fraction, in (0, 0.5]
    pub contamination: f64,
    pub random_state: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: DEFAULT_MAX_SAMPLES,
            contamination: 0.1,
            random_state: 42,
        }
    }
}

/// Fitted isolation forest
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IsolationForest {
    trees: Vec<IsolationNode>,
    sample_size: usize,
    n_features: usize,
    /// Raw score at the contamination percentile of the training data
    offset: f64,
}

impl IsolationForest {
    /// Grow the forest and calibrate the decision offset on `rows`
    pub fn fit(rows: &[Vec<f64>], params: &ForestParams) -> Result<Self> {
        if params.n_estimators == 0 {
            return Err(AnomalyError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if params.max_samples == 0 {
            return Err(AnomalyError::InvalidParameter(
                "max_samples must be at least 1".to_string(),
            ));
        }
        if !(params.contamination > 0.0 && params.contamination <= 0.5) {
            return Err(AnomalyError::InvalidParameter(format!(
                "Contamination must be in (0, 0.5], got {}",
                params.contamination
            )));
        }
        let n_features = match rows.first() {
            Some(row) if !row.is_empty() => row.len(),
            Some(_) => {
                return Err(AnomalyError::DataError(
                    "Rows have no features".to_string(),
                ))
            }
            None => {
                return Err(AnomalyError::DataError(
                    "No rows to fit the forest on".to_string(),
                ))
            }
        };
        if rows.iter().any(|r| r.len() != n_features) {
            return Err(AnomalyError::DataError(format!(
                "All rows must have {} features",
                n_features
            )));
        }

        let sample_size = params.max_samples.min(rows.len());
        let max_depth = (sample_size as f64).log2().ceil() as usize;

        let mut master = StdRng::seed_from_u64(params.random_state);
        let trees = (0..params.n_estimators)
            .map(|_| {
                let mut rng = StdRng::seed_from_u64(master.gen());
                let sample = index::sample(&mut rng, rows.len(), sample_size).into_vec();
                grow(rows, sample, 0, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            n_features,
            offset: 0.0,
        };

        let training_scores = forest.score_samples(rows);
        forest.offset = stats::percentile(&training_scores, 100.0 * params.contamination)?;
        Ok(forest)
    }

    /// Raw scores `-2^(-E[h(x)] / c(sample_size))`; lower means more abnormal
    pub fn score_samples(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        let normaliser = average_path_length(self.sample_size);
        rows.iter()
            .map(|row| {
                if normaliser == 0.0 {
                    // a single-row sample cannot separate anything
                    return -0.5;
                }
                let total: f64 = self.trees.iter().map(|t| path_length(t, row, 0)).sum();
                let mean_depth = total / self.trees.len() as f64;
                -(2f64.powf(-mean_depth / normaliser))
            })
            .collect()
    }

    /// `score_samples - offset`; negative values are outliers
    pub fn decision_function(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        self.decision_from_scores(&self.score_samples(rows))
    }

    /// Decision values for raw scores already computed by [`Self::score_samples`]
    pub fn decision_from_scores(&self, scores: &[f64]) -> Vec<f64> {
        scores.iter().map(|s| s - self.offset).collect()
    }

    /// `true` for rows whose decision value is strictly negative
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<bool> {
        self.predict_scores(&self.score_samples(rows))
    }

    /// Outlier labels for raw scores already computed by [`Self::score_samples`]
    pub fn predict_scores(&self, scores: &[f64]) -> Vec<bool> {
        self.decision_from_scores(scores)
            .into_iter()
            .map(|d| d < 0.0)
            .collect()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }
}

fn grow(
    rows: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> IsolationNode {
    if depth >= max_depth || indices.len() <= 1 {
        return IsolationNode::Leaf {
            size: indices.len(),
        };
    }

    let n_features = rows[indices[0]].len();
    let ranges: Vec<(usize, f64, f64)> = (0..n_features)
        .filter_map(|f| {
            let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(rows[i][f]), hi.max(rows[i][f]))
            });
            (hi > lo).then_some((f, lo, hi))
        })
        .collect();

    if ranges.is_empty() {
        return IsolationNode::Leaf {
            size: indices.len(),
        };
    }

    let (feature, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
    // weighted form stays finite when `hi - lo` overflows
    let u: f64 = rng.gen();
    let threshold = lo * (1.0 - u) + hi * u;
    let (left, right): (Vec<usize>, Vec<usize>) =
        indices.into_iter().partition(|&i| rows[i][feature] <= threshold);

    if left.is_empty() || right.is_empty() {
        return IsolationNode::Leaf {
            size: left.len() + right.len(),
        };
    }

    IsolationNode::Split {
        feature,
        threshold,
        left: Box::new(grow(rows, left, depth + 1, max_depth, rng)),
        right: Box::new(grow(rows, right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &IsolationNode, row: &[f64], depth: usize) -> f64 {
    match node {
        IsolationNode::Leaf { size } => depth as f64 + average_path_length(*size),
        IsolationNode::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] <= *threshold {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful binary search tree lookup among `n` points
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = (0..200)
            .map(|i| vec![(i % 10) as f64 * 0.1, (i % 7) as f64 * 0.1])
            .collect();
        rows.push(vec![50.0, -40.0]);
        rows
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // 2(ln 255 + γ) - 2·255/256
        assert_relative_eq!(average_path_length(256), 10.244, epsilon = 1e-3);
    }

    #[test]
    fn test_outlier_scores_lowest() {
        let rows = cluster_with_outlier();
        let forest = IsolationForest::fit(&rows, &ForestParams::default()).unwrap();
        let scores = forest.score_samples(&rows);

        let outlier = scores[200];
        assert!(scores[..200].iter().all(|s| *s > outlier));
        assert!(forest.predict(&rows)[200]);
        assert!(scores.iter().all(|s| *s < 0.0 && *s >= -1.0));
    }

    #[test]
    fn test_same_seed_same_forest() {
        let rows = cluster_with_outlier();
        let a = IsolationForest::fit(&rows, &ForestParams::default()).unwrap();
        let b = IsolationForest::fit(&rows, &ForestParams::default()).unwrap();
        assert_eq!(a, b);

        let other = ForestParams {
            random_state: 7,
            ..Default::default()
        };
        let c = IsolationForest::fit(&rows, &other).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_depth_limit() {
        let rows = cluster_with_outlier();
        let forest = IsolationForest::fit(&rows, &ForestParams::default()).unwrap();
        fn depth(node: &IsolationNode) -> usize {
            match node {
                IsolationNode::Leaf { .. } => 0,
                IsolationNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        assert_eq!(forest.sample_size(), 201);
        assert!(forest.trees.iter().all(|t| depth(t) <= 8));
    }

    #[test]
    fn test_extreme_finite_range_grows() {
        let mut rows: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 5) as f64]).collect();
        rows.push(vec![f64::MAX]);
        rows.push(vec![-f64::MAX]);
        let forest = IsolationForest::fit(&rows, &ForestParams::default()).unwrap();
        let scores = forest.score_samples(&rows);
        assert!(scores.iter().all(|s| s.is_finite()));
        assert_eq!(forest.predict(&rows), forest.predict_scores(&scores));
        let decisions = forest.decision_function(&rows);
        assert_relative_eq!(decisions[0], scores[0] - forest.offset());
    }

    #[test]
    fn test_invalid_params() {
        let rows = vec![vec![1.0], vec![2.0]];
        for contamination in [0.0, 0.6] {
            let params = ForestParams {
                contamination,
                ..Default::default()
            };
            assert!(matches!(
                IsolationForest::fit(&rows, &params),
                Err(AnomalyError::InvalidParameter(_))
            ));
        }
        assert!(matches!(
            IsolationForest::fit(&[], &ForestParams::default()),
            Err(AnomalyError::DataError(_))
        ));
    }
}
