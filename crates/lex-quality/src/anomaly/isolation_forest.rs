//! Isolation forest outlier scoring.
//!
//! Each tree recursively partitions a random subsample on a random feature
//! at a random threshold. Points that end up isolated after few splits are
//! anomalous. The normalized score of a point is
//! `2^(-E[h(x)] / c(psi))` where `h` is the path length and `c` the average
//! path length of an unsuccessful binary search tree lookup over `psi`
//! samples.
//!
//! Scores follow the decision-function convention: `score_samples` returns
//! the negated normalized score in `[-1, 0]`, and `decision_function`
//! subtracts the fitted offset so that negative values are anomalous.

use super::feature_matrix::FeatureMatrix;
use crate::cancellation::CancellationToken;
use crate::config::Contamination;
use crate::error::{QualityError, Result};
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::debug;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Offset used with [`Contamination::Auto`].
const AUTO_OFFSET: f64 = -0.5;

/// Average path length of an unsuccessful search in a binary search tree
/// built from `n` points.
pub(crate) fn average_path_length(n: usize) -> f64 {
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
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// A single isolation tree stored as an arena of nodes; node 0 is the root.
#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(
        matrix: &FeatureMatrix,
        sample: &mut [usize],
        max_depth: usize,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow_node(matrix, sample, 0, max_depth, rng);
        tree
    }

    fn grow_node(
        &mut self,
        matrix: &FeatureMatrix,
        rows: &mut [usize],
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });

        if depth >= max_depth || rows.len() <= 1 {
            return id;
        }

        // Only features that still vary within this node can split it.
        let candidates: Vec<(usize, f64, f64)> = (0..matrix.n_features())
            .filter_map(|feature| {
                let (min, max) = rows.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(min, max), &row| {
                        let v = matrix.value(row, feature);
                        (min.min(v), max.max(v))
                    },
                );
                (max > min).then_some((feature, min, max))
            })
            .collect();

        let Some(&(feature, min, max)) = candidates.choose(rng) else {
            return id;
        };
        let threshold = split_threshold(min, max, rng.gen_range(0.0..1.0));

        let split = partition(rows, |row| matrix.value(row, feature) <= threshold);
        let (left_rows, right_rows) = rows.split_at_mut(split);

        let left = self.grow_node(matrix, left_rows, depth + 1, max_depth, rng);
        let right = self.grow_node(matrix, right_rows, depth + 1, max_depth, rng);

        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    /// Path length of `point`, corrected by `c(size)` at the leaf.
    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;

        loop {
            match &self.nodes[node] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(*size),
            }
        }
    }
}

/// Point at fraction `u` of the way from `min` to `max`, always in
/// `[min, max)`. Interpolates without forming `max - min`, which overflows
/// for values near the ends of the `f64` range.
fn split_threshold(min: f64, max: f64, u: f64) -> f64 {
    let t = min * (1.0 - u) + max * u;
    if t.is_finite() && t < max { t.max(min) } else { min }
}

/// Move every element matching `pred` to the front and return how many did.
fn partition(rows: &mut [usize], pred: impl Fn(usize) -> bool) -> usize {
    let mut split = 0;
    for i in 0..rows.len() {
        if pred(rows[i]) {
            rows.swap(i, split);
            split += 1;
        }
    }
    split
}

/// Isolation forest fit on a [`FeatureMatrix`].
///
/// # Example
///
/// ```rust,ignore
/// let mut forest = IsolationForest::new()
///     .with_n_estimators(100)
///     .with_random_state(42);
/// forest.fit(&matrix, None)?;
/// let scores = forest.decision_function(&matrix)?;
/// ```
#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    contamination: Contamination,
    random_state: u64,
    trees: Vec<IsolationTree>,
    sample_size: usize,
    offset: f64,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl IsolationForest {
    pub fn new() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: Contamination::Auto,
            random_state: 42,
            trees: Vec::new(),
            sample_size: 0,
            offset: AUTO_OFFSET,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n;
        self
    }

    pub fn with_contamination(mut self, contamination: Contamination) -> Self {
        self.contamination = contamination;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Offset subtracted from raw scores by [`decision_function`](Self::decision_function).
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Grow the trees on `matrix`. Refitting discards previous trees.
    pub fn fit(
        &mut self,
        matrix: &FeatureMatrix,
        cancellation: Option<&CancellationToken>,
    ) -> Result<()> {
        if matrix.is_empty() {
            return Err(QualityError::Internal(
                "cannot fit an isolation forest on an empty matrix".to_string(),
            ));
        }
        if self.n_estimators == 0 || self.max_samples == 0 {
            return Err(QualityError::InvalidConfig(
                "n_estimators and max_samples must be at least 1".to_string(),
            ));
        }

        let n_rows = matrix.n_rows();
        let sample_size = self.max_samples.min(n_rows);
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let all_rows: Vec<usize> = (0..n_rows).collect();

        let mut trees = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            if let Some(token) = cancellation {
                token.check()?;
            }
            let mut sample: Vec<usize> = all_rows
                .choose_multiple(&mut rng, sample_size)
                .copied()
                .collect();
            trees.push(IsolationTree::grow(matrix, &mut sample, max_depth, &mut rng));
        }

        self.trees = trees;
        self.sample_size = sample_size;
        self.offset = match self.contamination {
            Contamination::Auto => AUTO_OFFSET,
            Contamination::Fraction(fraction) => {
                let scores = self.score_samples(matrix)?;
                quantile(&scores, fraction)
            }
        };

        debug!(
            "Fitted {} trees (sample size {}, max depth {}, offset {:.4})",
            self.n_estimators, sample_size, max_depth, self.offset
        );
        Ok(())
    }

    /// Negated normalized anomaly score of each row, in `[-1, 0]`.
    pub fn score_samples(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(QualityError::Internal(
                "isolation forest used before fit".to_string(),
            ));
        }

        let normalizer = average_path_length(self.sample_size);
        let n_trees = self.trees.len() as f64;

        Ok((0..matrix.n_rows())
            .map(|i| {
                let point = matrix.row(i);
                if normalizer == 0.0 {
                    // Single-row fit: no path carries information.
                    return AUTO_OFFSET;
                }
                let mean_path: f64 =
                    self.trees.iter().map(|t| t.path_length(point)).sum::<f64>() / n_trees;
                -(2f64.powf(-mean_path / normalizer))
            })
            .collect())
    }

    /// Raw score minus offset; negative means anomalous.
    pub fn decision_function(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>> {
        Ok(self
            .score_samples(matrix)?
            .into_iter()
            .map(|s| s - self.offset)
            .collect())
    }

    /// `true` for rows labeled anomalous.
    pub fn predict(&self, matrix: &FeatureMatrix) -> Result<Vec<bool>> {
        Ok(self
            .decision_function(matrix)?
            .into_iter()
            .map(|d| d < 0.0)
            .collect())
    }
}

/// Linearly interpolated `q`-quantile of `values`, `q` in `[0, 1]`.
fn quantile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with_outlier() -> FeatureMatrix {
        let mut rows: Vec<Vec<f64>> = (0..30)
            .map(|i| vec![1.0 + (i % 5) as f64 * 0.05, 1.0 + (i % 3) as f64 * 0.05])
            .collect();
        rows.push(vec![8.0, -6.0]);
        FeatureMatrix::from_rows(vec!["x".to_string(), "y".to_string()], &rows).unwrap()
    }

    #[test]
    fn test_split_threshold_stays_in_range() {
        assert_eq!(split_threshold(0.0, 10.0, 0.0), 0.0);
        assert_eq!(split_threshold(0.0, 10.0, 0.5), 5.0);
        assert!(split_threshold(1.0, 1.0 + f64::EPSILON, 0.999_999) < 1.0 + f64::EPSILON);

        for u in [0.0, 0.25, 0.5, 0.999_999_999] {
            let t = split_threshold(-1e308, 1e308, u);
            assert!(t.is_finite());
            assert!((-1e308..1e308).contains(&t), "threshold {} for u = {}", t, u);
        }
        let t = split_threshold(f64::MIN, f64::MAX, 0.75);
        assert!(t.is_finite() && t < f64::MAX);
    }

    #[test]
    fn test_fit_on_extreme_magnitudes() {
        let rows: Vec<Vec<f64>> = [-1e308, 1e308, 0.0, 1.0, 2.0]
            .iter()
            .map(|&v| vec![v])
            .collect();
        let matrix = FeatureMatrix::from_rows(vec!["v".to_string()], &rows).unwrap();

        let mut forest = IsolationForest::new();
        forest.fit(&matrix, None).unwrap();

        let scores = forest.decision_function(&matrix).unwrap();
        assert_eq!(scores.len(), 5);
        assert!(scores.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.2447).abs() < 1e-3, "c(256) = {}", c256);
    }

    #[test]
    fn test_scores_bounded() {
        let matrix = cluster_with_outlier();
        let mut forest = IsolationForest::new().with_n_estimators(50);
        forest.fit(&matrix, None).unwrap();

        for score in forest.score_samples(&matrix).unwrap() {
            assert!((-1.0..=0.0).contains(&score), "score {} out of range", score);
        }
    }

    #[test]
    fn test_outlier_has_lowest_score() {
        let matrix = cluster_with_outlier();
        let mut forest = IsolationForest::new().with_random_state(7);
        forest.fit(&matrix, None).unwrap();

        let scores = forest.decision_function(&matrix).unwrap();
        let (lowest, _) = scores
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(lowest, 30);
        assert!(scores[30] < 0.0);
    }

    #[test]
    fn test_fraction_contamination_labels_expected_count() {
        let matrix = cluster_with_outlier();
        let mut forest = IsolationForest::new().with_contamination(Contamination::Fraction(0.02));
        forest.fit(&matrix, None).unwrap();

        let labels = forest.predict(&matrix).unwrap();
        assert_eq!(labels.iter().filter(|&&a| a).count(), 1);
        assert!(labels[30]);
    }

    #[test]
    fn test_labels_consistent_with_scores() {
        let matrix = cluster_with_outlier();
        let mut forest = IsolationForest::new().with_contamination(Contamination::Fraction(0.2));
        forest.fit(&matrix, None).unwrap();

        let scores = forest.decision_function(&matrix).unwrap();
        let labels = forest.predict(&matrix).unwrap();
        for (score, anomalous) in scores.iter().zip(&labels) {
            assert_eq!(*anomalous, *score < 0.0);
        }
    }

    #[test]
    fn test_deterministic_for_seed() {
        let matrix = cluster_with_outlier();

        let mut a = IsolationForest::new().with_random_state(3);
        let mut b = IsolationForest::new().with_random_state(3);
        a.fit(&matrix, None).unwrap();
        b.fit(&matrix, None).unwrap();

        assert_eq!(
            a.score_samples(&matrix).unwrap(),
            b.score_samples(&matrix).unwrap()
        );
    }

    #[test]
    fn test_constant_data_is_not_anomalous() {
        let rows = vec![vec![5.0]; 10];
        let matrix = FeatureMatrix::from_rows(vec!["v".to_string()], &rows).unwrap();
        let mut forest = IsolationForest::new();
        forest.fit(&matrix, None).unwrap();

        // Every tree is a single leaf, so all rows share the neutral score.
        let scores = forest.decision_function(&matrix).unwrap();
        assert!(scores.windows(2).all(|w| w[0] == w[1]));
        assert!(scores[0].abs() < 1e-9);
    }

    #[test]
    fn test_single_row() {
        let matrix = FeatureMatrix::from_rows(vec!["v".to_string()], &[vec![1.0]]).unwrap();
        let mut forest = IsolationForest::new();
        forest.fit(&matrix, None).unwrap();
        assert_eq!(forest.predict(&matrix).unwrap(), vec![false]);
    }

    #[test]
    fn test_cancelled_fit() {
        let matrix = cluster_with_outlier();
        let token = CancellationToken::new();
        token.cancel();

        let mut forest = IsolationForest::new();
        let err = forest.fit(&matrix, Some(&token)).unwrap_err();
        assert!(err.is_cancelled());
        assert!(!forest.is_fitted());
    }

    #[test]
    fn test_score_before_fit_errors() {
        let matrix = cluster_with_outlier();
        assert!(IsolationForest::new().score_samples(&matrix).is_err());
    }

    #[test]
    fn test_quantile_interpolates() {
        assert_eq!(quantile(&[4.0, 1.0, 3.0, 2.0], 0.5), 2.5);
        assert_eq!(quantile(&[1.0, 2.0], 0.0), 1.0);
        assert_eq!(quantile(&[1.0, 2.0], 1.0), 2.0);
    }
}
