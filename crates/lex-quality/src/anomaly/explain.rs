//! Per-column deviation flags for anomalous rows.

use super::feature_matrix::FeatureMatrix;

/// Mean and sample standard deviation of one feature column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub mean: f64,
    pub std: f64,
}

impl ColumnStats {
    fn from_values(values: impl Iterator<Item = f64>) -> Self {
        let values: Vec<f64> = values.collect();
        let n = values.len() as f64;

        if values.is_empty() {
            return Self { mean: 0.0, std: 0.0 };
        }

        let mean = values.iter().sum::<f64>() / n;
        if n <= 1.0 {
            return Self { mean, std: 0.0 };
        }

        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Self {
            mean,
            std: variance.sqrt(),
        }
    }

    /// True if `value` is more than `threshold` standard deviations from the
    /// mean. A column without spread never deviates.
    pub fn deviates(&self, value: f64, threshold: f64) -> bool {
        self.std > 0.0 && (value - self.mean).abs() > threshold * self.std
    }
}

/// Column statistics of the whole matrix plus the threshold used to explain
/// rows.
#[derive(Debug, Clone)]
pub struct DeviationExplainer {
    stats: Vec<ColumnStats>,
    threshold: f64,
}

impl DeviationExplainer {
    /// Compute per-column statistics once over every row of `matrix`.
    pub fn fit(matrix: &FeatureMatrix, threshold: f64) -> Self {
        let stats = (0..matrix.n_features())
            .map(|feature| ColumnStats::from_values(matrix.column_values(feature)))
            .collect();
        Self { stats, threshold }
    }

    pub fn stats(&self) -> &[ColumnStats] {
        &self.stats
    }

    /// Names of the columns of matrix row `row` that deviate, in column order.
    pub fn problem_columns(&self, matrix: &FeatureMatrix, row: usize) -> Vec<String> {
        matrix
            .row(row)
            .iter()
            .zip(&self.stats)
            .zip(matrix.columns())
            .filter(|((value, stats), _)| stats.deviates(**value, self.threshold))
            .map(|(_, name)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_std() {
        let stats = ColumnStats::from_values([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].into_iter());
        assert_eq!(stats.mean, 5.0);
        assert!((stats.std - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn test_constant_column_never_deviates() {
        let stats = ColumnStats::from_values([0.1, 0.1, 0.1].into_iter());
        assert!(!stats.deviates(0.1, 2.0));
    }

    #[test]
    fn test_problem_columns_use_whole_matrix_stats() {
        let mut rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![10.0 + (i % 3) as f64 * 0.5, 100.0 + (i % 4) as f64])
            .collect();
        rows.push(vec![500.0, 101.0]);
        let matrix =
            FeatureMatrix::from_rows(vec!["value".to_string(), "other".to_string()], &rows)
                .unwrap();

        let explainer = DeviationExplainer::fit(&matrix, 2.0);

        assert_eq!(explainer.problem_columns(&matrix, 20), vec!["value".to_string()]);
        assert!(explainer.problem_columns(&matrix, 0).is_empty());
    }
}
