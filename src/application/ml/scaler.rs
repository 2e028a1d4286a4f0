use serde::{Deserialize, Serialize};

/// Per-column standardization fitted on the training matrix and persisted
/// inside every model artifact, so serving scales inputs exactly the way
/// training did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl FeatureScaler {
    /// Fits column means and population standard deviations. Constant
    /// columns get a unit scale so they pass through centered.
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let Some(first) = rows.first() else {
            return Self {
                means: Vec::new(),
                stds: Vec::new(),
            };
        };
        let columns = first.len();
        let count = rows.len() as f64;

        let mut means = vec![0.0; columns];
        for row in rows {
            for (sum, value) in means.iter_mut().zip(row) {
                *sum += value;
            }
        }
        for sum in &mut means {
            *sum /= count;
        }

        let mut stds = vec![0.0; columns];
        for row in rows {
            for ((sum, value), mean) in stds.iter_mut().zip(row).zip(&means) {
                *sum += (value - mean).powi(2);
            }
        }
        for sum in &mut stds {
            let std = (*sum / count).sqrt();
            *sum = if std <= f64::EPSILON { 1.0 } else { std };
        }

        Self { means, stds }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(&self.means)
            .zip(&self.stds)
            .map(|((value, mean), std)| (value - mean) / std)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    pub fn width(&self) -> usize {
        self.means.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardizes_columns_independently() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![5.0, 10.0]];
        let scaler = FeatureScaler::fit(&rows);
        assert_eq!(scaler.width(), 2);

        let scaled = scaler.transform(&rows);
        // First column: mean 3, population std sqrt(8/3).
        let std = (8.0_f64 / 3.0).sqrt();
        assert!((scaled[0][0] - (1.0 - 3.0) / std).abs() < 1e-12);
        assert!((scaled[2][0] - (5.0 - 3.0) / std).abs() < 1e-12);
        // Constant column centers to zero with unit scale.
        assert_eq!(scaled[0][1], 0.0);
        assert_eq!(scaled[1][1], 0.0);
    }

    #[test]
    fn test_transform_matches_fit_statistics() {
        let rows = vec![vec![2.0], vec![4.0]];
        let scaler = FeatureScaler::fit(&rows);
        let out = scaler.transform_row(&[3.0]);
        assert!((out[0] - 0.0).abs() < 1e-12);
        let out = scaler.transform_row(&[4.0]);
        assert!((out[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_survives_serde_round_trip() {
        let rows = vec![vec![1.0, 2.0], vec![5.0, 8.0]];
        let scaler = FeatureScaler::fit(&rows);
        let encoded = serde_json::to_string(&scaler).unwrap();
        let decoded: FeatureScaler = serde_json::from_str(&encoded).unwrap();
        assert_eq!(scaler, decoded);
    }
}
