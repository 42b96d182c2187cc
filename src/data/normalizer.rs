// ============================================================
// Layer 4 - Normalizer
// ============================================================
// Features are standardised (zero mean, unit variance), the
// LST target is min-max scaled to [0, 1].
//
// Scalers are fitted on the leading rows that training windows
// can see, never on validation or test rows. The fitted
// Normalizer is saved next to the checkpoint so evaluation and
// forecasting apply the same transform and can map model
// output back to degrees.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::series::FeatureFrame;
use crate::domain::traits::Scaler;

const MIN_SCALE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: f64,
    pub std:  f64,
}

impl StandardScaler {
    /// Population mean and standard deviation. A constant column
    /// gets std 1 so it maps to zero instead of dividing by zero.
    pub fn fit(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self { mean: 0.0, std: 1.0 };
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = var.sqrt();
        Self { mean, std: if std < MIN_SCALE { 1.0 } else { std } }
    }
}

impl Scaler for StandardScaler {
    fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    fn inverse(&self, value: f64) -> f64 {
        value * self.std + self.mean
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Self {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min.is_finite() && max.is_finite() {
            Self { min, max }
        } else {
            Self { min: 0.0, max: 1.0 }
        }
    }

    fn range(&self) -> f64 {
        let r = self.max - self.min;
        if r < MIN_SCALE { 1.0 } else { r }
    }
}

impl Scaler for MinMaxScaler {
    fn transform(&self, value: f64) -> f64 {
        (value - self.min) / self.range()
    }

    fn inverse(&self, value: f64) -> f64 {
        value * self.range() + self.min
    }
}

/// Feature rows and target in model space.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFrame {
    pub dates:    Vec<NaiveDate>,
    pub features: Vec<Vec<f32>>,
    pub target:   Vec<f32>,
}

impl NormalizedFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }
}

/// All scalers for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    pub feature_names: Vec<String>,
    pub features:      Vec<StandardScaler>,
    pub target:        MinMaxScaler,
}

impl Normalizer {
    /// Fit on the first `fit_rows` rows of the frame.
    pub fn fit(frame: &FeatureFrame, fit_rows: usize) -> Result<Self> {
        let rows = fit_rows.min(frame.len());
        if rows == 0 {
            bail!("cannot fit scalers on zero rows");
        }

        let features = (0..frame.n_features())
            .map(|j| {
                let column: Vec<f64> = frame.features[..rows].iter().map(|r| r[j]).collect();
                StandardScaler::fit(&column)
            })
            .collect();
        let target = MinMaxScaler::fit(&frame.target[..rows]);

        tracing::debug!(
            "Fitted scalers on {} rows; target range [{:.3}, {:.3}]",
            rows,
            target.min,
            target.max
        );

        Ok(Self { feature_names: frame.feature_names.clone(), features, target })
    }

    pub fn transform(&self, frame: &FeatureFrame) -> Result<NormalizedFrame> {
        if frame.feature_names != self.feature_names {
            bail!(
                "feature layout mismatch: scalers were fitted on {:?}, frame has {:?}",
                self.feature_names,
                frame.feature_names
            );
        }

        let features = frame
            .features
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&self.features)
                    .map(|(&v, s)| s.transform(v) as f32)
                    .collect()
            })
            .collect();
        let target = frame.target.iter().map(|&y| self.target.transform(y) as f32).collect();

        Ok(NormalizedFrame { dates: frame.dates.clone(), features, target })
    }

    /// Map a scaled model output back to LST units.
    pub fn inverse_target(&self, value: f64) -> f64 {
        self.target.inverse(value)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> FeatureFrame {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        FeatureFrame {
            dates:         start.iter_days().take(4).collect(),
            feature_names: vec!["a".to_string(), "c".to_string()],
            features:      vec![
                vec![1.0, 5.0],
                vec![3.0, 5.0],
                vec![5.0, 5.0],
                vec![100.0, 5.0],
            ],
            target:        vec![10.0, 20.0, 30.0, 50.0],
        }
    }

    #[test]
    fn test_standard_scaler() {
        let s = StandardScaler::fit(&[1.0, 3.0]);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.std, 1.0);
        assert_eq!(s.transform(3.0), 1.0);
        assert_eq!(s.inverse(-1.0), 1.0);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let s = StandardScaler::fit(&[5.0, 5.0, 5.0]);
        assert_eq!(s.transform(5.0), 0.0);
    }

    #[test]
    fn test_min_max_scaler() {
        let s = MinMaxScaler::fit(&[10.0, 30.0, 20.0]);
        assert_eq!(s.transform(10.0), 0.0);
        assert_eq!(s.transform(30.0), 1.0);
        assert!((s.inverse(0.25) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_uses_only_leading_rows() {
        let n = Normalizer::fit(&frame(), 3).unwrap();
        // Outlier in row 3 must not leak into the scalers.
        assert_eq!(n.features[0].mean, 3.0);
        assert_eq!(n.target.min, 10.0);
        assert_eq!(n.target.max, 30.0);

        let t = n.transform(&frame()).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.target[2], 1.0);
        // Values outside the fitted range are not clipped.
        assert_eq!(t.target[3], 2.0);
        assert_eq!(t.features[1][1], 0.0);
    }

    #[test]
    fn test_inverse_target_restores_units() {
        let n = Normalizer::fit(&frame(), 4).unwrap();
        let t = n.transform(&frame()).unwrap();
        for (scaled, raw) in t.target.iter().zip(&frame().target) {
            assert!((n.inverse_target(*scaled as f64) - raw).abs() < 1e-4);
        }
    }

    #[test]
    fn test_feature_mismatch_is_an_error() {
        let n = Normalizer::fit(&frame(), 4).unwrap();
        let mut other = frame();
        other.feature_names[1] = "b".to_string();
        assert!(n.transform(&other).is_err());
    }

    #[test]
    fn test_zero_fit_rows_is_an_error() {
        assert!(Normalizer::fit(&frame(), 0).is_err());
    }
}
