// ============================================================
// Layer 5 - Evaluator
// ============================================================
// Maps scaled predictions back to LST units and scores them.
//
//   MAE  = mean |y - ŷ|
//   RMSE = sqrt(mean (y - ŷ)²)
//   MAPE = 100 · mean |(y - ŷ) / y|      over |y| > 1e-8
//   R²   = 1 - SS_res / SS_tot

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::dataset::SequenceSample;
use crate::data::normalizer::Normalizer;

const MAPE_EPSILON: f64 = 1e-8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub count: usize,
    pub mae:   f64,
    pub rmse:  f64,
    /// Percent. Absent when every target is (close to) zero.
    pub mape:  Option<f64>,
    /// Absent when the targets have zero variance.
    pub r2:    Option<f64>,
}

pub fn regression_metrics(actual: &[f64], predicted: &[f64]) -> Result<RegressionMetrics> {
    if actual.len() != predicted.len() {
        bail!(
            "length mismatch: {} targets vs {} predictions",
            actual.len(),
            predicted.len()
        );
    }
    if actual.is_empty() {
        bail!("cannot compute metrics on zero samples");
    }

    let n = actual.len() as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum  = 0.0;
    let mut pct_sum = 0.0;
    let mut pct_n   = 0usize;

    for (&y, &p) in actual.iter().zip(predicted) {
        let err = y - p;
        abs_sum += err.abs();
        sq_sum  += err * err;
        if y.abs() > MAPE_EPSILON {
            pct_sum += (err / y).abs();
            pct_n   += 1;
        }
    }

    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|y| (y - mean).powi(2)).sum();

    Ok(RegressionMetrics {
        count: actual.len(),
        mae:   abs_sum / n,
        rmse:  (sq_sum / n).sqrt(),
        mape:  (pct_n > 0).then(|| 100.0 * pct_sum / pct_n as f64),
        r2:    (ss_tot > 0.0).then(|| 1.0 - sq_sum / ss_tot),
    })
}

/// One scored day, in LST units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub date:      NaiveDate,
    pub actual:    f64,
    pub predicted: f64,
    pub residual:  f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub metrics: RegressionMetrics,
    pub records: Vec<PredictionRecord>,
}

/// Score `scaled_predictions` (one per sample, model units)
/// against the samples' targets after undoing the target scaling.
pub fn evaluate(
    samples:            &[SequenceSample],
    scaled_predictions: &[f32],
    normalizer:         &Normalizer,
) -> Result<Evaluation> {
    if samples.len() != scaled_predictions.len() {
        bail!(
            "{} windows but {} predictions",
            samples.len(),
            scaled_predictions.len()
        );
    }

    let records: Vec<PredictionRecord> = samples
        .iter()
        .zip(scaled_predictions)
        .map(|(s, &p)| {
            let actual    = normalizer.inverse_target(s.target as f64);
            let predicted = normalizer.inverse_target(p as f64);
            PredictionRecord { date: s.date, actual, predicted, residual: actual - predicted }
        })
        .collect();

    let actual: Vec<f64>    = records.iter().map(|r| r.actual).collect();
    let predicted: Vec<f64> = records.iter().map(|r| r.predicted).collect();
    let metrics = regression_metrics(&actual, &predicted)?;

    tracing::info!(
        "Evaluated {} days: MAE={:.3} RMSE={:.3}",
        metrics.count, metrics.mae, metrics.rmse
    );
    Ok(Evaluation { metrics, records })
}
