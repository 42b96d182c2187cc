// ============================================================
// Layer 4 - Feature Builder
// ============================================================
// Turns a forward-filled DailySeries into a FeatureFrame.
//
// Columns produced, in this order:
//   1. raw inputs                 sunspot_number, ...
//   2. the target itself          lst           (target_as_feature)
//   3. trailing rolling means     sunspot_number_roll7, ...
//   4. input lags                 sunspot_number_lag1, ...
//   5. target lags                lst_lag1, ...  (lag_target)
//   6. day-of-year on the circle  doy_sin, doy_cos
//
// Rolling windows and lags are undefined for the first rows;
// any row with a missing feature or target is dropped.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::PI;

use crate::domain::series::{DailySeries, FeatureFrame};

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub input_columns:      Vec<String>,
    pub target_column:      String,
    pub rolling_windows:    Vec<usize>,
    pub lags:               Vec<usize>,
    pub lag_target:         bool,
    pub target_as_feature:  bool,
    pub cyclic_day_of_year: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            input_columns:      vec![
                "solar_flare_intensity".to_string(),
                "sunspot_number".to_string(),
            ],
            target_column:      "lst".to_string(),
            rolling_windows:    vec![7, 30],
            lags:               vec![1, 3, 7],
            lag_target:         true,
            target_as_feature:  true,
            cyclic_day_of_year: true,
        }
    }
}

impl FeatureConfig {
    /// Columns the loader must read: inputs followed by the target.
    pub fn source_columns(&self) -> Vec<String> {
        let mut cols = self.input_columns.clone();
        cols.push(self.target_column.clone());
        cols
    }

    pub fn validate(&self) -> Result<()> {
        if self.input_columns.is_empty() {
            bail!("at least one input column is required");
        }
        if self.input_columns.contains(&self.target_column) {
            bail!("target '{}' is also listed as an input column", self.target_column);
        }
        let unique: HashSet<&String> = self.input_columns.iter().collect();
        if unique.len() != self.input_columns.len() {
            bail!("input columns contain duplicates");
        }
        if self.rolling_windows.iter().any(|&w| w == 0) {
            bail!("rolling windows must be at least 1 day");
        }
        if self.lags.iter().any(|&k| k == 0) {
            bail!("lags must be at least 1 day");
        }

        // repeated windows or lags, or an input named like a generated
        // column, would produce the same feature twice
        let mut seen = HashSet::new();
        for name in self.feature_names() {
            if !seen.insert(name.clone()) {
                bail!("feature '{}' would be generated twice", name);
            }
        }
        Ok(())
    }

    /// Feature names in the exact column order `FeatureBuilder` emits.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.input_columns.clone();
        if self.target_as_feature {
            names.push(self.target_column.clone());
        }
        for col in &self.input_columns {
            for w in &self.rolling_windows {
                names.push(format!("{col}_roll{w}"));
            }
        }
        for col in &self.input_columns {
            for k in &self.lags {
                names.push(format!("{col}_lag{k}"));
            }
        }
        if self.lag_target {
            for k in &self.lags {
                names.push(format!("{}_lag{k}", self.target_column));
            }
        }
        if self.cyclic_day_of_year {
            names.push("doy_sin".to_string());
            names.push("doy_cos".to_string());
        }
        names
    }
}

pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn build(&self, series: &DailySeries) -> Result<FeatureFrame> {
        let cfg = &self.config;
        if series.is_empty() {
            bail!("series has no days to build features from");
        }

        let column = |name: &str| -> Result<&[Option<f64>]> {
            series
                .column(name)
                .map(|c| c.values.as_slice())
                .with_context(|| format!("series has no column '{name}'"))
        };
        let inputs = cfg
            .input_columns
            .iter()
            .map(|c| column(c))
            .collect::<Result<Vec<_>>>()?;
        let target = column(&cfg.target_column)?;

        // Same order as FeatureConfig::feature_names
        let mut features: Vec<Vec<Option<f64>>> = inputs.iter().map(|v| v.to_vec()).collect();
        if cfg.target_as_feature {
            features.push(target.to_vec());
        }
        for values in &inputs {
            for &w in &cfg.rolling_windows {
                features.push(rolling_mean(values, w));
            }
        }
        for values in &inputs {
            for &k in &cfg.lags {
                features.push(lag(values, k));
            }
        }
        if cfg.lag_target {
            for &k in &cfg.lags {
                features.push(lag(target, k));
            }
        }
        if cfg.cyclic_day_of_year {
            let (sin, cos): (Vec<_>, Vec<_>) = series
                .dates
                .iter()
                .map(|&d| {
                    let (s, c) = day_of_year_encoding(d);
                    (Some(s), Some(c))
                })
                .unzip();
            features.push(sin);
            features.push(cos);
        }

        let feature_names = cfg.feature_names();
        debug_assert_eq!(feature_names.len(), features.len());

        let mut frame = FeatureFrame {
            dates:         Vec::new(),
            feature_names,
            features:      Vec::new(),
            target:        Vec::new(),
        };

        for (row, date) in series.dates.iter().enumerate() {
            let Some(y) = target[row] else { continue };
            let values: Option<Vec<f64>> = features.iter().map(|col| col[row]).collect();
            if let Some(values) = values {
                frame.dates.push(*date);
                frame.features.push(values);
                frame.target.push(y);
            }
        }

        let dropped = series.len() - frame.len();
        tracing::info!(
            "Built {} features for {} complete rows ({} incomplete rows dropped)",
            frame.n_features(),
            frame.len(),
            dropped
        );

        if frame.is_empty() {
            bail!(
                "no complete rows after feature engineering ({} input rows); \
                 the series may be shorter than the largest window or lag",
                series.len()
            );
        }
        Ok(frame)
    }
}

/// Trailing mean over `window` rows ending at each row.
/// Missing until a full window of observed values exists.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if window == 0 {
        return out;
    }
    for t in window.saturating_sub(1)..values.len() {
        let slice = &values[t + 1 - window..=t];
        if slice.iter().all(Option::is_some) {
            let sum: f64 = slice.iter().flatten().sum();
            out[t] = Some(sum / window as f64);
        }
    }
    out
}

/// Shift values `k` rows forward in time: `out[t] = values[t - k]`.
pub fn lag(values: &[Option<f64>], k: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|t| if t >= k { values[t - k] } else { None })
        .collect()
}

/// Position of the date within the year as a point on the unit circle,
/// so 31 December and 1 January end up next to each other.
pub fn day_of_year_encoding(date: NaiveDate) -> (f64, f64) {
    let angle = 2.0 * PI * date.ordinal() as f64 / DAYS_PER_YEAR;
    (angle.sin(), angle.cos())
}
