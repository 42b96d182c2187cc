// ============================================================
// Layer 2 - Predict Use Case
// ============================================================
// Forecasts the LST of the day after the last complete row of a
// CSV, using the most recent `seq_len` feature rows.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::application::pipeline::load_features;
use crate::data::sequence::SequenceBuilder;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{backend::ComputeBackend, inferencer::run_inference};

#[derive(Debug, Clone, Serialize)]
pub struct Forecast {
    pub date: NaiveDate,
    pub lst:  f64,
    /// Mean attention weight per window day, oldest first.
    pub attention: Vec<f32>,
}

pub struct PredictUseCase {
    checkpoint_dir: String,
    data_path:      Option<String>,
    backend:        Option<ComputeBackend>,
}

impl PredictUseCase {
    pub fn new(
        checkpoint_dir: String,
        data_path:      Option<String>,
        backend:        Option<ComputeBackend>,
    ) -> Self {
        Self { checkpoint_dir, data_path, backend }
    }

    pub fn execute(&self) -> Result<Forecast> {
        let ckpt       = CheckpointManager::new(&self.checkpoint_dir)?;
        let cfg        = ckpt.load_config()?;
        cfg.validate()
            .context("saved train_config.json is invalid; retrain or fix the file")?;
        let normalizer = ckpt.load_normalizer()?;

        let data_path  = self.data_path.as_deref().unwrap_or(&cfg.data_path);
        let frame      = load_features(&cfg, data_path)?;
        let normalized = normalizer.transform(&frame)?;

        let window = SequenceBuilder::new(cfg.seq_len)
            .forecast_window(&normalized)
            .with_context(|| {
                format!(
                    "need at least {} complete feature rows to forecast, found {}",
                    cfg.seq_len,
                    normalized.len()
                )
            })?;
        let date = window.date;
        tracing::debug!("Latest scaled inputs: {:?}", window.step(cfg.seq_len - 1));

        let backend = self.backend.unwrap_or(cfg.backend);
        let outputs = run_inference(backend, &ckpt, &cfg, normalized.n_features(), &[window])?;
        let scaled  = outputs
            .predictions
            .first()
            .copied()
            .context("model returned no prediction")?;

        let lst = normalizer.inverse_target(scaled as f64);
        tracing::info!("Forecast for {}: {:.2}", date, lst);
        Ok(Forecast { date, lst, attention: outputs.mean_attention })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use crate::data::synthetic::{generate, write_csv, SyntheticConfig};

    #[test]
    fn test_predict_without_training_mentions_train() {
        let dir = tempfile::tempdir().unwrap();
        let uc  = PredictUseCase::new(dir.path().to_string_lossy().into_owned(), None, None);
        let err = uc.execute().unwrap_err();
        assert!(err.to_string().contains("train"));
    }

    #[test]
    fn test_zero_seq_len_in_saved_config_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_config(&TrainConfig { seq_len: 0, ..TrainConfig::default() }).unwrap();

        let uc  = PredictUseCase::new(dir.path().to_string_lossy().into_owned(), None, None);
        let err = uc.execute().unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_forecast_is_dated_after_last_row() {
        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("obs.csv");
        let rows = generate(&SyntheticConfig {
            days: 120,
            gap_probability: 0.0,
            blank_probability: 0.0,
            ..SyntheticConfig::default()
        })
        .unwrap();
        write_csv(&data, &rows).unwrap();

        let cfg = TrainConfig {
            data_path:      data.to_string_lossy().into_owned(),
            checkpoint_dir: dir.path().join("ckpt").to_string_lossy().into_owned(),
            seq_len:        7,
            batch_size:     16,
            epochs:         1,
            conv_filters:   4,
            lstm_hidden:    4,
            attention_dim:  4,
            dense_units:    4,
            backend:        ComputeBackend::NdArray,
            ..TrainConfig::default()
        };
        TrainUseCase::new(cfg.clone()).execute().unwrap();

        let forecast = PredictUseCase::new(cfg.checkpoint_dir.clone(), None, None)
            .execute()
            .unwrap();
        let last = NaiveDate::parse_from_str(&rows.last().unwrap().date, "%Y-%m-%d").unwrap();
        assert_eq!(forecast.date, last.succ_opt().unwrap());
        assert!(forecast.lst.is_finite());
        assert_eq!(forecast.attention.len(), 7);
    }
}
