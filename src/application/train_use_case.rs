// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load CSV, build features,    (Layer 4 - data)
//           fit scalers, build windows
//   Step 2: Chronological split          (Layer 4 - data)
//   Step 3: Save config + scalers        (Layer 6 - infra)
//   Step 4: Run training loop            (Layer 5 - ml)
//   Step 5: Score best model on test     (Layer 5 - ml)
//   Step 6: Write reports                (Layer 6 - infra)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::application::pipeline::prepare;
use crate::data::{
    dataset::SequenceDataset,
    features::FeatureConfig,
    splitter::{split_chronological, SplitSizes},
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::MetricsLogger,
    report::{write_reports, ReportPaths},
};
use crate::ml::{
    backend::ComputeBackend,
    evaluator::{evaluate, Evaluation},
    inferencer::run_inference,
    model::HybridModelConfig,
    scheduler::PlateauConfig,
    trainer::{run_training, TrainingReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything needed to rebuild the pipeline and the model.
// Saved as train_config.json next to the checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_path:      String,
    pub checkpoint_dir: String,
    pub date_column:    String,
    pub features:       FeatureConfig,

    pub seq_len:        usize,
    pub train_fraction: f64,
    pub val_fraction:   f64,

    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,

    pub conv_filters:   usize,
    pub kernel_size:    usize,
    pub lstm_hidden:    usize,
    pub attention_dim:  usize,
    pub dense_units:    usize,
    pub dropout:        f64,

    pub lr_factor:      f64,
    pub lr_patience:    usize,
    pub min_lr:         f64,
    pub min_delta:      f64,
    pub lr_cooldown:    usize,

    /// Stop after this many epochs without improvement. Off when None.
    pub early_stop_patience: Option<usize>,
    /// Clip the global gradient L2 norm. Off when None.
    pub clip_grad_norm:      Option<f32>,

    pub seed:           u64,
    pub backend:        ComputeBackend,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path:      "data/observations.csv".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            date_column:    "date".to_string(),
            features:       FeatureConfig::default(),
            seq_len:        30,
            train_fraction: 0.7,
            val_fraction:   0.15,
            batch_size:     32,
            epochs:         50,
            lr:             1e-3,
            conv_filters:   32,
            kernel_size:    3,
            lstm_hidden:    64,
            attention_dim:  32,
            dense_units:    64,
            dropout:        0.2,
            lr_factor:      0.5,
            lr_patience:    5,
            min_lr:         1e-6,
            min_delta:      1e-4,
            lr_cooldown:    0,
            early_stop_patience: None,
            clip_grad_norm:      None,
            seed:           42,
            backend:        ComputeBackend::default(),
        }
    }
}

impl TrainConfig {
    /// Reject settings that would fail later or train nothing.
    pub fn validate(&self) -> Result<()> {
        self.features.validate()?;
        if self.seq_len == 0 {
            bail!("seq_len must be at least 1");
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            bail!("train_fraction must be in (0, 1), got {}", self.train_fraction);
        }
        if !(self.val_fraction > 0.0 && self.train_fraction + self.val_fraction <= 1.0) {
            bail!(
                "val_fraction must be positive and leave room after train_fraction, got {}",
                self.val_fraction
            );
        }
        if self.batch_size == 0 || self.epochs == 0 {
            bail!("batch_size and epochs must be at least 1");
        }
        if !(self.lr > 0.0) {
            bail!("learning rate must be positive, got {}", self.lr);
        }
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            bail!("kernel_size must be odd, got {}", self.kernel_size);
        }
        if [self.conv_filters, self.lstm_hidden, self.attention_dim, self.dense_units]
            .contains(&0)
        {
            bail!("model layer sizes must be at least 1");
        }
        if !(0.0..1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1), got {}", self.dropout);
        }
        if !(self.lr_factor > 0.0 && self.lr_factor < 1.0) {
            bail!("lr_factor must be in (0, 1), got {}", self.lr_factor);
        }
        if self.min_lr < 0.0 || self.min_delta < 0.0 {
            bail!("min_lr and min_delta must not be negative");
        }
        if self.early_stop_patience == Some(0) {
            bail!("early_stop_patience must be at least 1");
        }
        if matches!(self.clip_grad_norm, Some(c) if !(c > 0.0)) {
            bail!("clip_grad_norm must be positive");
        }
        Ok(())
    }

    pub fn model_config(&self, n_features: usize) -> HybridModelConfig {
        HybridModelConfig::new(n_features)
            .with_conv_filters(self.conv_filters)
            .with_kernel_size(self.kernel_size)
            .with_lstm_hidden(self.lstm_hidden)
            .with_attention_dim(self.attention_dim)
            .with_dense_units(self.dense_units)
            .with_dropout(self.dropout)
    }

    pub fn plateau(&self) -> PlateauConfig {
        PlateauConfig {
            factor:    self.lr_factor,
            patience:  self.lr_patience,
            min_lr:    self.min_lr,
            min_delta: self.min_delta,
            cooldown:  self.lr_cooldown,
        }
    }
}

/// What a finished training run produced.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub sizes:      SplitSizes,
    pub n_features: usize,
    pub training:   TrainingReport,
    /// None when the test block is empty.
    pub test:       Option<Evaluation>,
    pub reports:    Option<ReportPaths>,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Features, scalers, windows ───────────────────────────────
        tracing::info!("Loading observations from '{}'", cfg.data_path);
        let prepared   = prepare(cfg, &cfg.data_path, None)?;
        let n_features = prepared.normalized.n_features();
        let sizes      = prepared.sizes;

        // ── Step 2: Chronological split ───────────────────────────────────────
        let (train, val, test) = split_chronological(prepared.samples, sizes);
        tracing::info!(
            "Split: {} train, {} validation, {} test windows",
            train.len(), val.len(), test.len()
        );

        // ── Step 3: Save config + scalers for evaluate / predict ──────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.clear_best()?;
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_normalizer(&prepared.normalizer)?;

        // ── Step 4: Run training loop (Layer 5) ───────────────────────────────
        let logger   = MetricsLogger::create(&cfg.checkpoint_dir)?;
        let training = run_training(
            cfg,
            n_features,
            SequenceDataset::new(train),
            SequenceDataset::new(val),
            &ckpt_manager,
            &logger,
        )?;

        // ── Step 5 + 6: Score the best checkpoint on the test block ───────────
        if test.is_empty() {
            tracing::warn!("Test block is empty; skipping test evaluation");
            return Ok(TrainSummary { sizes, n_features, training, test: None, reports: None });
        }

        let outputs    = run_inference(cfg.backend, &ckpt_manager, cfg, n_features, &test)?;
        let evaluation = evaluate(&test, &outputs.predictions, &prepared.normalizer)?;
        let reports    = write_reports(
            ckpt_manager.dir(),
            "test",
            training.best_epoch,
            &evaluation,
            &outputs.mean_attention,
        )?;

        Ok(TrainSummary {
            sizes,
            n_features,
            training,
            test: Some(evaluation),
            reports: Some(reports),
        })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{generate, write_csv, SyntheticConfig};
    use crate::ml::model::HybridLstModel;

    #[test]
    fn test_default_config_is_valid() {
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            TrainConfig { seq_len: 0, ..TrainConfig::default() },
            TrainConfig { train_fraction: 1.0, ..TrainConfig::default() },
            TrainConfig { val_fraction: 0.4, ..TrainConfig::default() },
            TrainConfig { kernel_size: 4, ..TrainConfig::default() },
            TrainConfig { dropout: 1.0, ..TrainConfig::default() },
            TrainConfig { lr: 0.0, ..TrainConfig::default() },
            TrainConfig { early_stop_patience: Some(0), ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "accepted {cfg:?}");
        }
    }

    #[test]
    fn test_model_config_follows_train_config() {
        let cfg = TrainConfig { conv_filters: 8, kernel_size: 5, ..TrainConfig::default() };
        let model = cfg.model_config(12);
        assert_eq!(model.n_features, 12);
        assert_eq!(model.conv_filters, 8);
        assert_eq!(model.kernel_size, 5);
    }

    #[test]
    fn test_end_to_end_on_synthetic_data() {
        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("obs.csv");
        let rows = generate(&SyntheticConfig { days: 220, ..SyntheticConfig::default() }).unwrap();
        write_csv(&data, &rows).unwrap();

        let cfg = TrainConfig {
            data_path:      data.to_string_lossy().into_owned(),
            checkpoint_dir: dir.path().join("ckpt").to_string_lossy().into_owned(),
            seq_len:        10,
            batch_size:     16,
            epochs:         2,
            conv_filters:   4,
            lstm_hidden:    8,
            attention_dim:  4,
            dense_units:    8,
            backend:        ComputeBackend::NdArray,
            ..TrainConfig::default()
        };

        let summary = TrainUseCase::new(cfg.clone()).execute().unwrap();
        assert_eq!(summary.training.history.len(), 2);
        assert_eq!(summary.n_features, cfg.features.feature_names().len());

        let test = summary.test.expect("test block should not be empty");
        assert_eq!(test.records.len(), summary.sizes.test);
        assert!(test.metrics.rmse.is_finite());

        let reports = summary.reports.unwrap();
        assert!(reports.predictions.exists());
        assert!(reports.evaluation.exists());
        assert!(reports.attention.exists());

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        assert_eq!(ckpt.load_config().unwrap(), cfg);
        assert!(ckpt.load_normalizer().is_ok());
    }
    #[test]
    fn test_failed_run_leaves_no_stale_best_model() {
        let dir  = tempfile::tempdir().unwrap();
        let data = dir.path().join("obs.csv");
        let rows = generate(&SyntheticConfig { days: 150, ..SyntheticConfig::default() }).unwrap();
        write_csv(&data, &rows).unwrap();

        let ckpt_dir = dir.path().join("ckpt");
        let ckpt     = CheckpointManager::new(&ckpt_dir).unwrap();
        let earlier: HybridLstModel<burn::backend::NdArray> =
            HybridModelConfig::new(3).with_conv_filters(4).init(&Default::default());
        ckpt.save_best(&earlier, 5, 0.1).unwrap();

        // rounds to an empty validation block, so training bails
        let cfg = TrainConfig {
            data_path:      data.to_string_lossy().into_owned(),
            checkpoint_dir: ckpt_dir.to_string_lossy().into_owned(),
            seq_len:        7,
            val_fraction:   0.001,
            epochs:         1,
            backend:        ComputeBackend::NdArray,
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg.clone()).execute().unwrap_err();
        assert!(err.to_string().contains("validation set is empty"));

        assert!(ckpt.best_checkpoint().is_err());
        assert_eq!(ckpt.load_config().unwrap(), cfg);
    }
}
