// ============================================================
// Layer 2 - Evaluate Use Case
// ============================================================
// Re-scores the best checkpoint on a CSV using the saved config
// and scalers:
//
//   1. Rebuild windows exactly as training did
//   2. Keep the test block (or every window with `all`)
//   3. Run inference, undo target scaling, compute metrics
//   4. Write predictions.csv / evaluation.json / attention.csv

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::application::pipeline::prepare;
use crate::data::splitter::split_chronological;
use crate::infra::{checkpoint::CheckpointManager, report::write_reports};
use crate::ml::{
    backend::ComputeBackend,
    evaluator::{evaluate, Evaluation},
    inferencer::run_inference,
};

#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    pub checkpoint_dir: String,
    /// Defaults to the CSV the model was trained on.
    pub data_path:      Option<String>,
    /// Score every window instead of only the test block.
    pub all:            bool,
    /// Defaults to the backend used for training.
    pub backend:        Option<ComputeBackend>,
    /// Defaults to the checkpoint directory.
    pub output_dir:     Option<String>,
}

pub struct EvaluateUseCase {
    request: EvaluateRequest,
}

impl EvaluateUseCase {
    pub fn new(request: EvaluateRequest) -> Self {
        Self { request }
    }

    pub fn execute(&self) -> Result<Evaluation> {
        let req  = &self.request;
        let ckpt = CheckpointManager::new(&req.checkpoint_dir)?;
        let cfg  = ckpt.load_config()?;
        cfg.validate()
            .context("saved train_config.json is invalid; retrain or fix the file")?;
        let normalizer = ckpt.load_normalizer()?;
        let best       = ckpt.best_checkpoint()?;

        let data_path = req.data_path.as_deref().unwrap_or(&cfg.data_path);
        tracing::info!("Evaluating checkpoint from epoch {} on '{}'", best.epoch, data_path);

        let prepared = prepare(&cfg, data_path, Some(normalizer))?;
        let n_features = prepared.normalized.n_features();

        let (split, samples) = if req.all {
            ("all", prepared.samples)
        } else {
            let (_, _, test) = split_chronological(prepared.samples, prepared.sizes);
            ("test", test)
        };
        if samples.is_empty() {
            bail!("no windows to evaluate in the '{}' block", split);
        }

        let backend    = req.backend.unwrap_or(cfg.backend);
        let outputs    = run_inference(backend, &ckpt, &cfg, n_features, &samples)?;
        let evaluation = evaluate(&samples, &outputs.predictions, &prepared.normalizer)?;

        let out_dir = req
            .output_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| ckpt.dir().to_path_buf());
        write_reports(&out_dir, split, best.epoch, &evaluation, &outputs.mean_attention)?;

        Ok(evaluation)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainSummary, TrainUseCase};
    use crate::data::synthetic::{generate, write_csv, SyntheticConfig};
    use crate::infra::report::EvaluationReport;
    use std::path::Path;

    fn train_tiny(dir: &Path) -> (TrainConfig, TrainSummary) {
        let data = dir.join("obs.csv");
        let rows = generate(&SyntheticConfig { days: 150, ..SyntheticConfig::default() }).unwrap();
        write_csv(&data, &rows).unwrap();

        let cfg = TrainConfig {
            data_path:      data.to_string_lossy().into_owned(),
            checkpoint_dir: dir.join("ckpt").to_string_lossy().into_owned(),
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
        let summary = TrainUseCase::new(cfg.clone()).execute().unwrap();
        (cfg, summary)
    }

    fn request(cfg: &TrainConfig, all: bool, output_dir: Option<String>) -> EvaluateRequest {
        EvaluateRequest {
            checkpoint_dir: cfg.checkpoint_dir.clone(),
            data_path:      None,
            all,
            backend:        None,
            output_dir,
        }
    }

    #[test]
    fn test_evaluate_test_block_and_all_windows() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, summary) = train_tiny(dir.path());
        let out = dir.path().join("reports");

        let test = EvaluateUseCase::new(request(&cfg, false, None)).execute().unwrap();
        assert_eq!(test.records.len(), summary.sizes.test);

        let all = EvaluateUseCase::new(
            request(&cfg, true, Some(out.to_string_lossy().into_owned())),
        )
        .execute()
        .unwrap();
        assert_eq!(all.records.len(), summary.sizes.total());
        // the test block is the tail of all windows
        assert_eq!(all.records.last().unwrap().date, test.records.last().unwrap().date);

        assert!(out.join("predictions.csv").exists());
        assert!(out.join("attention.csv").exists());
        let json = std::fs::read_to_string(out.join("evaluation.json")).unwrap();
        let report: EvaluationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.split, "all");
        assert_eq!(report.metrics.count, summary.sizes.total());
    }

    #[test]
    fn test_empty_test_block_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let (cfg, _) = train_tiny(dir.path());

        // every window goes to train or validation
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir).unwrap();
        ckpt.save_config(&TrainConfig { train_fraction: 0.5, val_fraction: 0.5, ..cfg.clone() })
            .unwrap();

        let err = EvaluateUseCase::new(request(&cfg, false, None)).execute().unwrap_err();
        assert!(err.to_string().contains("no windows to evaluate"));
    }

    #[test]
    fn test_invalid_saved_config_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_config(&TrainConfig { seq_len: 0, ..TrainConfig::default() }).unwrap();

        let req = EvaluateRequest {
            checkpoint_dir: dir.path().to_string_lossy().into_owned(),
            data_path:      None,
            all:            true,
            backend:        None,
            output_dir:     None,
        };
        let err = EvaluateUseCase::new(req).execute().unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }
}
