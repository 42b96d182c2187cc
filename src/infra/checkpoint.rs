// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Keeps the artifacts of one training run together:
//
//   checkpoints/
//     best_model.mpk*          ← weights of the best epoch so far
//                                (Burn CompactRecorder adds the
//                                extension)
//     best_checkpoint.json     ← which epoch, at what val loss
//     train_config.json        ← everything needed to rebuild
//                                the pipeline and the model
//     scalers.json             ← fitted Normalizer
//
// Only the best model is kept: every improvement overwrites
// the previous one.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::data::normalizer::Normalizer;
use crate::ml::model::HybridLstModel;

const MODEL_FILE:     &str = "best_model";
const MODEL_FILE_MPK: &str = "best_model.mpk";
const BEST_FILE:      &str = "best_checkpoint.json";
const CONFIG_FILE:    &str = "train_config.json";
const SCALER_FILE:    &str = "scalers.json";

/// Pointer to the retained checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestCheckpoint {
    pub epoch:    usize,
    pub val_loss: f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the manager, making the directory (`mkdir -p`) if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrite the best checkpoint with `model`.
    pub fn save_best<B: Backend>(
        &self,
        model:    &HybridLstModel<B>,
        epoch:    usize,
        val_loss: f64,
    ) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.write_json(BEST_FILE, &BestCheckpoint { epoch, val_loss })?;
        tracing::debug!("Saved best checkpoint: epoch {} val_loss {:.6}", epoch, val_loss);
        Ok(())
    }

    /// Load the best checkpoint into a freshly initialised model
    /// of the same architecture.
    pub fn load_best<B: Backend>(
        &self,
        model:  HybridLstModel<B>,
        device: &B::Device,
    ) -> Result<HybridLstModel<B>> {
        let best = self.best_checkpoint()?;
        let path = self.dir.join(MODEL_FILE);
        tracing::info!(
            "Loading checkpoint from epoch {} (val_loss {:.6})",
            best.epoch,
            best.val_loss
        );

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display())
            })?;
        Ok(model.load_record(record))
    }

    pub fn best_checkpoint(&self) -> Result<BestCheckpoint> {
        self.read_json(BEST_FILE)
    }

    /// Remove the best checkpoint left by an earlier run, if any.
    pub fn clear_best(&self) -> Result<()> {
        for name in [BEST_FILE, MODEL_FILE_MPK] {
            let path = self.dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed stale '{}'", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Cannot remove '{}'", path.display()));
                }
            }
        }
        Ok(())
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(CONFIG_FILE)
    }

    pub fn save_normalizer(&self, normalizer: &Normalizer) -> Result<()> {
        self.write_json(SCALER_FILE, normalizer)
    }

    pub fn load_normalizer(&self) -> Result<Normalizer> {
        self.read_json(SCALER_FILE)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| {
                format!(
                    "Cannot read '{}'. Make sure you have run 'train' first.",
                    path.display()
                )
            })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use crate::ml::model::HybridModelConfig;

    type TestBackend = NdArray;

    #[test]
    fn test_config_persists() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("run")).unwrap();

        let cfg = TrainConfig { seq_len: 11, ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        assert_eq!(ckpt.load_config().unwrap().seq_len, 11);
    }

    #[test]
    fn test_missing_artifacts_mention_train() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let err = ckpt.load_normalizer().unwrap_err();
        assert!(err.to_string().contains("train"));
        assert!(ckpt.best_checkpoint().is_err());
    }

    #[test]
    fn test_best_model_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let config = HybridModelConfig::new(3).with_conv_filters(4).with_lstm_hidden(4);

        let model: HybridLstModel<TestBackend> = config.init(&device);
        ckpt.save_best(&model, 7, 0.25).unwrap();
        assert_eq!(ckpt.best_checkpoint().unwrap(), BestCheckpoint { epoch: 7, val_loss: 0.25 });

        let input = Tensor::<TestBackend, 3>::ones([2, 5, 3], &device);
        let expected = model.forward(input.clone()).into_data().to_vec::<f32>().unwrap();

        let fresh: HybridLstModel<TestBackend> = config.init(&device);
        let loaded = ckpt.load_best(fresh, &device).unwrap();
        let actual = loaded.forward(input).into_data().to_vec::<f32>().unwrap();

        // CompactRecorder stores half precision
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-2);
        }
    }

    #[test]
    fn test_clear_best_removes_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let model: HybridLstModel<TestBackend> =
            HybridModelConfig::new(3).with_conv_filters(4).init(&Default::default());

        // nothing to remove yet
        ckpt.clear_best().unwrap();

        ckpt.save_best(&model, 2, 0.5).unwrap();
        assert!(dir.path().join(MODEL_FILE_MPK).exists());

        ckpt.clear_best().unwrap();
        assert!(ckpt.best_checkpoint().is_err());
        assert!(!dir.path().join(MODEL_FILE_MPK).exists());
    }
}
