// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Rebuilds the model from the saved TrainConfig, loads the best
// checkpoint, and runs it over windows in fixed-size batches.
// Outputs stay in scaled units; the evaluator maps them back.
use anyhow::{bail, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SequenceBatcher, dataset::SequenceSample};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::backend::{ComputeBackend, NdArrayBackend, WgpuBackend};
use crate::ml::model::HybridLstModel;

/// Scaled predictions, one per window, plus the attention weight
/// of each window step averaged over all windows.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutputs {
    pub predictions:    Vec<f32>,
    pub mean_attention: Vec<f32>,
}

pub struct Inferencer<B: Backend> {
    model:      HybridLstModel<B>,
    batcher:    SequenceBatcher<B>,
    batch_size: usize,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: HybridLstModel<B>, device: B::Device, batch_size: usize) -> Self {
        Self { model, batcher: SequenceBatcher::new(device), batch_size: batch_size.max(1) }
    }

    pub fn from_checkpoint(
        ckpt_manager: &CheckpointManager,
        cfg:          &TrainConfig,
        n_features:   usize,
        device:       B::Device,
    ) -> Result<Self> {
        let model: HybridLstModel<B> = cfg.model_config(n_features).init(&device);
        let model = ckpt_manager.load_best(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, device, cfg.batch_size))
    }

    pub fn run(&self, samples: &[SequenceSample]) -> Result<ModelOutputs> {
        let Some(first) = samples.first() else {
            bail!("no windows to run inference on");
        };
        let seq_len = first.seq_len;

        let mut predictions    = Vec::with_capacity(samples.len());
        let mut attention_sum  = vec![0.0f64; seq_len];

        for chunk in samples.chunks(self.batch_size) {
            let batch = self.batcher.batch(chunk.to_vec());
            let (output, weights) = self.model.forward_with_attention(batch.inputs);

            let output = output
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow::anyhow!("Cannot read predictions: {e:?}"))?;
            predictions.extend(output);

            // [batch, seq_len] → column sums [seq_len]
            let weights = weights
                .sum_dim(0)
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow::anyhow!("Cannot read attention weights: {e:?}"))?;
            for (acc, w) in attention_sum.iter_mut().zip(weights) {
                *acc += w as f64;
            }
        }

        let mean_attention = attention_sum
            .into_iter()
            .map(|s| (s / samples.len() as f64) as f32)
            .collect();

        tracing::debug!("Ran inference on {} windows", samples.len());
        Ok(ModelOutputs { predictions, mean_attention })
    }
}

/// Load the best checkpoint on `backend` and run it over `samples`.
pub fn run_inference(
    backend:      ComputeBackend,
    ckpt_manager: &CheckpointManager,
    cfg:          &TrainConfig,
    n_features:   usize,
    samples:      &[SequenceSample],
) -> Result<ModelOutputs> {
    match backend {
        ComputeBackend::Wgpu => {
            let device = burn::backend::wgpu::WgpuDevice::default();
            Inferencer::<WgpuBackend>::from_checkpoint(ckpt_manager, cfg, n_features, device)?
                .run(samples)
        }
        ComputeBackend::NdArray => {
            let device = burn::backend::ndarray::NdArrayDevice::default();
            Inferencer::<NdArrayBackend>::from_checkpoint(ckpt_manager, cfg, n_features, device)?
                .run(samples)
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::HybridModelConfig;
    use chrono::NaiveDate;

    type TestBackend = NdArrayBackend;

    fn sample(i: usize) -> SequenceSample {
        SequenceSample {
            window:     (0..15).map(|j| ((i + j) as f32 * 0.1).cos()).collect(),
            seq_len:    5,
            n_features: 3,
            target:     0.5,
            date:       NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
        }
    }

    fn inferencer(batch_size: usize) -> Inferencer<TestBackend> {
        let device = Default::default();
        let model = HybridModelConfig::new(3)
            .with_conv_filters(4)
            .with_lstm_hidden(4)
            .with_dropout(0.0)
            .init(&device);
        Inferencer::new(model, device, batch_size)
    }

    #[test]
    fn test_one_prediction_per_window() {
        let samples: Vec<_> = (0..7).map(sample).collect();
        let out = inferencer(3).run(&samples).unwrap();

        assert_eq!(out.predictions.len(), 7);
        assert_eq!(out.mean_attention.len(), 5);
        let total: f32 = out.mean_attention.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_batch_size_does_not_change_predictions() {
        let samples: Vec<_> = (0..5).map(sample).collect();
        let inf = inferencer(2);
        let x = inf.run(&samples).unwrap();
        let single: Vec<f32> = samples
            .iter()
            .flat_map(|s| inf.run(std::slice::from_ref(s)).unwrap().predictions)
            .collect();
        for (p, q) in x.predictions.iter().zip(&single) {
            assert!((p - q).abs() < 1e-5);
        }
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(inferencer(4).run(&[]).is_err());
    }
}
