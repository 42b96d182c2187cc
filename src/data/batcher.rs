// ============================================================
// Layer 4 - Sequence Batcher
// ============================================================
// Implements Burn's Batcher trait to stack SequenceSamples
// into tensors:
//
//   Input:  N samples, each seq_len × n_features values
//   Output: inputs  [N, seq_len, n_features]
//           targets [N, 1]
//
// Every window is already flattened row-major, so stacking is
// one concatenation and a reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::SequenceSample;

#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Shape: [batch_size, seq_len, n_features]
    pub inputs: Tensor<B, 3>,

    /// Scaled next-day LST. Shape: [batch_size, 1]
    pub targets: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SequenceSample, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceSample>) -> SequenceBatch<B> {
        let batch_size = items.len();
        let (seq_len, n_features) = items
            .first()
            .map_or((0, 0), |s| (s.seq_len, s.n_features));

        let inputs_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.window.iter().copied())
            .collect();
        let targets: Vec<f32> = items.iter().map(|s| s.target).collect();

        let inputs = Tensor::<B, 1>::from_floats(inputs_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len, n_features]);
        let targets = Tensor::<B, 1>::from_floats(targets.as_slice(), &self.device)
            .reshape([batch_size, 1]);

        SequenceBatch { inputs, targets }
    }
}
