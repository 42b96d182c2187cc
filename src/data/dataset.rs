use burn::data::dataset::Dataset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One normalised input window and its next-day target.
/// `window` is row-major: `seq_len` steps of `n_features` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceSample {
    pub window:     Vec<f32>,
    pub seq_len:    usize,
    pub n_features: usize,
    /// Scaled LST for `date`; NaN when forecasting an unseen day.
    pub target:     f32,
    pub date:       NaiveDate,
}

impl SequenceSample {
    pub fn step(&self, t: usize) -> &[f32] {
        &self.window[t * self.n_features..(t + 1) * self.n_features]
    }
}

pub struct SequenceDataset {
    samples: Vec<SequenceSample>,
}

impl SequenceDataset {
    pub fn new(samples: Vec<SequenceSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    pub fn is_empty(&self) -> bool { self.samples.is_empty() }
}

impl Dataset<SequenceSample> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
