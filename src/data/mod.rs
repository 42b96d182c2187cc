// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from the raw CSV to tensor batches:
//
//   observations.csv
//       │
//       ▼
//   CsvLoader         → daily index, forward-filled gaps
//       │
//       ▼
//   FeatureBuilder    → rolling means, lags, day-of-year
//       │
//       ▼
//   Normalizer        → standardised features, [0,1] target
//       │
//       ▼
//   SequenceBuilder   → overlapping windows + next-day target
//       │
//       ▼
//   split_chronological → train / validation / test blocks
//       │
//       ▼
//   SequenceDataset   → Burn Dataset
//       │
//       ▼
//   SequenceBatcher   → [batch, seq_len, n_features] tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads the observations CSV onto a daily index
pub mod loader;

/// Rolling, lag and cyclic feature engineering
pub mod features;

/// Feature standardisation and target min-max scaling
pub mod normalizer;

/// Sliding-window sample construction
pub mod sequence;

/// Implements Burn's Dataset trait for window samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Chronological train/validation/test split
pub mod splitter;

/// Synthetic observation generator for demos and tests
pub mod synthetic;
