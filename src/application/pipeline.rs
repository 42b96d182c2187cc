// ============================================================
// Layer 2 - Shared Data Preparation
// ============================================================
// The same path from CSV to windows is used by train, evaluate
// and predict:
//
//   CSV → DailySeries → FeatureFrame → NormalizedFrame → windows
//
// Training fits the scalers; evaluate and predict pass in the
// scalers saved next to the checkpoint.

use anyhow::{bail, Result};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    dataset::SequenceSample,
    features::FeatureBuilder,
    loader::CsvLoader,
    normalizer::{NormalizedFrame, Normalizer},
    sequence::SequenceBuilder,
    splitter::{split_sizes, SplitSizes},
};
use crate::domain::{series::FeatureFrame, traits::SeriesSource};

pub struct PreparedData {
    pub frame:      FeatureFrame,
    pub normalizer: Normalizer,
    pub normalized: NormalizedFrame,
    pub samples:    Vec<SequenceSample>,
    pub sizes:      SplitSizes,
}

pub fn load_features(cfg: &TrainConfig, data_path: &str) -> Result<FeatureFrame> {
    let loader = CsvLoader::new(data_path, cfg.date_column.as_str(), cfg.features.source_columns());
    let series = loader.load()?;
    tracing::info!(
        "Loaded {} days of observations: {}",
        series.len(),
        series.column_names().join(", ")
    );

    let frame = FeatureBuilder::new(cfg.features.clone())?.build(&series)?;
    tracing::info!(
        "Built {} feature rows with {} features (last complete day {:?})",
        frame.len(),
        frame.n_features(),
        frame.last_date()
    );
    Ok(frame)
}

/// Load, featurise, scale and window `data_path`.
///
/// With `normalizer = None` the scalers are fitted on the rows
/// the training windows can see: the first `seq_len + train`
/// rows, where `train` is the size of the training block.
pub fn prepare(
    cfg:        &TrainConfig,
    data_path:  &str,
    normalizer: Option<Normalizer>,
) -> Result<PreparedData> {
    let frame   = load_features(cfg, data_path)?;
    let builder = SequenceBuilder::new(cfg.seq_len);

    let windows = builder.num_windows(frame.len());
    if windows == 0 {
        bail!(
            "{} feature rows are not enough for a {}-day window; need at least {}",
            frame.len(),
            cfg.seq_len,
            cfg.seq_len + 1
        );
    }
    let sizes = split_sizes(windows, cfg.train_fraction, cfg.val_fraction);
    tracing::debug!(
        "{} windows: {} train, {} validation, {} test",
        sizes.total(), sizes.train, sizes.val, sizes.test
    );

    let normalizer = match normalizer {
        Some(n) => n,
        None    => Normalizer::fit(&frame, cfg.seq_len + sizes.train)?,
    };
    let normalized = normalizer.transform(&frame)?;
    let samples    = builder.build(&normalized);
    tracing::debug!("Built {} windows of {} days", samples.len(), cfg.seq_len);

    Ok(PreparedData { frame, normalizer, normalized, samples, sizes })
}
