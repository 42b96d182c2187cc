// ============================================================
// Layer 1 - CLI Commands and Arguments
// ============================================================
// Defines the subcommands `train`, `evaluate`, `predict` and
// `generate` and all their configurable flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::application::{
    evaluate_use_case::EvaluateRequest,
    train_use_case::TrainConfig,
};
use crate::data::{features::FeatureConfig, synthetic::SyntheticConfig};
use crate::ml::backend::ComputeBackend;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the LST model on a CSV of daily observations
    Train(TrainArgs),

    /// Re-score the best checkpoint on the test block (or all windows)
    Evaluate(EvaluateArgs),

    /// Forecast the LST for the day after the last row of a CSV
    Predict(PredictArgs),

    /// Write a synthetic observations CSV
    Generate(GenerateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file with a date column, the input columns and the target
    #[arg(long, default_value = "data/observations.csv")]
    pub data: String,

    /// Directory for the best checkpoint, config, scalers and reports
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Name of the date column, parsed as YYYY-MM-DD
    #[arg(long, default_value = "date")]
    pub date_column: String,

    /// Predictor columns, comma separated
    #[arg(long, value_delimiter = ',', default_value = "solar_flare_intensity,sunspot_number")]
    pub inputs: Vec<String>,

    /// Column to forecast
    #[arg(long, default_value = "lst")]
    pub target: String,

    /// Trailing rolling-mean windows in days, comma separated
    #[arg(long, value_delimiter = ',', default_value = "7,30")]
    pub rolling_windows: Vec<usize>,

    /// Lags in days, comma separated
    #[arg(long, value_delimiter = ',', default_value = "1,3,7")]
    pub lags: Vec<usize>,

    /// Do not add lagged target values as features
    #[arg(long)]
    pub no_target_lags: bool,

    /// Do not feed the current-day target into the window
    #[arg(long)]
    pub no_target_feature: bool,

    /// Do not add the sin/cos day-of-year encoding
    #[arg(long)]
    pub no_day_of_year: bool,

    /// Days of history per input window
    #[arg(long, default_value_t = 30)]
    pub seq_len: usize,

    /// Share of windows used for training, oldest first
    #[arg(long, default_value_t = 0.7)]
    pub train_fraction: f64,

    /// Share of windows for validation; the rest is the test block
    #[arg(long, default_value_t = 0.15)]
    pub val_fraction: f64,

    /// Windows per mini-batch
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Maximum number of training epochs
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    /// Initial Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Output channels of each 1-D convolution
    #[arg(long, default_value_t = 32)]
    pub conv_filters: usize,

    /// Convolution kernel width, must be odd
    #[arg(long, default_value_t = 3)]
    pub kernel_size: usize,

    /// LSTM hidden state size
    #[arg(long, default_value_t = 64)]
    pub lstm_hidden: usize,

    /// Width of the additive attention scoring layer
    #[arg(long, default_value_t = 32)]
    pub attention_dim: usize,

    /// Units in the dense layer before the output
    #[arg(long, default_value_t = 64)]
    pub dense_units: usize,

    /// Dropout rate after the dense layer
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Multiply the LR by this factor when validation loss plateaus
    #[arg(long, default_value_t = 0.5)]
    pub lr_factor: f64,

    /// Epochs without improvement before the LR is reduced
    #[arg(long, default_value_t = 5)]
    pub lr_patience: usize,

    /// The LR is never reduced below this value
    #[arg(long, default_value_t = 1e-6)]
    pub min_lr: f64,

    /// Smallest drop in validation loss that counts as improvement
    #[arg(long, default_value_t = 1e-4)]
    pub min_delta: f64,

    /// Epochs to wait after a reduction before counting again
    #[arg(long, default_value_t = 0)]
    pub lr_cooldown: usize,

    /// Stop after this many epochs without improvement
    #[arg(long)]
    pub early_stop_patience: Option<usize>,

    /// Clip the gradient L2 norm to this value
    #[arg(long)]
    pub clip_grad_norm: Option<f32>,

    /// Seed for weight initialisation and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Compute backend for training
    #[arg(long, value_enum, default_value_t = ComputeBackend::Wgpu)]
    pub backend: ComputeBackend,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:      a.data,
            checkpoint_dir: a.checkpoint_dir,
            date_column:    a.date_column,
            features:       FeatureConfig {
                input_columns:      a.inputs,
                target_column:      a.target,
                rolling_windows:    a.rolling_windows,
                lags:               a.lags,
                lag_target:         !a.no_target_lags,
                target_as_feature:  !a.no_target_feature,
                cyclic_day_of_year: !a.no_day_of_year,
            },
            seq_len:        a.seq_len,
            train_fraction: a.train_fraction,
            val_fraction:   a.val_fraction,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            conv_filters:   a.conv_filters,
            kernel_size:    a.kernel_size,
            lstm_hidden:    a.lstm_hidden,
            attention_dim:  a.attention_dim,
            dense_units:    a.dense_units,
            dropout:        a.dropout,
            lr_factor:      a.lr_factor,
            lr_patience:    a.lr_patience,
            min_lr:         a.min_lr,
            min_delta:      a.min_delta,
            lr_cooldown:    a.lr_cooldown,
            early_stop_patience: a.early_stop_patience,
            clip_grad_norm:      a.clip_grad_norm,
            seed:           a.seed,
            backend:        a.backend,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// CSV to score; defaults to the training CSV
    #[arg(long)]
    pub data: Option<String>,

    /// Score every window, not only the test block
    #[arg(long)]
    pub all: bool,

    /// Override the backend saved with the checkpoint
    #[arg(long, value_enum)]
    pub backend: Option<ComputeBackend>,

    /// Where to write the reports; defaults to the checkpoint directory
    #[arg(long)]
    pub output_dir: Option<String>,
}

impl From<EvaluateArgs> for EvaluateRequest {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateRequest {
            checkpoint_dir: a.checkpoint_dir,
            data_path:      a.data,
            all:            a.all,
            backend:        a.backend,
            output_dir:     a.output_dir,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Directory written by `train`
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// CSV with the latest observations; defaults to the training CSV
    #[arg(long)]
    pub data: Option<String>,

    /// Override the backend saved with the checkpoint
    #[arg(long, value_enum)]
    pub backend: Option<ComputeBackend>,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// CSV file to write; parent directories are created
    #[arg(long, default_value = "data/observations.csv")]
    pub output: String,

    /// First date, YYYY-MM-DD
    #[arg(long, default_value = "2010-01-01")]
    pub start: NaiveDate,

    /// Number of consecutive days to simulate
    #[arg(long, default_value_t = 1095)]
    pub days: usize,

    /// Seed for the random generator
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Probability that a day is missing from the file
    #[arg(long, default_value_t = 0.02)]
    pub gap_probability: f64,

    /// Probability that a single value is blank
    #[arg(long, default_value_t = 0.01)]
    pub blank_probability: f64,
}

impl From<&GenerateArgs> for SyntheticConfig {
    fn from(a: &GenerateArgs) -> Self {
        SyntheticConfig {
            start:             a.start,
            days:              a.days,
            seed:              a.seed,
            gap_probability:   a.gap_probability,
            blank_probability: a.blank_probability,
        }
    }
}
