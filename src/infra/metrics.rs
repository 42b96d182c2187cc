// ============================================================
// Layer 6 - Training History Logger
// ============================================================
// Writes one CSV row per epoch so learning curves can be
// plotted after the run.
//
// Output file: checkpoints/training_history.csv
//
//   epoch,train_loss,val_loss,val_mae,lr
//   1,0.041230,0.032100,0.141200,0.001000
//   2,0.020310,0.018700,0.108300,0.001000
//   ...
//
// Losses are MSE on the min-max scaled target, val_mae is in
// the same scaled units. lr is the rate used during the epoch.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Sample-weighted mean MSE over the training batches
    pub train_loss: f64,

    /// Mean MSE on the validation block; drives checkpointing
    /// and plateau scheduling
    pub val_loss: f64,

    /// Mean absolute error on the validation block (scaled units)
    pub val_mae: f64,

    /// Learning rate used for this epoch
    pub lr: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, val_mae: f64, lr: f64) -> Self {
        Self { epoch, train_loss, val_loss, val_mae, lr }
    }

    /// Returns true if this epoch beat the best validation loss so far
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss.is_finite() && self.val_loss < best_val_loss
    }
}

/// Logs epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh history file in `dir`, replacing any previous run.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("training_history.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "epoch,train_loss,val_loss,val_mae,lr")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.8}",
            m.epoch,
            m.train_loss,
            m.val_loss,
            m.val_mae,
            m.lr,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
