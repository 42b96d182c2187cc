// ============================================================
// Layer 5 - Plateau Scheduling and Early Stopping
// ============================================================
// Both watch the validation loss once per epoch.
//
// ReduceLrOnPlateau:
//   improved  ⇔  metric < best - min_delta
//   after `patience` epochs without improvement:
//       lr = max(lr * factor, min_lr), then `cooldown` epochs
//       during which the wait counter stays at zero
//
// EarlyStopping:
//   stop once `patience` epochs pass without improvement

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateauConfig {
    pub factor:    f64,
    pub patience:  usize,
    pub min_lr:    f64,
    pub min_delta: f64,
    pub cooldown:  usize,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self { factor: 0.5, patience: 5, min_lr: 1e-6, min_delta: 1e-4, cooldown: 0 }
    }
}

#[derive(Debug, Clone)]
pub struct ReduceLrOnPlateau {
    config:        PlateauConfig,
    lr:            f64,
    best:          f64,
    wait:          usize,
    cooldown_left: usize,
}

impl ReduceLrOnPlateau {
    pub fn new(initial_lr: f64, config: PlateauConfig) -> Self {
        Self {
            config,
            lr:            initial_lr,
            best:          f64::INFINITY,
            wait:          0,
            cooldown_left: 0,
        }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Feed one epoch's validation loss. Returns the new learning
    /// rate when this call reduced it.
    pub fn step(&mut self, metric: f64) -> Option<f64> {
        if !metric.is_finite() {
            tracing::warn!("Validation loss is not finite; skipping plateau update");
            return None;
        }

        if self.cooldown_left > 0 {
            self.cooldown_left -= 1;
            self.wait = 0;
        }

        if metric < self.best - self.config.min_delta {
            self.best = metric;
            self.wait = 0;
            return None;
        }
        if self.cooldown_left > 0 {
            return None;
        }

        self.wait += 1;
        if self.wait < self.config.patience || self.lr <= self.config.min_lr {
            return None;
        }

        self.lr = (self.lr * self.config.factor).max(self.config.min_lr);
        self.wait = 0;
        self.cooldown_left = self.config.cooldown;
        Some(self.lr)
    }
}

#[derive(Debug, Clone)]
pub struct EarlyStopping {
    patience:  usize,
    min_delta: f64,
    best:      f64,
    wait:      usize,
}

impl EarlyStopping {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self { patience, min_delta, best: f64::INFINITY, wait: 0 }
    }

    /// Returns true once training should stop.
    pub fn should_stop(&mut self, metric: f64) -> bool {
        if metric.is_finite() && metric < self.best - self.min_delta {
            self.best = metric;
            self.wait = 0;
            return false;
        }
        self.wait += 1;
        self.wait >= self.patience
    }
}
