// ============================================================
// Layer 3 - Core Traits
// ============================================================
// The seams between layers. The application layer programs
// against these, the data layer supplies the implementations:
//
//   SeriesSource  -> CsvLoader
//   Scaler        -> StandardScaler, MinMaxScaler
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use crate::domain::series::DailySeries;

// ─── SeriesSource ─────────────────────────────────────────────────────────────
/// Anything that can produce a daily-indexed series.
pub trait SeriesSource {
    /// Load every requested column on a gap-free daily index.
    fn load(&self) -> Result<DailySeries>;
}

// ─── Scaler ───────────────────────────────────────────────────────────────────
/// A fitted, invertible per-column transform.
pub trait Scaler {
    fn transform(&self, value: f64) -> f64;

    /// Undo `transform`, mapping model space back to raw units.
    fn inverse(&self, value: f64) -> f64;
}
