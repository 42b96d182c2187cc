// ============================================================
// Layer 2 - Generate Use Case
// ============================================================
// Writes a reproducible synthetic observations CSV so the
// pipeline can be tried without real satellite data.

use anyhow::Result;
use std::path::PathBuf;

use crate::data::synthetic::{generate, write_csv, SyntheticConfig};

#[derive(Debug, Clone)]
pub struct GenerateSummary {
    pub path: PathBuf,
    pub rows: usize,
}

pub struct GenerateUseCase {
    output: PathBuf,
    config: SyntheticConfig,
}

impl GenerateUseCase {
    pub fn new(output: impl Into<PathBuf>, config: SyntheticConfig) -> Self {
        Self { output: output.into(), config }
    }

    pub fn execute(&self) -> Result<GenerateSummary> {
        let rows = generate(&self.config)?;
        write_csv(&self.output, &rows)?;
        tracing::info!(
            "Generated {} rows ({} days from {}) into '{}'",
            rows.len(),
            self.config.days,
            self.config.start,
            self.output.display()
        );
        Ok(GenerateSummary { path: self.output.clone(), rows: rows.len() })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_writes_requested_days() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("obs.csv");
        let cfg  = SyntheticConfig { days: 40, gap_probability: 0.0, ..SyntheticConfig::default() };

        let summary = GenerateUseCase::new(&path, cfg).execute().unwrap();
        assert_eq!(summary.rows, 40);
        assert!(path.exists());
    }

    #[test]
    fn test_nan_probability_writes_nothing() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("obs.csv");
        let cfg  = SyntheticConfig { blank_probability: f64::NAN, ..SyntheticConfig::default() };

        let err = GenerateUseCase::new(&path, cfg).execute().unwrap_err();
        assert!(err.to_string().contains("blank_probability"));
        assert!(!path.exists());
    }
}
