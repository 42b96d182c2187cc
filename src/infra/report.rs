// ============================================================
// Layer 6 - Evaluation Reports
// ============================================================
// Plot-ready outputs written next to the checkpoint:
//
//   predictions.csv   date,actual,predicted,residual
//   evaluation.json   metrics + which split was scored
//   attention.csv     step,weight   (step 1 = oldest day)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};

use crate::ml::evaluator::{Evaluation, RegressionMetrics};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// "test" or "all"
    pub split:      String,
    pub best_epoch: usize,
    pub first_date: Option<chrono::NaiveDate>,
    pub last_date:  Option<chrono::NaiveDate>,
    pub metrics:    RegressionMetrics,
}

#[derive(Debug, Serialize)]
struct AttentionRow {
    step:   usize,
    weight: f32,
}

/// Paths of the files written by [`write_reports`].
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub predictions: PathBuf,
    pub evaluation:  PathBuf,
    pub attention:   PathBuf,
}

pub fn write_reports(
    dir:            &Path,
    split:          &str,
    best_epoch:     usize,
    evaluation:     &Evaluation,
    mean_attention: &[f32],
) -> Result<ReportPaths> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create '{}'", dir.display()))?;
    let paths = ReportPaths {
        predictions: dir.join("predictions.csv"),
        evaluation:  dir.join("evaluation.json"),
        attention:   dir.join("attention.csv"),
    };

    let mut writer = csv::Writer::from_path(&paths.predictions)
        .with_context(|| format!("Cannot write '{}'", paths.predictions.display()))?;
    for record in &evaluation.records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    let report = EvaluationReport {
        split:      split.to_string(),
        best_epoch,
        first_date: evaluation.records.first().map(|r| r.date),
        last_date:  evaluation.records.last().map(|r| r.date),
        metrics:    evaluation.metrics.clone(),
    };
    fs::write(&paths.evaluation, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("Cannot write '{}'", paths.evaluation.display()))?;

    let mut writer = csv::Writer::from_path(&paths.attention)
        .with_context(|| format!("Cannot write '{}'", paths.attention.display()))?;
    for (i, &weight) in mean_attention.iter().enumerate() {
        writer.serialize(AttentionRow { step: i + 1, weight })?;
    }
    writer.flush()?;

    tracing::info!("Wrote evaluation reports to '{}'", dir.display());
    Ok(paths)
}
