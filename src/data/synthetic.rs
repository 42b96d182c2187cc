// ============================================================
// Layer 4 - Synthetic Observations
// ============================================================
// Generates a plausible solar-activity / LST CSV so the whole
// pipeline can be run without a real dataset:
//
//   sunspot_number         ~11-year cycle + noise, >= 0
//   solar_flare_intensity  tracks sunspots + noise, >= 0
//   lst                    seasonal cycle + weak lagged solar
//                          term + day-to-day noise
//
// A fraction of days is left out entirely and a fraction of
// cells is blanked, so loading exercises gap filling.

use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use std::f64::consts::PI;
use std::path::Path;

const SOLAR_CYCLE_DAYS: f64 = 11.0 * 365.25;
const SOLAR_EFFECT_LAG: usize = 5;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub start:            NaiveDate,
    pub days:             usize,
    pub seed:             u64,
    /// Probability that a whole day is absent from the file.
    pub gap_probability:  f64,
    /// Probability that a single value cell is blank.
    pub blank_probability: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start:             NaiveDate::from_ymd_opt(2010, 1, 1).unwrap_or_default(),
            days:              3 * 365,
            seed:              42,
            gap_probability:   0.02,
            blank_probability: 0.01,
        }
    }
}

impl SyntheticConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("gap_probability", self.gap_probability),
            ("blank_probability", self.blank_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                bail!("{} must be in [0, 1], got {}", name, p);
            }
        }
        Ok(())
    }
}

/// One CSV row. Column names match the default FeatureConfig.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationRow {
    pub date:                  String,
    pub solar_flare_intensity: Option<f64>,
    pub sunspot_number:        Option<f64>,
    pub lst:                   Option<f64>,
}

/// Symmetric noise in [-scale, scale], roughly bell shaped.
fn noise(rng: &mut StdRng, scale: f64) -> f64 {
    let sum: f64 = (0..3).map(|_| rng.gen_range(-1.0..1.0)).sum();
    sum / 3.0 * scale
}

pub fn generate(cfg: &SyntheticConfig) -> Result<Vec<ObservationRow>> {
    cfg.validate()?;
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut sunspots: Vec<f64> = Vec::with_capacity(cfg.days);
    let mut rows = Vec::with_capacity(cfg.days);

    for (t, date) in cfg.start.iter_days().take(cfg.days).enumerate() {
        let phase = 2.0 * PI * t as f64 / SOLAR_CYCLE_DAYS;
        let sunspot = (80.0 + 70.0 * phase.sin() + noise(&mut rng, 25.0)).max(0.0);
        let flare = (0.02 * sunspot + noise(&mut rng, 0.6)).max(0.0);
        sunspots.push(sunspot);

        let lagged = sunspots[t.saturating_sub(SOLAR_EFFECT_LAG)];
        let season = 2.0 * PI * (date.ordinal() as f64 - 100.0) / 365.25;
        let lst = 15.0 + 12.0 * season.sin() + 0.03 * lagged + noise(&mut rng, 2.5);

        if rng.gen_bool(cfg.gap_probability) {
            continue;
        }
        let mut blank = |v: f64| {
            if rng.gen_bool(cfg.blank_probability) { None } else { Some(round3(v)) }
        };
        rows.push(ObservationRow {
            date:                  date.format("%Y-%m-%d").to_string(),
            solar_flare_intensity: blank(flare),
            sunspot_number:        blank(sunspot),
            lst:                   blank(lst),
        });
    }
    Ok(rows)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

pub fn write_csv(path: &Path, rows: &[ObservationRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create '{}'", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot write '{}'", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
