// ============================================================
// Layer 3 - Time Series Domain Types
// ============================================================
// Plain data structs that flow through the pipeline:
//
//   DailySeries      raw columns on a daily date index,
//                    missing observations kept as None
//   FeatureFrame     complete rows only, engineered features
//                    plus the LST target, still in raw units
//
// Nothing here knows about CSV, scalers or tensors.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One named daily column. `None` marks a missing observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name:   String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self { name: name.into(), values }
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// Observations aligned on a shared date index.
/// Every column has exactly one value slot per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    pub dates:   Vec<NaiveDate>,
    pub columns: Vec<Column>,
}

impl DailySeries {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self { dates, columns: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Attach a column; its length must match the date index.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if column.values.len() != self.dates.len() {
            bail!(
                "column '{}' has {} values but the index has {} dates",
                column.name,
                column.values.len(),
                self.dates.len()
            );
        }
        if self.column(&column.name).is_some() {
            bail!("duplicate column '{}'", column.name);
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Complete rows ready for normalisation.
///
/// `features` is row-major: `features[row][feature]`, in the order
/// given by `feature_names`. `target` holds the raw LST per row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    pub dates:         Vec<NaiveDate>,
    pub feature_names: Vec<String>,
    pub features:      Vec<Vec<f64>>,
    pub target:        Vec<f64>,
}

impl FeatureFrame {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    #[test]
    fn test_push_column_checks_length() {
        let mut s = DailySeries::new(vec![day(1), day(2)]);
        assert!(s.push_column(Column::new("a", vec![Some(1.0), None])).is_ok());
        assert!(s.push_column(Column::new("b", vec![Some(1.0)])).is_err());
    }

    #[test]
    fn test_push_column_rejects_duplicates() {
        let mut s = DailySeries::new(vec![day(1)]);
        s.push_column(Column::new("a", vec![Some(1.0)])).unwrap();
        assert!(s.push_column(Column::new("a", vec![Some(2.0)])).is_err());
        assert_eq!(s.column_names(), vec!["a"]);
    }

    #[test]
    fn test_missing_count() {
        let c = Column::new("x", vec![None, Some(1.0), None]);
        assert_eq!(c.missing_count(), 2);
    }
}
