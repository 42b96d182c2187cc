// ============================================================
// Layer 4 - CSV Loader
// ============================================================
// Reads the raw observations CSV with the csv crate and puts
// them on a daily date index.
//
// Expected layout (column names are configurable):
//
//   date,solar_flare_intensity,sunspot_number,lst
//   2015-01-01,0.8,93,12.4
//   2015-01-02,,88,11.9        <- blank cell: missing
//   2015-01-04,1.1,101,13.0    <- 2015-01-03 absent: gap day
//
// Loading steps:
//   1. Parse every row; skip rows whose date cannot be read
//   2. Sort by date, merge duplicate dates (later values win)
//   3. Reindex onto the contiguous calendar first..=last
//   4. Forward-fill each column across gaps
//
// Leading values with nothing to fill from stay missing; the
// feature builder drops those rows.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};

use crate::domain::series::{Column, DailySeries};
use crate::domain::traits::SeriesSource;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const MISSING_MARKERS: &[&str] = &["", "na", "nan", "null", "none"];

/// Loads a set of named numeric columns from a CSV file.
pub struct CsvLoader {
    path:          PathBuf,
    date_column:   String,
    value_columns: Vec<String>,
}

impl CsvLoader {
    pub fn new(
        path:          impl AsRef<Path>,
        date_column:   impl Into<String>,
        value_columns: Vec<String>,
    ) -> Self {
        Self {
            path:        path.as_ref().to_path_buf(),
            date_column: date_column.into(),
            value_columns,
        }
    }
}

impl SeriesSource for CsvLoader {
    fn load(&self) -> Result<DailySeries> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open CSV '{}'", self.path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Cannot read header of '{}'", self.path.display()))?
            .clone();

        let find = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .with_context(|| {
                    format!("Column '{}' not found in '{}'", name, self.path.display())
                })
        };
        let date_idx = find(&self.date_column)?;
        let value_idx = self
            .value_columns
            .iter()
            .map(|c| find(c))
            .collect::<Result<Vec<_>>>()?;

        let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
        let mut skipped = 0usize;

        for (i, record) in reader.records().enumerate() {
            // +2: one for the header, one for 1-based line numbers
            let line = i + 2;
            let record = record
                .with_context(|| format!("Malformed CSV record at line {line}"))?;

            let raw_date = record.get(date_idx).unwrap_or("");
            let date = match parse_date(raw_date) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Skipping line {}: {}", line, e);
                    skipped += 1;
                    continue;
                }
            };

            let values = value_idx
                .iter()
                .map(|&idx| parse_value(record.get(idx)))
                .collect();
            rows.push((date, values));
        }

        if rows.is_empty() {
            bail!("No dated rows found in '{}'", self.path.display());
        }
        tracing::info!(
            "Read {} rows from '{}' ({} skipped)",
            rows.len(),
            self.path.display(),
            skipped
        );

        build_daily_index(rows, &self.value_columns)
    }
}

/// Parse a date cell in any of the accepted formats.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("empty date");
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt.date());
        }
    }
    bail!("cannot parse date '{raw}'")
}

/// Numeric cell → `Some(value)`; blanks, NA markers, garbage and
/// non-finite numbers → `None`.
fn parse_value(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    if MISSING_MARKERS.contains(&raw.to_ascii_lowercase().as_str()) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Sort, merge duplicates, reindex to a contiguous daily calendar
/// and forward-fill.
pub fn build_daily_index(
    mut rows: Vec<(NaiveDate, Vec<Option<f64>>)>,
    names:    &[String],
) -> Result<DailySeries> {
    let (first, last) = match (rows.iter().map(|r| r.0).min(), rows.iter().map(|r| r.0).max()) {
        (Some(f), Some(l)) => (f, l),
        _ => bail!("cannot index an empty set of rows"),
    };

    // Stable sort keeps file order among equal dates, so a later
    // duplicate overrides an earlier one below.
    rows.sort_by_key(|(d, _)| *d);

    let span = (last - first).num_days() as usize + 1;
    let dates: Vec<NaiveDate> = first.iter_days().take(span).collect();
    let mut columns: Vec<Vec<Option<f64>>> = vec![vec![None; span]; names.len()];

    let mut duplicates = 0usize;
    let mut seen = vec![false; span];
    for (date, values) in rows {
        let offset = (date - first).num_days() as usize;
        if seen[offset] {
            duplicates += 1;
        }
        seen[offset] = true;
        for (col, value) in columns.iter_mut().zip(values) {
            if value.is_some() {
                col[offset] = value;
            }
        }
    }

    let gap_days = seen.iter().filter(|s| !**s).count();
    if duplicates > 0 {
        tracing::warn!("Merged {} duplicate dates", duplicates);
    }
    tracing::info!(
        "Daily index {} → {} ({} days, {} gap days filled)",
        first,
        last,
        span,
        gap_days
    );

    let mut series = DailySeries::new(dates);
    for (name, mut values) in names.iter().zip(columns) {
        forward_fill(&mut values);
        let column = Column::new(name.clone(), values);
        let leading = column.missing_count();
        if leading > 0 {
            tracing::debug!("'{}' has {} leading days with no observation", name, leading);
        }
        series.push_column(column)?;
    }
    Ok(series)
}

/// Replace every missing value with the last observed one.
pub fn forward_fill(values: &mut [Option<f64>]) {
    let mut last = None;
    for v in values.iter_mut() {
        match v {
            Some(x) => last = Some(*x),
            None    => *v = last,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_csv(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("obs.csv");
        fs::write(&path, body).unwrap();
        path
    }

    fn loader(path: &Path) -> CsvLoader {
        CsvLoader::new(path, "date", vec!["flare".to_string(), "lst".to_string()])
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap();
        assert_eq!(parse_date("2021-03-04").unwrap(), expected);
        assert_eq!(parse_date("2021/03/04").unwrap(), expected);
        assert_eq!(parse_date("04/03/2021").unwrap(), expected);
        assert_eq!(parse_date("20210304").unwrap(), expected);
        assert_eq!(parse_date("2021-03-04T12:30:00").unwrap(), expected);
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("  ").is_err());
    }

    #[test]
    fn test_parse_value_missing_markers() {
        assert_eq!(parse_value(Some("1.5")), Some(1.5));
        assert_eq!(parse_value(Some("NaN")), None);
        assert_eq!(parse_value(Some("NA")), None);
        assert_eq!(parse_value(Some("")), None);
        assert_eq!(parse_value(Some("abc")), None);
        assert_eq!(parse_value(Some("inf")), None);
        assert_eq!(parse_value(None), None);
    }

    #[test]
    fn test_forward_fill_keeps_leading_gaps() {
        let mut v = vec![None, Some(1.0), None, None, Some(4.0), None];
        forward_fill(&mut v);
        assert_eq!(v, vec![None, Some(1.0), Some(1.0), Some(1.0), Some(4.0), Some(4.0)]);
    }

    #[test]
    fn test_gap_days_are_inserted_and_filled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "date,flare,lst\n2020-01-01,1.0,10\n2020-01-02,,11\n2020-01-05,3.0,14\n",
        );
        let series = loader(&path).load().unwrap();

        assert_eq!(series.len(), 5);
        let flare = &series.column("flare").unwrap().values;
        let lst = &series.column("lst").unwrap().values;
        assert_eq!(flare, &vec![Some(1.0), Some(1.0), Some(1.0), Some(1.0), Some(3.0)]);
        assert_eq!(lst, &vec![Some(10.0), Some(11.0), Some(11.0), Some(11.0), Some(14.0)]);
    }

    #[test]
    fn test_unsorted_and_duplicate_dates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "date,flare,lst\n2020-01-02,2.0,12\n2020-01-01,1.0,10\n2020-01-02,,13\n",
        );
        let series = loader(&path).load().unwrap();

        assert_eq!(series.len(), 2);
        // Later duplicate overrides lst, blank flare keeps the earlier value.
        assert_eq!(series.column("flare").unwrap().values[1], Some(2.0));
        assert_eq!(series.column("lst").unwrap().values[1], Some(13.0));
    }

    #[test]
    fn test_bad_dates_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "date,flare,lst\nnot-a-date,1,1\n2020-01-01,1.0,10\n");
        let series = loader(&path).load().unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "date,flare\n2020-01-01,1.0\n");
        let err = loader(&path).load().unwrap_err();
        assert!(err.to_string().contains("lst"));
    }

    #[test]
    fn test_no_rows_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "date,flare,lst\n");
        assert!(loader(&path).load().is_err());
    }
}
