// ============================================================
// Layer 4 - Sequence Builder
// ============================================================
// Slides a fixed-length window over the normalised rows and
// pairs each window with the target of the row right after it.
//
// Example with seq_len = 3 over rows r0..r5:
//   window r0 r1 r2  →  target y3
//   window r1 r2 r3  →  target y4
//   window r2 r3 r4  →  target y5
//
// n rows give n - seq_len samples. The stride is always one
// day, so consecutive windows overlap by seq_len - 1 rows.

use crate::data::dataset::SequenceSample;
use crate::data::normalizer::NormalizedFrame;

pub struct SequenceBuilder {
    seq_len: usize,
}

impl SequenceBuilder {
    /// # Panics
    /// Panics if `seq_len` is zero.
    pub fn new(seq_len: usize) -> Self {
        assert!(seq_len > 0, "seq_len must be at least 1");
        Self { seq_len }
    }

    /// Number of samples `rows` normalised rows produce.
    pub fn num_windows(&self, rows: usize) -> usize {
        rows.saturating_sub(self.seq_len)
    }

    pub fn build(&self, frame: &NormalizedFrame) -> Vec<SequenceSample> {
        if frame.is_empty() {
            return Vec::new();
        }
        let n_features = frame.n_features();
        (self.seq_len..frame.len())
            .map(|end| SequenceSample {
                window: self.flatten(frame, end),
                seq_len: self.seq_len,
                n_features,
                target: frame.target[end],
                date: frame.dates[end],
            })
            .collect()
    }

    /// The most recent `seq_len` rows, dated the day after the last row.
    /// Returns `None` when the frame is too short.
    pub fn forecast_window(&self, frame: &NormalizedFrame) -> Option<SequenceSample> {
        let end = frame.len();
        if end < self.seq_len {
            return None;
        }
        let date = frame.dates.last()?.succ_opt()?;
        Some(SequenceSample {
            window: self.flatten(frame, end),
            seq_len: self.seq_len,
            n_features: frame.n_features(),
            target: f32::NAN,
            date,
        })
    }

    fn flatten(&self, frame: &NormalizedFrame, end: usize) -> Vec<f32> {
        frame.features[end - self.seq_len..end]
            .iter()
            .flat_map(|row| row.iter().copied())
            .collect()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn frame(n: usize) -> NormalizedFrame {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        NormalizedFrame {
            dates:    start.iter_days().take(n).collect(),
            features: (0..n).map(|i| vec![i as f32, -(i as f32)]).collect(),
            target:   (0..n).map(|i| i as f32 * 10.0).collect(),
        }
    }

    #[test]
    fn test_window_count() {
        let b = SequenceBuilder::new(3);
        assert_eq!(b.build(&frame(6)).len(), 3);
        assert_eq!(b.num_windows(6), 3);
    }

    #[test]
    fn test_target_is_next_step() {
        let b = SequenceBuilder::new(3);
        let samples = b.build(&frame(6));

        let first = &samples[0];
        assert_eq!(first.window, vec![0.0, -0.0, 1.0, -1.0, 2.0, -2.0]);
        assert_eq!(first.target, 30.0);
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2020, 1, 4).unwrap());
        assert_eq!(first.step(2), &[2.0, -2.0]);
    }

    #[test]
    fn test_windows_overlap() {
        let samples = SequenceBuilder::new(3).build(&frame(6));
        assert_eq!(samples[0].step(1), samples[1].step(0));
        assert_eq!(samples[0].step(2), samples[1].step(1));
    }

    #[test]
    fn test_short_frame_gives_no_windows() {
        let b = SequenceBuilder::new(5);
        assert!(b.build(&frame(5)).is_empty());
        assert!(b.build(&frame(2)).is_empty());
        assert!(b.build(&frame(0)).is_empty());
    }

    #[test]
    fn test_forecast_window() {
        let b = SequenceBuilder::new(3);
        let s = b.forecast_window(&frame(6)).unwrap();
        assert_eq!(s.step(0), &[3.0, -3.0]);
        assert_eq!(s.step(2), &[5.0, -5.0]);
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2020, 1, 7).unwrap());
        assert!(s.target.is_nan());

        assert!(b.forecast_window(&frame(2)).is_none());
    }

    #[test]
    #[should_panic]
    fn test_zero_seq_len_panics() {
        let _ = SequenceBuilder::new(0);
    }
}
