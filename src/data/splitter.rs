// ============================================================
// Layer 4 - Chronological Splitter
// ============================================================
// Splits the ordered list of windows into three consecutive
// blocks:
//
//   |------ train ------|-- validation --|--- test ---|
//   oldest                                      newest
//
// Neighbouring windows share all but one day, so windows are
// never shuffled across block boundaries. Batches are shuffled
// inside the training block by the DataLoader.

use serde::{Deserialize, Serialize};

/// Number of windows in each block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    pub train: usize,
    pub val:   usize,
    pub test:  usize,
}

impl SplitSizes {
    pub fn total(&self) -> usize {
        self.train + self.val + self.test
    }
}

/// Compute block sizes for `total` windows.
///
/// Train takes `round(total * train_fraction)`, validation
/// `round(total * val_fraction)` of what is left, test the rest.
pub fn split_sizes(total: usize, train_fraction: f64, val_fraction: f64) -> SplitSizes {
    let train = ((total as f64) * train_fraction).round() as usize;
    let train = train.min(total);

    let val = ((total as f64) * val_fraction).round() as usize;
    let val = val.min(total - train);

    SplitSizes { train, val, test: total - train - val }
}

/// Split `samples` into consecutive (train, validation, test) blocks.
pub fn split_chronological<T>(mut samples: Vec<T>, sizes: SplitSizes) -> (Vec<T>, Vec<T>, Vec<T>) {
    let train_end = sizes.train.min(samples.len());
    let val_end   = (sizes.train + sizes.val).min(samples.len());

    // split_off(n) keeps [0..n) and returns [n..)
    let test = samples.split_off(val_end);
    let val  = samples.split_off(train_end);

    tracing::debug!(
        "Chronological split: {} train, {} validation, {} test",
        samples.len(),
        val.len(),
        test.len(),
    );

    (samples, val, test)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let sizes = split_sizes(100, 0.7, 0.15);
        assert_eq!(sizes, SplitSizes { train: 70, val: 15, test: 15 });
    }

    #[test]
    fn test_sizes_never_exceed_total() {
        let sizes = split_sizes(10, 0.9, 0.5);
        assert_eq!(sizes.train, 9);
        assert_eq!(sizes.val, 1);
        assert_eq!(sizes.test, 0);
        assert_eq!(sizes.total(), 10);
    }

    #[test]
    fn test_order_is_preserved() {
        let items: Vec<usize> = (0..10).collect();
        let (train, val, test) = split_chronological(items, split_sizes(10, 0.6, 0.2));
        assert_eq!(train, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(val, vec![6, 7]);
        assert_eq!(test, vec![8, 9]);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..37).collect();
        let (train, val, test) = split_chronological(items, split_sizes(37, 0.7, 0.15));
        assert_eq!(train.len() + val.len() + test.len(), 37);
    }

    #[test]
    fn test_empty_dataset() {
        let (train, val, test) = split_chronological(Vec::<usize>::new(), split_sizes(0, 0.7, 0.15));
        assert!(train.is_empty());
        assert!(val.is_empty());
        assert!(test.is_empty());
    }
}
