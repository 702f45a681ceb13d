//! Epoch-level classification metrics.
//!
//! A pure function of accumulated predictions: accuracy, macro precision,
//! macro recall, macro F1 and the confusion matrix. Macro averages run over
//! every class that occurs among the true *or* the predicted labels; a class
//! with an undefined ratio (no predictions, no support) contributes 0.

use serde::{Deserialize, Serialize};

use crate::domain::example::NUM_CLASSES;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy:  f64,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    /// `confusion[true][predicted]`
    pub confusion: [[usize; NUM_CLASSES]; NUM_CLASSES],
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl ClassificationMetrics {
    /// Both slices hold canonical class indices and must have the same length.
    pub fn compute(predictions: &[usize], labels: &[usize]) -> Self {
        let mut confusion = [[0usize; NUM_CLASSES]; NUM_CLASSES];
        for (&p, &t) in predictions.iter().zip(labels) {
            if p < NUM_CLASSES && t < NUM_CLASSES {
                confusion[t][p] += 1;
            }
        }
        Self::from_confusion(confusion)
    }

    pub fn from_confusion(confusion: [[usize; NUM_CLASSES]; NUM_CLASSES]) -> Self {
        let total: usize   = confusion.iter().flatten().sum();
        let correct: usize = (0..NUM_CLASSES).map(|c| confusion[c][c]).sum();

        let mut precision = 0.0;
        let mut recall    = 0.0;
        let mut f1        = 0.0;
        let mut present   = 0usize;

        for c in 0..NUM_CLASSES {
            let tp        = confusion[c][c];
            let support   = confusion[c].iter().sum::<usize>();
            let predicted = (0..NUM_CLASSES).map(|t| confusion[t][c]).sum::<usize>();
            if support == 0 && predicted == 0 {
                continue;
            }
            present += 1;

            let p = ratio(tp, predicted);
            let r = ratio(tp, support);
            precision += p;
            recall    += r;
            f1        += if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };
        }

        let n = present.max(1) as f64;
        Self {
            accuracy:  ratio(correct, total),
            precision: precision / n,
            recall:    recall / n,
            f1:        f1 / n,
            confusion,
        }
    }

    pub fn support(&self) -> usize {
        self.confusion.iter().flatten().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_predictions() {
        let y = [0, 1, 2, 2, 1, 0];
        let m = ClassificationMetrics::compute(&y, &y);
        assert!(close(m.accuracy, 1.0));
        assert!(close(m.precision, 1.0));
        assert!(close(m.recall, 1.0));
        assert!(close(m.f1, 1.0));
        assert_eq!(m.support(), 6);
    }

    #[test]
    fn test_macro_average_by_hand() {
        // true:      0 0 0 1 1 2
        // predicted: 0 0 1 1 2 2
        let m = ClassificationMetrics::compute(&[0, 0, 1, 1, 2, 2], &[0, 0, 0, 1, 1, 2]);
        assert!(close(m.accuracy, 4.0 / 6.0));
        // precision: c0 2/2, c1 1/2, c2 1/2
        assert!(close(m.precision, (1.0 + 0.5 + 0.5) / 3.0));
        // recall: c0 2/3, c1 1/2, c2 1/1
        assert!(close(m.recall, (2.0 / 3.0 + 0.5 + 1.0) / 3.0));
        assert_eq!(m.confusion[0], [2, 1, 0]);
        assert_eq!(m.confusion[1], [0, 1, 1]);
    }

    #[test]
    fn test_absent_class_excluded_and_zero_division_is_zero() {
        // Class 2 never appears; class 1 is predicted but never true
        let m = ClassificationMetrics::compute(&[0, 1], &[0, 0]);
        assert!(close(m.accuracy, 0.5));
        // c0: p=1, r=0.5 ; c1: p=0, r=0 (no support)
        assert!(close(m.precision, 0.5));
        assert!(close(m.recall, 0.25));
    }

    #[test]
    fn test_empty_input() {
        let m = ClassificationMetrics::compute(&[], &[]);
        assert_eq!(m, ClassificationMetrics::default());
    }
}
