// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Used when a corpus ships without a validation split: the
// training examples are shuffled with the run's RNG and the
// tail becomes the validation set.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom.

use rand::{seq::SliceRandom, Rng};

/// Shuffle `samples` and split into (train, validation).
///
/// `train_fraction` is clamped to `[0, 1]`.
pub fn split_train_val<T, R: Rng + ?Sized>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    rng:            &mut R,
) -> (Vec<T>, Vec<T>) {
    samples.shuffle(rng);

    let total    = samples.len();
    let fraction = train_fraction.clamp(0.0, 1.0);
    let split_at = ((total as f64) * fraction).round() as usize;
    let split_at = split_at.min(total);

    // split_off(n) leaves [0..n) in `samples` and returns [n..)
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        samples.len(),
        val.len(),
    );

    (samples, val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_correct_split_sizes() {
        let mut rng      = StdRng::seed_from_u64(42);
        let items        = (0..100).collect::<Vec<usize>>();
        let (train, val) = split_train_val(items, 0.9, &mut rng);
        assert_eq!(train.len(), 90);
        assert_eq!(val.len(),   10);
    }

    #[test]
    fn test_all_items_preserved() {
        let mut rng          = StdRng::seed_from_u64(3);
        let items            = (0..50).collect::<Vec<usize>>();
        let (train, val)     = split_train_val(items, 0.7, &mut rng);
        let mut all: Vec<_>  = train.into_iter().chain(val).collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let items = (0..20).collect::<Vec<usize>>();
        let a = split_train_val(items.clone(), 0.5, &mut StdRng::seed_from_u64(9));
        let b = split_train_val(items,         0.5, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_dataset() {
        let mut rng      = StdRng::seed_from_u64(0);
        let (train, val) = split_train_val(Vec::<usize>::new(), 0.8, &mut rng);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }
}
