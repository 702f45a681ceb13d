// ============================================================
// Layer 4 — Class Rebalancing
// ============================================================
// Random oversampling with replacement:
//
//   counts before:  {0: 100, 1: 20, 2: 30}
//   counts after:   {0: 100, 1: 100, 2: 100}
//
// The original examples are kept in order and the extra draws
// for each minority class are appended after them. Draws come
// from the caller's RNG, so a seeded source gives a
// reproducible result.
//
// Applied to train and validation only; the test split keeps
// its true class distribution.

use rand::Rng;

use crate::domain::example::{RawExample, NUM_CLASSES};
use crate::error::DataError;

/// Count examples per raw label. Labels must already be validated.
pub fn class_counts(examples: &[RawExample]) -> [usize; NUM_CLASSES] {
    let mut counts = [0usize; NUM_CLASSES];
    for ex in examples {
        counts[ex.label as usize] += 1;
    }
    counts
}

/// Oversample every class up to the majority class count.
///
/// Fails if the split is empty, if any label is out of range, or if a
/// class has no examples to draw from.
pub fn rebalance<R: Rng + ?Sized>(
    split:    &str,
    examples: Vec<RawExample>,
    rng:      &mut R,
) -> Result<Vec<RawExample>, DataError> {
    if examples.is_empty() {
        return Err(DataError::EmptySplit { split: split.to_string() });
    }
    for (i, ex) in examples.iter().enumerate() {
        ex.validate(split, i)?;
    }

    // Indices of each class's examples
    let mut by_class: [Vec<usize>; NUM_CLASSES] = Default::default();
    for (i, ex) in examples.iter().enumerate() {
        by_class[ex.label as usize].push(i);
    }

    if let Some(class) = by_class.iter().position(Vec::is_empty) {
        return Err(DataError::MissingClass { split: split.to_string(), class });
    }

    let majority = by_class.iter().map(Vec::len).max().unwrap_or(0);
    let extra: usize = by_class.iter().map(|idx| majority - idx.len()).sum();

    let mut out = Vec::with_capacity(examples.len() + extra);
    out.extend(examples.iter().cloned());

    for indices in &by_class {
        for _ in indices.len()..majority {
            let pick = indices[rng.gen_range(0..indices.len())];
            out.push(examples[pick].clone());
        }
    }

    tracing::info!(
        "Rebalanced '{}': {:?} → {} per class ({} examples)",
        split,
        by_class.iter().map(Vec::len).collect::<Vec<_>>(),
        majority,
        out.len()
    );

    Ok(out)
}
