//! Pick the pool sequence that best represents a target condition.

use crate::error::{LoopError, Result};
use crate::types::{CandidatePool, Condition, TrialSequence};

/// Number of trials in each pool sequence that fall in `target`, in pool order.
pub fn match_counts(target: &Condition, pool: &CandidatePool) -> Vec<usize> {
    pool.sequences
        .iter()
        .map(|seq| seq.count_matching(target))
        .collect()
}

/// Sequence with the most trials in `target`.
///
/// Ties go to the earliest sequence in pool order. A pool where no sequence
/// contains the target still yields its first sequence.
pub fn best_match<'a>(target: &Condition, pool: &'a CandidatePool) -> Result<(usize, &'a TrialSequence)> {
    let counts = match_counts(target, pool);
    let mut best: Option<(usize, usize)> = None;
    for (i, &count) in counts.iter().enumerate() {
        match best {
            Some((_, b)) if count <= b => {}
            _ => best = Some((i, count)),
        }
    }

    let (index, count) = best.ok_or(LoopError::EmptyPool { mode: pool.mode })?;
    tracing::debug!(index, count, condition = %target, "best matching sequence");
    Ok((index, &pool.sequences[index]))
}
