//! Top-K partial selection.

use std::cmp::Ordering;

/// Keep the `k` items with the highest score, in no particular order.
///
/// Uses `select_nth_unstable_by`, so the cost is linear on average instead of
/// a full sort. NaN scores compare as equal.
pub fn top_k_by_score<T, S, F>(items: &mut Vec<T>, k: usize, score: F)
where
    S: PartialOrd,
    F: Fn(&T) -> S,
{
    if k == 0 {
        items.clear();
        return;
    }
    if k < items.len() {
        items.select_nth_unstable_by(k - 1, |a, b| {
            score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal)
        });
        items.truncate(k);
    }
}
