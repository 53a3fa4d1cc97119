//! Metrics.
//!
//! Metrics are evaluation helpers (they do not participate in backprop).

/// Index of the largest entry.
///
/// Ties resolve to the first maximum met in a left-to-right scan. An empty
/// slice yields `0`.
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Fraction of correct predictions; `0.0` when nothing was evaluated.
pub fn accuracy(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    correct as f64 / total as f64
}
