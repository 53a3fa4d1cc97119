//! Loss functions.
//!
//! The classification head emits a probability distribution, so the loss is
//! categorical cross-entropy taken directly over probabilities (not logits).

use crate::{Error, Result};

/// Lower clamp applied to predicted probabilities before the logarithm.
pub const LOG_EPSILON: f64 = 1e-10;

/// Categorical cross-entropy: `-Σ t[i] * ln(max(p[i], LOG_EPSILON))`.
///
/// Shape contract: `outputs.len() == targets.len()`.
pub fn cross_entropy(outputs: &[f64], targets: &[f64]) -> Result<f64> {
    if outputs.len() != targets.len() {
        return Err(Error::size_mismatch(
            "loss targets",
            outputs.len(),
            targets.len(),
        ));
    }

    let mut loss = 0.0_f64;
    for (&p, &t) in outputs.iter().zip(targets) {
        loss -= t * p.max(LOG_EPSILON).ln();
    }
    Ok(loss)
}
