//! Activation functions.
//!
//! A unit computes a pre-activation sum `z = w · x + b` and then applies its
//! activation: `y = activation(z)`.
//!
//! `ReLU` is purely element-wise. `Softmax` is a layer-wide transform: a lone
//! unit cannot normalise, so its element-wise forward is the identity and the
//! owning layer runs [`softmax_in_place`] over all raw outputs afterwards.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Activation kind shared by every unit of a layer.
pub enum Activation {
    /// Plain rectified linear unit: `max(0, x)`.
    ReLU,
    /// Normalised exponential over the whole layer (classification head).
    Softmax,
}

impl Activation {
    /// Element-wise activation.
    #[inline]
    pub fn forward(self, x: f64) -> f64 {
        match self {
            Activation::ReLU => x.max(0.0),
            Activation::Softmax => x,
        }
    }

    /// Derivative of the activation, evaluated on the cached post-activation
    /// output `y`.
    ///
    /// For `Softmax` this is `1`: the output delta is taken directly as
    /// `target - output` for the softmax + cross-entropy pairing.
    #[inline]
    pub fn grad_from_output(self, y: f64) -> f64 {
        match self {
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::Softmax => 1.0,
        }
    }

    /// Returns true if the activation needs the whole layer to be evaluated.
    #[inline]
    pub fn is_layer_wide(self) -> bool {
        matches!(self, Activation::Softmax)
    }
}

/// Numerically stable softmax over `xs`, written back in place.
///
/// The maximum is subtracted before exponentiation so large raw sums cannot
/// overflow. An empty slice is left untouched.
pub fn softmax_in_place(xs: &mut [f64]) {
    if xs.is_empty() {
        return;
    }

    let mut max_x = f64::NEG_INFINITY;
    for &x in xs.iter() {
        if x > max_x {
            max_x = x;
        }
    }

    let mut sum_exp = 0.0_f64;
    for x in xs.iter_mut() {
        *x = (*x - max_x).exp();
        sum_exp += *x;
    }

    let inv_sum = 1.0 / sum_exp;
    for x in xs.iter_mut() {
        *x *= inv_sum;
    }
}
