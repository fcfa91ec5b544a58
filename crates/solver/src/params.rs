//! The generative model's parameter record (`P` in `spec.md` §3).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Calcium/noise model parameters, refined in place by the driver's
/// parameter-estimation step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Parameters {
    /// Calcium decay time constant, in seconds. Must exceed `dt`.
    pub tau: f64,
    /// Sparsity prior weight. Must be strictly positive.
    pub lam: f64,
    /// Observation noise standard deviation. Must be strictly positive.
    pub sig: f64,
    /// Additive baseline offset. Any finite real; never re-estimated by
    /// this core (`spec.md` §4.4, §9 open question 2).
    pub mu: f64,
}

impl Parameters {
    pub fn new(tau: f64, lam: f64, sig: f64, mu: f64) -> Self {
        Parameters { tau, lam, sig, mu }
    }

    /// Decay factor `a = 1 - dt/tau` of the AR(1) calcium recursion.
    pub(crate) fn decay_factor(&self, dt: f64) -> f64 {
        1.0 - dt / self.tau
    }

    /// Precision weight `c = 1 / (2 sig^2)` of the Gaussian observation term.
    pub(crate) fn precision(&self) -> f64 {
        1.0 / (2.0 * self.sig * self.sig)
    }
}

impl Default for Parameters {
    /// A harmless, valid-by-construction placeholder; not a meaningful
    /// prior for any real trace.
    fn default() -> Self {
        Parameters::new(1.0, 1.0, 1.0, 0.0)
    }
}
