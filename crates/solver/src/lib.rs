//! Fast non-negative deconvolution of a calcium-imaging fluorescence
//! trace into a spike-rate estimate.
//!
//! The public surface is a single function, [`infer`], wrapping an
//! interior-point Newton solver (see [`mod@inner_solver`]) in an EM-style
//! outer loop (see [`mod@driver`]) that alternates inference with
//! closed-form re-estimation of the generative model's parameters (see
//! [`mod@param_estimator`]).

mod adapters;
pub mod config;
pub mod error;
mod inner_solver;
mod linear_ops;
mod param_estimator;
mod driver;
pub mod params;
mod tri_solve;

#[cfg(feature = "jsbindings")]
pub mod bindings_wasm;
#[cfg(feature = "pybindings")]
pub mod bindings_python;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use config::Config;
pub use error::{InferError, NotPositiveDefinite, ParameterError, ShapeError};
pub use params::Parameters;

/// Convergence and bookkeeping diagnostics attached to [`InferOutput`],
/// `spec.md` §4.5 "Output".
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostics {
    /// Negative log-likelihood at the returned (best) iterate.
    pub final_nll: Option<f64>,
    /// Outer iterations actually run (0 if `max_iter == 0`).
    pub iterations: u32,
    /// `false` means `max_iter` was exhausted without reaching `tol`
    /// (`spec.md` §7 `DidNotConverge`); the returned solution is still
    /// the best seen, just advisory rather than a hard failure.
    pub converged: bool,
    /// Negative log-likelihood at every outer iteration, in order.
    pub nll_trace: Vec<f64>,
}

/// Result of [`infer`]: the best spike-rate estimate seen across the
/// outer loop, the parameters that produced it, and diagnostics.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InferOutput {
    pub n: Vec<f64>,
    pub params: Parameters,
    pub diagnostics: Diagnostics,
}

impl InferOutput {
    /// A zero-length placeholder, used only where `error.rs` needs an
    /// `InferOutput` to attach to an error raised before any trace
    /// length is known.
    pub(crate) fn empty() -> Self {
        InferOutput {
            n: Vec::new(),
            params: Parameters::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// As [`Self::empty`], but pre-sized to `t` zeros so a breakdown
    /// discovered during the very first inner solve can still report a
    /// shape-correct (if meaningless) spike vector.
    pub(crate) fn empty_sized(t: usize) -> Self {
        InferOutput {
            n: vec![0.0; t],
            ..Self::empty()
        }
    }
}

/// Infer a non-negative spike rate from a fluorescence trace, `spec.md`
/// §6 "Library entry point".
///
/// Validates `f`, `params`, and `cfg` up front (`spec.md` §4.6), then
/// runs the outer driver loop. On numerical breakdown the best iterate
/// seen before the breakdown is still attached to the returned error
/// (`spec.md` §7).
pub fn infer(f: &[f64], params: Parameters, cfg: Config) -> Result<InferOutput, InferError> {
    let f = adapters::coerce_trace(f);
    adapters::validate(f, &params, &cfg)?;
    driver::run(f, params, &cfg)
}
