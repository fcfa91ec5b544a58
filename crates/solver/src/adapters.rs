//! Input normalisation and validation run before any solver state
//! exists, `spec.md` §4.6.
//!
//! Grounded on the teacher's `py_api.rs` validation idiom: reject early
//! with a specific error variant rather than letting a malformed input
//! propagate into the numerical core.

use crate::config::Config;
use crate::error::{ParameterError, ShapeError};
use crate::params::Parameters;

/// Minimum trace length the solver can run on (`spec.md` §3: `T >= 4`).
pub(crate) const MIN_TRACE_LEN: usize = 4;

/// Coerce a 1-D fluorescence container into the length-T slice the core
/// expects. For `&[f64]` there is no row/column orientation to coerce
/// away (`spec.md` §4.6, `SPEC_FULL.md` clarification) — this is the
/// identity, with the real orientation-coercion work living in the
/// feature-gated bindings that accept typed JS arrays and numpy arrays.
pub(crate) fn coerce_trace(f: &[f64]) -> &[f64] {
    f
}

/// Validate trace shape, sample interval, and parameter domain
/// constraints, in that order, before any solver buffers are
/// allocated.
pub(crate) fn validate(f: &[f64], params: &Parameters, cfg: &Config) -> Result<(), ShapeErrorOrParameterError> {
    if f.len() < MIN_TRACE_LEN {
        return Err(ShapeError::TooShort(f.len()).into());
    }
    if !(cfg.dt > 0.0) {
        return Err(ShapeError::InvalidDt(cfg.dt).into());
    }
    for (i, &v) in f.iter().enumerate() {
        if !v.is_finite() {
            return Err(ParameterError::NonFiniteSample(i).into());
        }
    }
    if !(params.tau > cfg.dt) {
        return Err(ParameterError::TauTooSmall {
            tau: params.tau,
            dt: cfg.dt,
        }
        .into());
    }
    if !(params.sig > 0.0) {
        return Err(ParameterError::NonPositiveSig(params.sig).into());
    }
    if !(params.lam > 0.0) {
        return Err(ParameterError::NonPositiveLam(params.lam).into());
    }
    Ok(())
}

/// Either flavour of validation failure the adapter layer can raise,
/// convertible into [`crate::error::InferError`] at the call site.
pub(crate) enum ShapeErrorOrParameterError {
    Shape(ShapeError),
    Parameter(ParameterError),
}

impl From<ShapeError> for ShapeErrorOrParameterError {
    fn from(e: ShapeError) -> Self {
        ShapeErrorOrParameterError::Shape(e)
    }
}

impl From<ParameterError> for ShapeErrorOrParameterError {
    fn from(e: ParameterError) -> Self {
        ShapeErrorOrParameterError::Parameter(e)
    }
}

impl From<ShapeErrorOrParameterError> for crate::error::InferError {
    fn from(e: ShapeErrorOrParameterError) -> Self {
        match e {
            ShapeErrorOrParameterError::Shape(s) => crate::error::InferError::Shape(s),
            ShapeErrorOrParameterError::Parameter(p) => crate::error::InferError::Parameter(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_params() -> Parameters {
        Parameters::new(0.5, 5.0, 0.05, 0.0)
    }

    fn ok_cfg() -> Config {
        Config::new(1.0 / 30.0)
    }

    #[test]
    fn rejects_short_trace() {
        let f = vec![0.0; 3];
        let err = validate(&f, &ok_params(), &ok_cfg());
        assert!(matches!(err, Err(ShapeErrorOrParameterError::Shape(ShapeError::TooShort(3)))));
    }

    #[test]
    fn rejects_non_positive_dt() {
        let f = vec![0.0; 10];
        let mut cfg = ok_cfg();
        cfg.dt = 0.0;
        let err = validate(&f, &ok_params(), &cfg);
        assert!(matches!(err, Err(ShapeErrorOrParameterError::Shape(ShapeError::InvalidDt(_)))));
    }

    #[test]
    fn rejects_non_finite_sample() {
        let mut f = vec![0.0; 10];
        f[4] = f64::NAN;
        let err = validate(&f, &ok_params(), &ok_cfg());
        assert!(matches!(
            err,
            Err(ShapeErrorOrParameterError::Parameter(ParameterError::NonFiniteSample(4)))
        ));
    }

    #[test]
    fn rejects_tau_not_exceeding_dt() {
        let f = vec![0.0; 10];
        let cfg = ok_cfg();
        let mut params = ok_params();
        params.tau = cfg.dt;
        let err = validate(&f, &params, &cfg);
        assert!(matches!(
            err,
            Err(ShapeErrorOrParameterError::Parameter(ParameterError::TauTooSmall { .. }))
        ));
    }

    #[test]
    fn rejects_non_positive_sig_and_lam() {
        let f = vec![0.0; 10];
        let cfg = ok_cfg();
        let mut params = ok_params();
        params.sig = 0.0;
        assert!(validate(&f, &params, &cfg).is_err());

        let mut params = ok_params();
        params.lam = -1.0;
        assert!(validate(&f, &params, &cfg).is_err());
    }

    #[test]
    fn accepts_well_formed_input() {
        let f = vec![0.0; 10];
        assert!(validate(&f, &ok_params(), &ok_cfg()).is_ok());
    }

    #[test]
    fn coerce_trace_is_identity() {
        let f = vec![1.0, 2.0, 3.0];
        assert_eq!(coerce_trace(&f), &f[..]);
    }
}
