//! Error types surfaced by `infer` and the tridiagonal solver it relies on.

use thiserror::Error;

use crate::InferOutput;

/// The fluorescence trace or sample interval did not satisfy the shape
/// requirements of the solver.
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("trace has {0} samples, below the minimum of 4")]
    TooShort(usize),
    #[error("sample interval dt={0} must be strictly positive")]
    InvalidDt(f64),
}

/// A generative-model parameter violated its domain constraint.
#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("tau={tau} must exceed dt={dt}")]
    TauTooSmall { tau: f64, dt: f64 },
    #[error("sig={0} must be strictly positive")]
    NonPositiveSig(f64),
    #[error("lam={0} must be strictly positive")]
    NonPositiveLam(f64),
    #[error("fluorescence trace has a non-finite value at index {0}")]
    NonFiniteSample(usize),
}

/// A tridiagonal system lost positive-definiteness during elimination.
#[derive(Debug, Error, PartialEq)]
#[error("tridiagonal system is not positive definite at pivot {pivot}")]
pub struct NotPositiveDefinite {
    pub pivot: usize,
}

/// Top-level error returned by [`crate::infer`].
#[derive(Debug, Error)]
pub enum InferError {
    #[error("invalid trace shape: {0}")]
    Shape(#[from] ShapeError),

    #[error("invalid parameter: {0}")]
    Parameter(#[from] ParameterError),

    /// The inner solver lost numerical footing (non-finite value, or a
    /// tridiagonal pivot collapsed). The best iterate seen before the
    /// breakdown is still attached, per `spec.md` §7.
    #[error("numerical breakdown in inner solver: {reason}")]
    NumericalBreakdown {
        reason: String,
        partial: Box<InferOutput>,
    },
}

impl From<NotPositiveDefinite> for InferError {
    fn from(e: NotPositiveDefinite) -> Self {
        InferError::NumericalBreakdown {
            reason: e.to_string(),
            partial: Box::new(InferOutput::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_error_messages_name_the_offending_value() {
        assert_eq!(ShapeError::TooShort(2).to_string(), "trace has 2 samples, below the minimum of 4");
        assert!(ShapeError::InvalidDt(-1.0).to_string().contains("-1"));
    }

    #[test]
    fn not_positive_definite_converts_with_empty_partial() {
        let err: InferError = NotPositiveDefinite { pivot: 3 }.into();
        match err {
            InferError::NumericalBreakdown { reason, partial } => {
                assert!(reason.contains('3'));
                assert!(partial.n.is_empty());
            }
            _ => panic!("expected NumericalBreakdown"),
        }
    }
}
