//! Symmetric positive-definite tridiagonal solve, `spec.md` §4.2.
//!
//! Thomas-algorithm elimination with partial diagonal scaling: one
//! forward sweep that eliminates the sub-diagonal while rescaling the
//! main diagonal, one backward substitution. O(T), two reusable
//! scratch buffers — no fill-in beyond `forward_scale` and `forward_rhs`.

use crate::error::NotPositiveDefinite;

/// Scratch buffers reused across Newton iterations so the solve never
/// allocates (`spec.md` §5, §9 "Global/implicit scratch buffers").
pub(crate) struct TriSolveScratch {
    /// Rescaled off-diagonal after forward elimination, index `i` holds
    /// the entry eliminated between rows `i` and `i+1`.
    c_prime: Vec<f64>,
    /// Rescaled right-hand side after forward elimination.
    d_prime: Vec<f64>,
}

impl TriSolveScratch {
    pub(crate) fn new(t: usize) -> Self {
        TriSolveScratch {
            c_prime: vec![0.0; t.saturating_sub(1)],
            d_prime: vec![0.0; t],
        }
    }
}

/// Solve `H*x = rhs` for symmetric positive-definite tridiagonal `H`
/// given by `diag` (length T, main diagonal) and `off` (length T-1,
/// the shared sub/super diagonal). Writes the solution into `out`.
///
/// Returns `NotPositiveDefinite` at the first pivot that is not
/// strictly positive, without touching `out`.
pub(crate) fn solve_tridiagonal_spd(
    diag: &[f64],
    off: &[f64],
    rhs: &[f64],
    out: &mut [f64],
    scratch: &mut TriSolveScratch,
) -> Result<(), NotPositiveDefinite> {
    let t = diag.len();
    debug_assert_eq!(off.len(), t.saturating_sub(1));
    debug_assert_eq!(rhs.len(), t);
    debug_assert_eq!(out.len(), t);
    if t == 0 {
        return Ok(());
    }

    let c_prime = &mut scratch.c_prime;
    let d_prime = &mut scratch.d_prime;

    if diag[0] <= 0.0 {
        return Err(NotPositiveDefinite { pivot: 0 });
    }
    if t > 1 {
        c_prime[0] = off[0] / diag[0];
    }
    d_prime[0] = rhs[0] / diag[0];

    for i in 1..t {
        let pivot = diag[i] - off[i - 1] * c_prime[i - 1];
        if pivot <= 0.0 {
            return Err(NotPositiveDefinite { pivot: i });
        }
        if i < t - 1 {
            c_prime[i] = off[i] / pivot;
        }
        d_prime[i] = (rhs[i] - off[i - 1] * d_prime[i - 1]) / pivot;
    }

    out[t - 1] = d_prime[t - 1];
    for i in (0..t - 1).rev() {
        out[i] = d_prime[i] - c_prime[i] * out[i + 1];
    }
    Ok(())
}
