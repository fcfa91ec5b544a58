//! Closed-form parameter re-estimation from a committed `(C, n)` pair,
//! `spec.md` §4.4.
//!
//! Grounded on the teacher's `threshold.rs::lstsq_alpha_baseline`: a
//! one-shot least-squares regression with a clamp on the fitted
//! coefficient, expressed as plain scalar accumulation loops rather than
//! a linear-algebra crate call.

use crate::params::Parameters;

/// Floor applied to the re-estimated noise standard deviation so `c =
/// 1/(2*sig^2)` never blows up (`spec.md` §4.4).
pub(crate) const SIGMA_FLOOR: f64 = 1e-6;

/// Parameters refined in place, plus the negative log-likelihood
/// evaluated at the refined values, as returned by [`estimate`].
pub(crate) struct ParamEstimate {
    pub(crate) params: Parameters,
    pub(crate) nll: f64,
}

/// Re-estimate `tau` and `sig` from a committed calcium/spike pair;
/// `mu` and `lam` pass through unchanged (`spec.md` §4.4, §9 open
/// question 2).
///
/// `estimate_tau` / `estimate_sig` gate which fields are actually
/// refit; when both are `false` this degenerates to an NLL evaluation
/// at the incoming `params`.
pub(crate) fn estimate(
    f: &[f64],
    c: &[f64],
    n: &[f64],
    dt: f64,
    params: &Parameters,
    estimate_tau: bool,
    estimate_sig: bool,
) -> ParamEstimate {
    let t = f.len();
    debug_assert_eq!(c.len(), t);
    debug_assert_eq!(n.len(), t);

    let mut tau = params.tau;
    if estimate_tau && t >= 3 {
        // W = C[0..T-1], Y = F[1..T] - n[1..T].
        let mut wy = 0.0;
        let mut ww = 0.0;
        for i in 0..t - 1 {
            let w = c[i];
            let y = f[i + 1] - n[i + 1];
            wy += w * y;
            ww += w * w;
        }
        let a_hat = if ww > 0.0 { (wy / ww).clamp(0.0, 1.0) } else { 0.0 };
        tau = if a_hat >= 1.0 - 1e-12 {
            // a -> 1 is a decay time constant blowing up; cap at a large
            // finite multiple of dt rather than propagate infinity.
            dt * 1e6
        } else {
            dt / (1.0 - a_hat)
        };
    }

    let mut sse = 0.0;
    for i in 0..t {
        let d = f[i] - c[i] - params.mu;
        sse += d * d;
    }

    let sig = if estimate_sig {
        (sse / t as f64).sqrt().max(SIGMA_FLOOR)
    } else {
        params.sig
    };

    let refined = Parameters::new(tau, params.lam, sig, params.mu);

    let sum_n: f64 = n.iter().sum();
    let nll = 0.5 * t as f64 * (2.0 * std::f64::consts::PI * sig * sig).ln()
        + sse / (2.0 * sig * sig)
        - t as f64 * (refined.lam * dt).ln()
        + refined.lam * sum_n;

    ParamEstimate { params: refined, nll }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_known_decay_factor() {
        let dt = 1.0 / 30.0;
        let a_true = 0.8;
        let t = 500;
        let mut c = vec![0.0_f64; t];
        let mut n = vec![0.0_f64; t];
        n[10] = 1.0;
        n[200] = 1.0;
        c[0] = n[0];
        for i in 1..t {
            c[i] = a_true * c[i - 1] + n[i];
        }
        let f: Vec<f64> = c.clone();

        let params = Parameters::new(0.3, 5.0, 0.05, 0.0);
        let est = estimate(&f, &c, &n, dt, &params, true, false);

        let a_hat = 1.0 - dt / est.params.tau;
        assert!((a_hat - a_true).abs() < 1e-6, "a_hat={a_hat}");
    }

    #[test]
    fn sigma_tracks_residual_noise() {
        let dt = 1.0 / 30.0;
        let t = 1000;
        // Deterministic pseudo-noise via a simple recurrence, no RNG crate.
        let mut state = 12345_u64;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 33) as f64 / u32::MAX as f64 - 0.5) * 0.02
        };
        let c = vec![0.0_f64; t];
        let n = vec![0.0_f64; t];
        let f: Vec<f64> = (0..t).map(|_| next()).collect();

        let params = Parameters::new(0.3, 5.0, 0.05, 0.0);
        let est = estimate(&f, &c, &n, dt, &params, false, true);
        assert!(est.params.sig > 0.0 && est.params.sig < 0.02);
    }

    #[test]
    fn sigma_floor_is_respected() {
        let dt = 1.0 / 30.0;
        let t = 10;
        let c = vec![0.0_f64; t];
        let n = vec![0.0_f64; t];
        let f = vec![0.0_f64; t];
        let params = Parameters::new(0.3, 5.0, 0.05, 0.0);
        let est = estimate(&f, &c, &n, dt, &params, false, true);
        assert!(est.params.sig >= SIGMA_FLOOR);
    }

    #[test]
    fn disabled_flags_leave_params_untouched() {
        let dt = 1.0 / 30.0;
        let t = 10;
        let c = vec![0.1_f64; t];
        let n = vec![0.05_f64; t];
        let f = vec![0.2_f64; t];
        let params = Parameters::new(0.3, 5.0, 0.05, 0.0);
        let est = estimate(&f, &c, &n, dt, &params, false, false);
        assert_eq!(est.params.tau, params.tau);
        assert_eq!(est.params.sig, params.sig);
        assert!(est.nll.is_finite());
    }
}
