//! Interior-point Newton solver for the barrier-regularised calcium MAP
//! estimate, `spec.md` §4.3.
//!
//! Mirrors the teacher's `fista.rs::step_batch` in shape (preallocated
//! buffers reused across iterations, an explicit iteration counter, a
//! hoisted match over solver state) even though the update rule itself —
//! second-order Newton inside a log-barrier continuation, rather than a
//! first-order proximal-gradient step — is new: this spec calls for a
//! different algorithm than the teacher implements.

use crate::config::Config;
use crate::error::NotPositiveDefinite;
use crate::linear_ops::BidiagonalOp;
use crate::params::Parameters;
use crate::tri_solve::{solve_tridiagonal_spd, TriSolveScratch};

/// Calcium trace, spike rate, and objective value produced by a single
/// `InnerSolver::solve` call, owned copies so the driver can retain a
/// best-so-far snapshot independent of the solver's live buffers.
pub(crate) struct InnerSolverOutcome {
    pub(crate) c: Vec<f64>,
    pub(crate) n: Vec<f64>,
    pub(crate) l: f64,
}

/// Preallocated Newton-solver state, reused across outer-loop calls so no
/// T-sized buffer is allocated inside the Newton loop (`spec.md` §5, §9).
pub(crate) struct InnerSolver {
    t: usize,
    m: BidiagonalOp,
    c: Vec<f64>,
    n: Vec<f64>,
    c_new: Vec<f64>,
    n_new: Vec<f64>,
    residual: Vec<f64>,
    gradient: Vec<f64>,
    direction: Vec<f64>,
    inv_n: Vec<f64>,
    colsum: Vec<f64>,
    hess_diag: Vec<f64>,
    hess_off: Vec<f64>,
    tri_scratch: TriSolveScratch,
}

impl InnerSolver {
    pub(crate) fn new(t: usize) -> Self {
        InnerSolver {
            t,
            m: BidiagonalOp::new(t, 0.0),
            c: vec![0.0; t],
            n: vec![0.0; t],
            c_new: vec![0.0; t],
            n_new: vec![0.0; t],
            residual: vec![0.0; t],
            gradient: vec![0.0; t],
            direction: vec![0.0; t],
            inv_n: vec![0.0; t],
            colsum: vec![0.0; t],
            hess_diag: vec![0.0; t],
            hess_off: vec![0.0; t.saturating_sub(1)],
            tri_scratch: TriSolveScratch::new(t),
        }
    }

    /// Evaluate `L(C; eta) = c*||F - C - mu||^2 + lam*sum(n) - eta*sum(log n)`.
    /// Returns `None` if the result (or any input) is non-finite.
    fn objective(f: &[f64], c_vec: &[f64], n: &[f64], mu: f64, c: f64, lam: f64, eta: f64) -> Option<f64> {
        let mut sse = 0.0;
        for i in 0..f.len() {
            let d = f[i] - c_vec[i] - mu;
            sse += d * d;
        }
        let mut sum_n = 0.0;
        let mut sum_log_n = 0.0;
        for &ni in n {
            if ni <= 0.0 {
                return None;
            }
            sum_n += ni;
            sum_log_n += ni.ln();
        }
        let l = c * sse + lam * sum_n - eta * sum_log_n;
        l.is_finite().then_some(l)
    }

    /// Run the full barrier continuation + Newton solve for fixed
    /// `params`, returning the committed `(C, n, L)` at the final barrier
    /// stage.
    pub(crate) fn solve(
        &mut self,
        f: &[f64],
        params: &Parameters,
        cfg: &Config,
    ) -> Result<InnerSolverOutcome, NotPositiveDefinite> {
        let t = self.t;
        debug_assert_eq!(f.len(), t);

        let a = params.decay_factor(cfg.dt);
        self.m.set_decay(a);
        let c_prec = params.precision();
        let lam = params.lam;
        let mu = params.mu;

        // Initialisation: eta <- 1, n <- eta/lam (constant, strictly
        // positive), C <- AR(1) filter of n (solves M*C = n).
        let mut eta = 1.0;
        for ni in self.n.iter_mut() {
            *ni = eta / lam;
        }
        self.m.solve_forward(&self.n, &mut self.c);
        self.m.colsum(&mut self.colsum);

        let mut l = Self::objective(f, &self.c, &self.n, mu, c_prec, lam, eta)
            .ok_or(NotPositiveDefinite { pivot: 0 })?;

        loop {
            self.newton_stage(f, mu, c_prec, lam, eta, cfg, &mut l)?;

            if eta < cfg.eta_floor {
                break;
            }
            eta *= cfg.eta_decay;
            if eta < cfg.eta_floor {
                // One more stage at the floor value keeps the barrier from
                // jumping straight past it without ever being evaluated.
                self.newton_stage(f, mu, c_prec, lam, eta, cfg, &mut l)?;
                break;
            }
        }

        Ok(InnerSolverOutcome {
            c: self.c.clone(),
            n: self.n.clone(),
            l,
        })
    }

    /// Run Newton iterations for a single fixed barrier weight `eta`
    /// until the direction norm and step size both collapse below their
    /// floors (`spec.md` §4.3 Newton loop).
    fn newton_stage(
        &mut self,
        f: &[f64],
        mu: f64,
        c_prec: f64,
        lam: f64,
        eta: f64,
        cfg: &Config,
        l: &mut f64,
    ) -> Result<(), NotPositiveDefinite> {
        let t = self.t;
        loop {
            // 1. Residual D = F - C - mu.
            for i in 0..t {
                self.residual[i] = f[i] - self.c[i] - mu;
            }

            // 2. Gradient g = -2c*D + lam*colsum(M) - eta*M'*(1/n).
            for i in 0..t {
                self.inv_n[i] = 1.0 / self.n[i];
            }
            self.m.adjoint(&self.inv_n, &mut self.gradient);
            for i in 0..t {
                self.gradient[i] = -2.0 * c_prec * self.residual[i] + lam * self.colsum[i]
                    - eta * self.gradient[i];
                if !self.gradient[i].is_finite() {
                    return Err(NotPositiveDefinite { pivot: i });
                }
            }

            // 3. Hessian H = 2c*I + 2*eta*M'*diag(n^-2)*M.
            self.m
                .assemble_hessian(c_prec, eta, &self.n, &mut self.hess_diag, &mut self.hess_off);

            // 4. Direction d = -H^-1 * g.
            let mut neg_g = std::mem::take(&mut self.gradient);
            for v in neg_g.iter_mut() {
                *v = -*v;
            }
            let solve_result = solve_tridiagonal_spd(
                &self.hess_diag,
                &self.hess_off,
                &neg_g,
                &mut self.direction,
                &mut self.tri_scratch,
            );
            self.gradient = neg_g;
            solve_result?;

            let dir_norm = self.direction.iter().map(|v| v * v).sum::<f64>().sqrt();
            if dir_norm <= cfg.newton_dir_tol {
                return Ok(());
            }

            // 5. Feasibility step cap: s0 = min(1, 0.99 * min{h[i] : h[i] > 0}),
            // h = -n ./ (M*d).
            self.m.forward(&self.direction, &mut self.n_new); // reuse as M*d scratch
            let mut s0 = 1.0_f64;
            let mut found_binding = false;
            for i in 0..t {
                let md_i = self.n_new[i];
                if md_i < 0.0 {
                    let h_i = -self.n[i] / md_i;
                    if h_i > 0.0 {
                        s0 = if found_binding { s0.min(h_i) } else { h_i };
                        found_binding = true;
                    }
                }
            }
            if found_binding {
                s0 = (0.99 * s0).min(1.0);
            }

            // 6. Backtracking line search on the increase tolerance.
            let mut s = s0;
            let mut accepted = false;
            let mut l_new = *l;
            loop {
                for i in 0..t {
                    self.c_new[i] = self.c[i] + s * self.direction[i];
                }
                self.m.forward(&self.c_new, &mut self.n_new);
                match Self::objective(f, &self.c_new, &self.n_new, mu, c_prec, lam, eta) {
                    Some(candidate) if candidate < *l + cfg.armijo_slack => {
                        l_new = candidate;
                        accepted = true;
                        break;
                    }
                    Some(candidate) => {
                        l_new = candidate;
                    }
                    None => {}
                }
                if s <= cfg.newton_step_floor {
                    break;
                }
                s *= 0.5;
            }

            if accepted {
                // 7. Commit.
                std::mem::swap(&mut self.c, &mut self.c_new);
                std::mem::swap(&mut self.n, &mut self.n_new);
                *l = l_new;
                if !self.c.iter().all(|v| v.is_finite()) {
                    return Err(NotPositiveDefinite { pivot: 0 });
                }
            }
            // Step cap collapsed without objective decrease: accept the
            // current C unchanged and fall through to re-evaluate the
            // stopping condition (spec.md §4.3 failure modes).

            if dir_norm <= cfg.newton_dir_tol || s <= cfg.newton_step_floor {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(dt: f64) -> Config {
        Config::new(dt)
    }

    #[test]
    fn converges_on_a_quiet_trace() {
        let dt = 1.0 / 30.0;
        let params = Parameters::new(0.5, 5.0, 0.05, 0.0);
        let t = 50;
        let f = vec![0.0_f64; t];
        let mut solver = InnerSolver::new(t);
        let outcome = solver.solve(&f, &params, &cfg(dt)).unwrap();
        assert!(outcome.n.iter().all(|&v| v >= 0.0));
        assert!(outcome.l.is_finite());
    }

    #[test]
    fn n_matches_mc_within_tolerance() {
        let dt = 1.0 / 30.0;
        let params = Parameters::new(0.5, 5.0, 0.05, 0.0);
        let t = 80;
        let mut f = vec![0.0_f64; t];
        f[20] = 1.0;
        f[21] = 0.9;
        f[22] = 0.7;
        let mut solver = InnerSolver::new(t);
        let outcome = solver.solve(&f, &params, &cfg(dt)).unwrap();

        let a = params.decay_factor(dt);
        let op = BidiagonalOp::new(t, a);
        let mut n_check = vec![0.0; t];
        op.forward(&outcome.c, &mut n_check);
        let inf_norm = |v: &[f64]| v.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
        let diff: Vec<f64> = outcome
            .n
            .iter()
            .zip(&n_check)
            .map(|(a, b)| a - b)
            .collect();
        assert!(inf_norm(&diff) <= 1e-8 * inf_norm(&outcome.n).max(1e-12));
    }

    #[test]
    fn recovers_spike_support() {
        let dt = 1.0 / 30.0;
        let tau = 0.5;
        let a = 1.0 - dt / tau;
        let t = 200usize;
        let spikes = [40usize, 70, 130];
        let mut n_true = vec![0.0_f64; t];
        for &s in &spikes {
            n_true[s] = 1.0;
        }
        let mut c_true = vec![0.0_f64; t];
        c_true[0] = n_true[0];
        for i in 1..t {
            c_true[i] = a * c_true[i - 1] + n_true[i];
        }
        let f: Vec<f64> = c_true.clone();

        let params = Parameters::new(tau, 5.0, 0.05, 0.0);
        let mut solver = InnerSolver::new(t);
        let outcome = solver.solve(&f, &params, &cfg(dt)).unwrap();

        for &s in &spikes {
            let window = s.saturating_sub(1)..=(s + 1).min(t - 1);
            let peak = window.clone().map(|i| outcome.n[i]).fold(0.0_f64, f64::max);
            let overall_max = outcome.n.iter().copied().fold(0.0_f64, f64::max);
            assert!(
                peak > 0.05 * overall_max,
                "spike at {s} not recovered: window peak {peak}, overall max {overall_max}"
            );
        }
    }

    #[test]
    fn reusing_solver_across_calls_reuses_buffers() {
        // Exercises the "preallocate once, reuse across outer calls" path:
        // two solves back to back with different parameters on the same
        // InnerSolver instance must each produce self-consistent output.
        let dt = 1.0 / 30.0;
        let t = 40;
        let mut f = vec![0.0_f64; t];
        f[10] = 1.0;
        let mut solver = InnerSolver::new(t);

        let p1 = Parameters::new(0.3, 5.0, 0.05, 0.0);
        let out1 = solver.solve(&f, &p1, &cfg(dt)).unwrap();
        assert!(out1.n.iter().all(|&v| v >= 0.0));

        let p2 = Parameters::new(0.6, 5.0, 0.05, 0.0);
        let out2 = solver.solve(&f, &p2, &cfg(dt)).unwrap();
        assert!(out2.n.iter().all(|&v| v >= 0.0));
    }
}
