//! Solver configuration (`spec.md` §6, exhaustive).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunables for the outer driver and the inner Newton/barrier solver.
///
/// Construct with [`Config::new`], which pins the required `dt` and fills
/// every other field with the calibration constants `spec.md` §4.3/§9
/// names as defaults. Fields are public; override after construction the
/// way the teacher's `Solver` is configured after `Solver::new()`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Sample interval, seconds. Must be > 0.
    pub dt: f64,
    /// Outer EM-style iterations. 0 disables parameter updates and runs
    /// the inner solver exactly once.
    pub max_iter: u32,
    /// Outer convergence threshold on `|ΔNLL|`.
    pub tol: f64,
    /// Barrier continuation lower bound on `eta`.
    pub eta_floor: f64,
    /// Multiplicative decay applied to `eta` per barrier stage.
    pub eta_decay: f64,
    /// Newton loop stops once the direction norm falls below this.
    pub newton_dir_tol: f64,
    /// Newton loop (and backtracking) stops once the step size falls
    /// below this.
    pub newton_step_floor: f64,
    /// Backtracking accepts a step once `L_new < L + armijo_slack`.
    pub armijo_slack: f64,
    /// Re-estimate `tau` every outer iteration.
    pub estimate_tau: bool,
    /// Re-estimate `sig` every outer iteration.
    pub estimate_sig: bool,
}

impl Config {
    /// Build a `Config` with every tunable at its spec-mandated default,
    /// requiring only the sample interval.
    pub fn new(dt: f64) -> Self {
        Config {
            dt,
            max_iter: 25,
            tol: 1e-3,
            eta_floor: 1e-13,
            eta_decay: 0.1,
            newton_dir_tol: 5e-2,
            newton_step_floor: 1e-3,
            armijo_slack: 1e-7,
            estimate_tau: true,
            estimate_sig: true,
        }
    }

    /// Whether the driver should invoke `ParamEstimator` at all this run.
    /// Derived rather than stored, see `DESIGN.md` Open Question 4.
    pub(crate) fn do_param_update(&self) -> bool {
        self.max_iter > 0 && (self.estimate_tau || self.estimate_sig)
    }
}
