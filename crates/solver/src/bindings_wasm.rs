//! WASM bindings for the `infer` entry point.
//!
//! These functions are exposed to JavaScript via wasm-bindgen and use
//! serde-wasm-bindgen for the structured `InferOutput` return value.

use wasm_bindgen::prelude::*;

use crate::{Config, Parameters};

/// One-time panic-hook install so a Rust panic surfaces as a JS console
/// message instead of an opaque `unreachable` trap.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Deconvolve a single fluorescence trace.
///
/// Returns a JsValue containing the serialized `InferOutput`:
/// `{ n, params, diagnostics }`. On error, throws with the error's
/// `Display` message.
#[wasm_bindgen]
pub fn infer_trace(
    trace: &[f64],
    tau: f64,
    lam: f64,
    sig: f64,
    mu: f64,
    dt: f64,
    max_iter: u32,
) -> Result<JsValue, JsValue> {
    let params = Parameters::new(tau, lam, sig, mu);
    let mut cfg = Config::new(dt);
    cfg.max_iter = max_iter;

    let out = crate::infer(trace, params, cfg).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&out).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Deconvolve a single trace with full control over every `Config`
/// tunable, for callers that need to override the barrier/Newton
/// calibration constants rather than accept the defaults.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn infer_trace_with_config(
    trace: &[f64],
    tau: f64,
    lam: f64,
    sig: f64,
    mu: f64,
    dt: f64,
    max_iter: u32,
    tol: f64,
    eta_floor: f64,
    eta_decay: f64,
    newton_dir_tol: f64,
    newton_step_floor: f64,
    armijo_slack: f64,
    estimate_tau: bool,
    estimate_sig: bool,
) -> Result<JsValue, JsValue> {
    let params = Parameters::new(tau, lam, sig, mu);
    let cfg = Config {
        dt,
        max_iter,
        tol,
        eta_floor,
        eta_decay,
        newton_dir_tol,
        newton_step_floor,
        armijo_slack,
        estimate_tau,
        estimate_sig,
    };

    let out = crate::infer(trace, params, cfg).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&out).map_err(|e| JsValue::from_str(&e.to_string()))
}
