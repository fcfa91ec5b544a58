use numpy::{PyArray1, PyReadonlyArray1, PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::prelude::*;

use crate::{Config, Parameters};

const CONTIGUOUS_ERR: &str = "array must be C-contiguous; call numpy.ascontiguousarray() before passing";

fn infer_error_to_py(e: crate::InferError) -> PyErr {
    pyo3::exceptions::PyValueError::new_err(e.to_string())
}

#[allow(clippy::too_many_arguments)]
fn build_config(dt: f64, max_iter: u32, tol: f64, estimate_tau: bool, estimate_sig: bool) -> Config {
    let mut cfg = Config::new(dt);
    cfg.max_iter = max_iter;
    cfg.tol = tol;
    cfg.estimate_tau = estimate_tau;
    cfg.estimate_sig = estimate_sig;
    cfg
}

/// One-shot deconvolution for a single 1D fluorescence trace.
/// Returns (n, tau, lam, sig, mu, iterations, converged, final_nll).
#[pyfunction]
#[pyo3(signature = (trace, dt, tau, lam, sig, mu, max_iter=25, tol=1e-3, estimate_tau=true, estimate_sig=true))]
#[allow(clippy::too_many_arguments)]
fn infer_trace<'py>(
    py: Python<'py>,
    trace: PyReadonlyArray1<f64>,
    dt: f64,
    tau: f64,
    lam: f64,
    sig: f64,
    mu: f64,
    max_iter: u32,
    tol: f64,
    estimate_tau: bool,
    estimate_sig: bool,
) -> PyResult<(Bound<'py, PyArray1<f64>>, f64, f64, f64, f64, u32, bool, Option<f64>)> {
    let slice = trace.as_slice().map_err(|_| pyo3::exceptions::PyValueError::new_err(CONTIGUOUS_ERR))?;
    let params = Parameters::new(tau, lam, sig, mu);
    let cfg = build_config(dt, max_iter, tol, estimate_tau, estimate_sig);

    let out = crate::infer(slice, params, cfg).map_err(infer_error_to_py)?;

    Ok((
        PyArray1::from_vec(py, out.n),
        out.params.tau,
        out.params.lam,
        out.params.sig,
        out.params.mu,
        out.diagnostics.iterations,
        out.diagnostics.converged,
        out.diagnostics.final_nll,
    ))
}

/// Batch deconvolution for a 2D array of traces (n_cells x n_timepoints),
/// all sharing one initial parameter set and config. Returns per-cell
/// (n, tau, lam, sig, mu, iterations, converged, final_nll) lists.
#[pyfunction]
#[pyo3(signature = (traces, dt, tau, lam, sig, mu, max_iter=25, tol=1e-3, estimate_tau=true, estimate_sig=true))]
#[allow(clippy::too_many_arguments)]
fn infer_batch<'py>(
    py: Python<'py>,
    traces: PyReadonlyArray2<f64>,
    dt: f64,
    tau: f64,
    lam: f64,
    sig: f64,
    mu: f64,
    max_iter: u32,
    tol: f64,
    estimate_tau: bool,
    estimate_sig: bool,
) -> PyResult<(
    Vec<Bound<'py, PyArray1<f64>>>,
    Vec<f64>,
    Vec<f64>,
    Vec<f64>,
    Vec<u32>,
    Vec<bool>,
)> {
    let shape = traces.shape();
    let n_cells = shape[0];
    let traces_arr = traces.as_array();
    let cfg = build_config(dt, max_iter, tol, estimate_tau, estimate_sig);

    let mut ns = Vec::with_capacity(n_cells);
    let mut taus = Vec::with_capacity(n_cells);
    let mut sigs = Vec::with_capacity(n_cells);
    let mut nlls = Vec::with_capacity(n_cells);
    let mut iterations = Vec::with_capacity(n_cells);
    let mut convergeds = Vec::with_capacity(n_cells);

    for cell_idx in 0..n_cells {
        let row: Vec<f64> = traces_arr.row(cell_idx).iter().copied().collect();
        let params = Parameters::new(tau, lam, sig, mu);
        let out = crate::infer(&row, params, cfg).map_err(infer_error_to_py)?;

        ns.push(PyArray1::from_vec(py, out.n));
        taus.push(out.params.tau);
        sigs.push(out.params.sig);
        nlls.push(out.diagnostics.final_nll.unwrap_or(f64::NAN));
        iterations.push(out.diagnostics.iterations);
        convergeds.push(out.diagnostics.converged);
    }

    Ok((ns, taus, sigs, nlls, iterations, convergeds))
}

/// Register the Python module.
#[pymodule]
fn _solver(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(infer_trace, m)?)?;
    m.add_function(wrap_pyfunction!(infer_batch, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
