//! ODE integration for the per-site tissue models.
//!
//! Two integrators share the [`Integrator`] interface:
//!
//! - [`Rk45`]: Dormand–Prince 4(5) pair with adaptive step-size control. The
//!   step size is carried across sample points, and steps are clipped so they
//!   land exactly on every requested sample time.
//! - [`Rk4`]: classical fixed-step Runge–Kutta, subdividing each sample
//!   interval into equal steps no longer than the configured step.
//!
//! Both return the state at every sample time (`t_eval`), like `odeint`.

use infarct_common::{SolverConfig, SolverMethod};
use thiserror::Error;

/// Ways an integration can fail. All of them are fatal for the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OdeError {
    #[error("initial state has {got} components, system expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("at least one sample time is required")]
    NoSamples,

    #[error("sample times must be finite and strictly increasing (offending index {index})")]
    NonIncreasingTimes { index: usize },

    #[error("invalid solver options: {0}")]
    InvalidOptions(String),

    #[error("exceeded {max_steps} steps at t={t:.6e} before reaching t={t_end:.6e}")]
    MaxStepsExceeded { max_steps: usize, t: f64, t_end: f64 },

    #[error("step size underflow at t={t:.6e} (h={h:.3e})")]
    StepSizeUnderflow { t: f64, h: f64 },

    #[error("state became non-finite at t={t:.6e}")]
    NonFinite { t: f64 },
}

/// Right-hand side of an ODE system `dy/dt = f(t, y)`.
pub trait OdeSystem {
    /// Number of state variables.
    fn ndim(&self) -> usize;

    /// Evaluate `f(t, y)` into `dydt`. Both slices have length `ndim()`.
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}

/// States at the requested sample times.
#[derive(Debug, Clone, PartialEq)]
pub struct OdeSolution {
    pub t: Vec<f64>,
    /// `y[k]` is the state at `t[k]`.
    pub y: Vec<Vec<f64>>,
    /// Number of step attempts, accepted and rejected.
    pub steps: usize,
}

impl OdeSolution {
    /// State at the last sample time.
    pub fn final_state(&self) -> Option<&[f64]> {
        self.y.last().map(|y| y.as_slice())
    }
}

/// Integrate an [`OdeSystem`] and report the state at each of `t_eval`.
///
/// `t_eval[0]` is the time of `y0`; the remaining points must be strictly increasing.
pub trait Integrator {
    fn integrate<S: OdeSystem + ?Sized>(
        &self,
        system: &S,
        y0: &[f64],
        t_eval: &[f64],
    ) -> Result<OdeSolution, OdeError>;
}

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let last = (n - 1) as f64;
            (0..n)
                .map(|k| if k == n - 1 { end } else { start + (end - start) * k as f64 / last })
                .collect()
        }
    }
}

fn check_inputs<S: OdeSystem + ?Sized>(system: &S, y0: &[f64], t_eval: &[f64]) -> Result<(), OdeError> {
    let n = system.ndim();
    if y0.len() != n {
        return Err(OdeError::DimensionMismatch { expected: n, got: y0.len() });
    }
    if t_eval.is_empty() {
        return Err(OdeError::NoSamples);
    }
    if !t_eval[0].is_finite() {
        return Err(OdeError::NonIncreasingTimes { index: 0 });
    }
    for (index, pair) in t_eval.windows(2).enumerate() {
        if !pair[1].is_finite() || pair[1] <= pair[0] {
            return Err(OdeError::NonIncreasingTimes { index: index + 1 });
        }
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(OdeError::NonFinite { t: t_eval[0] });
    }
    Ok(())
}

// Dormand–Prince tableau
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights, used to advance (local extrapolation)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between the 5th- and embedded 4th-order weights
const E1: f64 = B1 - 5179.0 / 57600.0;
const E3: f64 = B3 - 7571.0 / 16695.0;
const E4: f64 = B4 - 393.0 / 640.0;
const E5: f64 = B5 + 92097.0 / 339200.0;
const E6: f64 = B6 - 187.0 / 2100.0;
const E7: f64 = -1.0 / 40.0;

/// Dormand–Prince 4(5) adaptive integrator.
#[derive(Debug, Clone, PartialEq)]
pub struct Rk45 {
    pub rtol: f64,
    pub atol: f64,
    /// Smallest step attempted before giving up.
    pub h_min: f64,
    pub h_max: f64,
    /// Step attempts allowed per `integrate` call.
    pub max_steps: usize,
}

impl Default for Rk45 {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            h_min: 1e-12,
            h_max: f64::INFINITY,
            max_steps: 100_000,
        }
    }
}

impl Rk45 {
    pub fn new(rtol: f64, atol: f64, max_steps: usize) -> Self {
        Self { rtol, atol, max_steps, ..Self::default() }
    }

    fn validate(&self) -> Result<(), OdeError> {
        if !self.rtol.is_finite() || self.rtol <= 0.0 {
            return Err(OdeError::InvalidOptions("rtol must be finite and > 0".into()));
        }
        if !self.atol.is_finite() || self.atol <= 0.0 {
            return Err(OdeError::InvalidOptions("atol must be finite and > 0".into()));
        }
        if !(self.h_min > 0.0) || self.h_max < self.h_min {
            return Err(OdeError::InvalidOptions("require 0 < h_min <= h_max".into()));
        }
        if self.max_steps == 0 {
            return Err(OdeError::InvalidOptions("max_steps must be > 0".into()));
        }
        Ok(())
    }
}

impl Integrator for Rk45 {
    fn integrate<S: OdeSystem + ?Sized>(
        &self,
        sys: &S,
        y0: &[f64],
        t_eval: &[f64],
    ) -> Result<OdeSolution, OdeError> {
        self.validate()?;
        check_inputs(sys, y0, t_eval)?;

        let n = sys.ndim();
        let mut sol = OdeSolution { t: vec![t_eval[0]], y: vec![y0.to_vec()], steps: 0 };
        if t_eval.len() == 1 {
            return Ok(sol);
        }

        let mut t = t_eval[0];
        let mut y = y0.to_vec();
        let span = t_eval[t_eval.len() - 1] - t;
        let mut h = (span * 1e-3).max(self.h_min).min(self.h_max);

        let mut k1 = vec![0.0; n];
        let mut k2 = vec![0.0; n];
        let mut k3 = vec![0.0; n];
        let mut k4 = vec![0.0; n];
        let mut k5 = vec![0.0; n];
        let mut k6 = vec![0.0; n];
        let mut k7 = vec![0.0; n];
        let mut y_tmp = vec![0.0; n];
        let mut y_new = vec![0.0; n];

        sys.rhs(t, &y, &mut k1);

        for &t_target in &t_eval[1..] {
            while t < t_target {
                if sol.steps >= self.max_steps {
                    return Err(OdeError::MaxStepsExceeded { max_steps: self.max_steps, t, t_end: t_target });
                }
                sol.steps += 1;

                let remaining = t_target - t;
                let lands = h >= remaining;
                let step = if lands { remaining } else { h };

                for i in 0..n {
                    y_tmp[i] = y[i] + step * A21 * k1[i];
                }
                sys.rhs(t + step / 5.0, &y_tmp, &mut k2);

                for i in 0..n {
                    y_tmp[i] = y[i] + step * (A31 * k1[i] + A32 * k2[i]);
                }
                sys.rhs(t + 3.0 * step / 10.0, &y_tmp, &mut k3);

                for i in 0..n {
                    y_tmp[i] = y[i] + step * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
                }
                sys.rhs(t + 4.0 * step / 5.0, &y_tmp, &mut k4);

                for i in 0..n {
                    y_tmp[i] = y[i] + step * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
                }
                sys.rhs(t + 8.0 * step / 9.0, &y_tmp, &mut k5);

                for i in 0..n {
                    y_tmp[i] = y[i]
                        + step * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
                }
                sys.rhs(t + step, &y_tmp, &mut k6);

                for i in 0..n {
                    y_new[i] = y[i] + step * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
                }
                let t_next = if lands { t_target } else { t + step };
                sys.rhs(t_next, &y_new, &mut k7);

                let mut err_norm = 0.0;
                for i in 0..n {
                    let ei = step
                        * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
                    let sc = self.atol + self.rtol * y[i].abs().max(y_new[i].abs());
                    err_norm += (ei / sc) * (ei / sc);
                }
                err_norm = (err_norm / n.max(1) as f64).sqrt();

                let accepted = err_norm.is_finite() && err_norm <= 1.0;
                if accepted {
                    t = t_next;
                    y.copy_from_slice(&y_new);
                    k1.copy_from_slice(&k7); // FSAL
                    if y.iter().any(|v| !v.is_finite()) {
                        return Err(OdeError::NonFinite { t });
                    }
                }

                let factor = if !err_norm.is_finite() {
                    0.2
                } else if err_norm == 0.0 {
                    5.0
                } else {
                    (0.9 * err_norm.powf(-0.2)).clamp(0.2, 5.0)
                };
                let proposed = (step * factor).min(self.h_max);
                if !accepted && (proposed < self.h_min || t + proposed == t) {
                    return Err(OdeError::StepSizeUnderflow { t, h: proposed });
                }
                // A step shortened only to hit a sample point says nothing about the usable step size.
                h = if accepted && lands { h.max(proposed) } else { proposed.max(self.h_min) };
            }
            sol.t.push(t_target);
            sol.y.push(y.clone());
        }

        Ok(sol)
    }
}

/// Classical fixed-step RK4.
#[derive(Debug, Clone, PartialEq)]
pub struct Rk4 {
    /// Largest step; each sample interval is split into equal steps no longer than this.
    pub step: f64,
}

impl Integrator for Rk4 {
    fn integrate<S: OdeSystem + ?Sized>(
        &self,
        sys: &S,
        y0: &[f64],
        t_eval: &[f64],
    ) -> Result<OdeSolution, OdeError> {
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(OdeError::InvalidOptions("step must be finite and > 0".into()));
        }
        check_inputs(sys, y0, t_eval)?;

        let n = sys.ndim();
        let mut sol = OdeSolution { t: vec![t_eval[0]], y: vec![y0.to_vec()], steps: 0 };
        let mut y = y0.to_vec();
        let mut k1 = vec![0.0; n];
        let mut k2 = vec![0.0; n];
        let mut k3 = vec![0.0; n];
        let mut k4 = vec![0.0; n];
        let mut y_tmp = vec![0.0; n];

        for pair in t_eval.windows(2) {
            let (t_a, t_b) = (pair[0], pair[1]);
            let substeps = ((t_b - t_a) / self.step - 1e-9).ceil().max(1.0) as usize;
            let dt = (t_b - t_a) / substeps as f64;

            for s in 0..substeps {
                let t = t_a + dt * s as f64;
                sys.rhs(t, &y, &mut k1);
                for i in 0..n {
                    y_tmp[i] = y[i] + 0.5 * dt * k1[i];
                }
                sys.rhs(t + 0.5 * dt, &y_tmp, &mut k2);
                for i in 0..n {
                    y_tmp[i] = y[i] + 0.5 * dt * k2[i];
                }
                sys.rhs(t + 0.5 * dt, &y_tmp, &mut k3);
                for i in 0..n {
                    y_tmp[i] = y[i] + dt * k3[i];
                }
                sys.rhs(t + dt, &y_tmp, &mut k4);
                for i in 0..n {
                    y[i] += dt / 6.0 * (k1[i] + 2.0 * (k2[i] + k3[i]) + k4[i]);
                }
                sol.steps += 1;
                if y.iter().any(|v| !v.is_finite()) {
                    return Err(OdeError::NonFinite { t: t + dt });
                }
            }
            sol.t.push(t_b);
            sol.y.push(y.clone());
        }

        Ok(sol)
    }
}

/// The integrator chosen by configuration. Every site of a run uses the same one.
#[derive(Debug, Clone, PartialEq)]
pub enum Solver {
    Rk45(Rk45),
    Rk4(Rk4),
}

impl Solver {
    pub fn from_config(config: &SolverConfig) -> Self {
        match config.method {
            SolverMethod::Rk45 => Solver::Rk45(Rk45::new(config.rtol, config.atol, config.max_steps)),
            SolverMethod::Rk4 => Solver::Rk4(Rk4 { step: config.fixed_step_s }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Solver::Rk45(_) => "rk45",
            Solver::Rk4(_) => "rk4",
        }
    }
}

impl Integrator for Solver {
    fn integrate<S: OdeSystem + ?Sized>(
        &self,
        system: &S,
        y0: &[f64],
        t_eval: &[f64],
    ) -> Result<OdeSolution, OdeError> {
        match self {
            Solver::Rk45(solver) => solver.integrate(system, y0, t_eval),
            Solver::Rk4(solver) => solver.integrate(system, y0, t_eval),
        }
    }
}
