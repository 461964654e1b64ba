//! Per-site death/toxin/perfusion model.
//!
//! State `(D, T, rCBF)`: dead fraction, toxin level and relative perfusion.
//! With `A = 1 - D`:
//!
//! ```text
//! dD/dt    = kf * A * T                         if T > Td, else 0
//! dT/dt    = kt * (1 - rCBF) * (1 - T) - kc * rCBF * A * T
//! drCBF/dt = 0
//! ```
//!
//! Perfusion only changes through the scripted treatment event, so it is
//! constant over an integration window.

use crate::ode::{Integrator, OdeError, OdeSystem};
use infarct_common::DeathParams;

/// State of one tissue site over one integration window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SiteState {
    pub dead: f64,
    pub toxin: f64,
    pub perfusion: f64,
}

impl SiteState {
    pub fn new(dead: f64, toxin: f64, perfusion: f64) -> Self {
        Self { dead, toxin, perfusion }
    }

    #[inline]
    pub fn to_array(self) -> [f64; 3] {
        [self.dead, self.toxin, self.perfusion]
    }

    #[inline]
    pub fn from_slice(y: &[f64]) -> Self {
        Self { dead: y[0], toxin: y[1], perfusion: y[2] }
    }
}

/// Threshold-gated cell death driven by a locally produced, perfusion-cleared toxin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellDeathModel {
    pub params: DeathParams,
}

impl CellDeathModel {
    pub fn new(params: DeathParams) -> Self {
        Self { params }
    }

    /// Instantaneous derivative of `state`. The system is autonomous; `_t` is ignored.
    #[inline]
    pub fn derivative(&self, _t: f64, state: SiteState) -> SiteState {
        let p = &self.params;
        let alive = 1.0 - state.dead;

        // Strict inequality: a site sitting exactly at the threshold does not die.
        let d_dead = if state.toxin > p.threshold {
            p.death_rate * alive * state.toxin
        } else {
            0.0
        };
        let d_toxin = p.toxin_production * (1.0 - state.perfusion) * (1.0 - state.toxin)
            - p.toxin_clearance * state.perfusion * alive * state.toxin;

        SiteState { dead: d_dead, toxin: d_toxin, perfusion: 0.0 }
    }

    /// Integrates one site over `sample_times` and returns the state at the last sample.
    pub fn advance<I: Integrator>(
        &self,
        integrator: &I,
        state: SiteState,
        sample_times: &[f64],
    ) -> Result<SiteState, OdeError> {
        let solution = integrator.integrate(self, &state.to_array(), sample_times)?;
        Ok(solution.final_state().map(SiteState::from_slice).unwrap_or(state))
    }
}

impl OdeSystem for CellDeathModel {
    fn ndim(&self) -> usize {
        3
    }

    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]) {
        let d = self.derivative(t, SiteState::from_slice(y));
        dydt[0] = d.dead;
        dydt[1] = d.toxin;
        dydt[2] = d.perfusion;
    }
}
