//! Single-compartment alive / vulnerable / dead model driven by vessel blockage.
//!
//! Cells are alive (A), vulnerable (V) or dead (D) with `A + V + D = 1`.
//! The blockage fraction B sets the hypoxic fraction H through a logistic
//! curve. Alive <-> vulnerable is reversible, vulnerable -> dead is not.
//!
//! ```text
//! dA/dt = -kf * H * A + kb * (1 - H) * V
//! dD/dt =  kf * H * V
//! dB/dt =  ke * B
//! ```

use crate::ode::{linspace, Integrator, OdeError, OdeSystem};
use infarct_common::{HypoxiaCurve, ThreeStateConfig};
use serde::Serialize;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreeStateModel {
    pub forward_rate: f64,
    pub backward_rate: f64,
    pub extravasation_rate: f64,
    pub hypoxia: HypoxiaCurve,
}

impl ThreeStateModel {
    pub fn from_config(config: &ThreeStateConfig) -> Self {
        Self {
            forward_rate: config.forward_rate,
            backward_rate: config.backward_rate,
            extravasation_rate: config.extravasation_rate,
            hypoxia: config.dynamics_hypoxia,
        }
    }
}

impl OdeSystem for ThreeStateModel {
    fn ndim(&self) -> usize {
        3
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        let (alive, dead, blockage) = (y[0], y[1], y[2]);
        let vulnerable = 1.0 - alive - dead;
        let h = self.hypoxia.eval(blockage);
        dydt[0] = -self.forward_rate * h * alive + self.backward_rate * (1.0 - h) * vulnerable;
        dydt[1] = self.forward_rate * h * vulnerable;
        dydt[2] = self.extravasation_rate * blockage;
    }
}

/// One row of a three-state trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThreeStateSample {
    pub time_day: f64,
    pub alive: f64,
    pub vulnerable: f64,
    pub dead: f64,
    pub blockage: f64,
    /// Hypoxic fraction from the reported (fitted) curve.
    pub hypoxia: f64,
}

/// Solves the model from `(A, D, B) = (1, 0, B0)` over the configured duration.
pub fn run_three_state<I: Integrator>(
    config: &ThreeStateConfig,
    integrator: &I,
) -> Result<Vec<ThreeStateSample>, OdeError> {
    let model = ThreeStateModel::from_config(config);
    let t_eval = linspace(0.0, config.duration_s, config.num_samples);
    let y0 = [1.0, 0.0, config.initial_blockage];

    let solution = integrator.integrate(&model, &y0, &t_eval)?;
    log::debug!("Three-state model solved in {} steps.", solution.steps);

    Ok(solution
        .t
        .iter()
        .zip(&solution.y)
        .map(|(&t, y)| ThreeStateSample {
            time_day: t / SECONDS_PER_DAY,
            alive: y[0],
            vulnerable: 1.0 - y[0] - y[1],
            dead: y[1],
            blockage: y[2],
            hypoxia: config.reported_hypoxia.eval(y[2]),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::Rk45;

    fn solver() -> Rk45 {
        Rk45::new(1e-8, 1e-10, 1_000_000)
    }

    #[test]
    fn fractions_stay_consistent_and_death_is_irreversible() {
        let config = ThreeStateConfig::default();
        let samples = run_three_state(&config, &solver()).unwrap();
        assert_eq!(samples.len(), 10_080);
        assert_eq!(samples[0].alive, 1.0);
        assert!((samples.last().unwrap().time_day - 7.0).abs() < 1e-12);

        let mut previous_dead = 0.0;
        for s in &samples {
            assert!((s.alive + s.vulnerable + s.dead - 1.0).abs() < 1e-9);
            assert!(s.dead >= previous_dead - 1e-12);
            assert!(s.alive >= -1e-9 && s.vulnerable >= -1e-9);
            previous_dead = s.dead;
        }
        assert!(samples.last().unwrap().dead > 0.0);
    }

    #[test]
    fn blockage_decays_exponentially() {
        let config = ThreeStateConfig::default();
        let samples = run_three_state(&config, &solver()).unwrap();
        let last = samples.last().unwrap();
        let expected = config.initial_blockage * (config.extravasation_rate * config.duration_s).exp();
        assert!((last.blockage - expected).abs() < 1e-7, "{} vs {}", last.blockage, expected);
    }

    #[test]
    fn no_blockage_means_little_death() {
        let config = ThreeStateConfig { initial_blockage: 0.0, ..ThreeStateConfig::default() };
        let severe = ThreeStateConfig { initial_blockage: 0.3, ..ThreeStateConfig::default() };
        let mild_dead = run_three_state(&config, &solver()).unwrap().last().unwrap().dead;
        let severe_dead = run_three_state(&severe, &solver()).unwrap().last().unwrap().dead;
        assert!(severe_dead > mild_dead);
    }
}
