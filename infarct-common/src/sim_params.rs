use serde::{Deserialize, Serialize};

/// Rate constants of the per-site death/toxin model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeathParams {
    /// Toxin level above which cells start dying (Td).
    pub threshold: f64,
    /// Death rate of alive cells exposed to toxin (kf).
    pub death_rate: f64,
    /// Toxin production under hypoperfusion (kt).
    pub toxin_production: f64,
    /// Toxin clearance by perfused, alive tissue (kc).
    pub toxin_clearance: f64,
}

/// One-off partial reperfusion applied before the ODE stage of `iteration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub iteration: u32,
    pub recovery_fraction: f64,
}

/// Simulation parameters derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // Grid
    pub nx: usize,
    pub ny: usize,
    pub num_sites: usize,

    // Time
    pub num_iterations: u32,
    pub outer_step_min: f64,
    /// Sample points of one outer step's integration window, in seconds, starting at 0.
    pub sample_times: Vec<f64>,

    // Model
    pub death: DeathParams,
    pub diffusion_coefficient: f64,
    pub treatment: Option<Treatment>,
}

impl SimParams {
    /// Length of one integration window in seconds.
    pub fn window_s(&self) -> f64 {
        self.sample_times.last().copied().unwrap_or(0.0)
    }
}
