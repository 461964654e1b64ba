use crate::grid::Grid;
use crate::perfusion::build_perfusion_field;
use infarct_common::PerfusionRegion;

/// Holds the tissue fields of a run. Owned exclusively by the simulation driver.
#[derive(Debug)] // Large fields shouldn't be cloned casually
pub struct TissueState {
    pub grid: Grid,

    /// Relative perfusion per site. Only the treatment event writes it.
    pub perfusion: Vec<f64>,
    /// Dead fraction per site, never decreasing.
    pub infarct: Vec<f64>,

    // --- Ping-Pong Buffers for the diffusion step ---
    // Toxin level (current step's input)
    pub toxin: Vec<f64>,
    // Toxin level (diffusion output, next step's input after the swap)
    pub toxin_next: Vec<f64>,
}

impl TissueState {
    /// Initial state: the occlusion pattern painted from `regions`, no dead tissue, no toxin.
    pub fn new(grid: Grid, regions: &[PerfusionRegion]) -> Self {
        Self {
            grid,
            perfusion: build_perfusion_field(&grid, regions),
            infarct: grid.zeros(),
            toxin: grid.zeros(),
            toxin_next: grid.zeros(),
        }
    }

    /// Makes the freshly diffused toxin field current.
    pub fn swap_toxin_buffers(&mut self) {
        std::mem::swap(&mut self.toxin, &mut self.toxin_next);
    }
}
