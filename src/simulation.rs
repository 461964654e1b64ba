use crate::death_model::{CellDeathModel, SiteState};
use crate::diffusion::diffuse;
use crate::error::{FieldKind, SimulationError};
use crate::grid::Grid;
use crate::ode::{OdeError, Solver};
use crate::perfusion::{apply_recovery, hypoperfused_sites};
use crate::tissue_state::TissueState;
use infarct_common::{
    FieldSnapshot, FieldStats, InvariantPolicy, SimParams, SimulationConfig, SnapshotArchive,
};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use std::time::Instant;

/// Invariant violations logged individually per check before the rest are summarised.
const MAX_REPORTED_VIOLATIONS: usize = 10;

/// Manages the state and execution of the micro-infarct propagation simulation.
///
/// Each iteration applies the scheduled treatment (if due), integrates the
/// death model at every hypoperfused site, then diffuses toxin across the grid.
pub struct InfarctSimulation {
    /// The simulation configuration, including initial conditions and parameters.
    config: SimulationConfig,
    params: SimParams,
    /// The tissue fields. No other component keeps or mutates them between iterations.
    state: TissueState,
    model: CellDeathModel,
    solver: Solver,
    /// Number of completed outer iterations.
    current_iteration: u32,
    /// Stores collected field snapshots at record intervals.
    recorded_snapshots: Vec<FieldSnapshot>,
}

impl InfarctSimulation {
    /// Validates the configuration and builds the initial tissue state.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let params = config.get_sim_params()?;
        let grid = Grid::new(params.nx, params.ny);
        let state = TissueState::new(grid, &config.perfusion.regions);
        let solver = Solver::from_config(&config.solver);
        let model = CellDeathModel::new(params.death);

        info!(
            "Initialised {}x{} tissue grid with {} hypoperfused sites; {} iterations of {} min, solver {}.",
            params.nx,
            params.ny,
            hypoperfused_sites(&state.perfusion),
            params.num_iterations,
            params.outer_step_min,
            solver.name()
        );
        debug!(
            "Per-site window of {} s sampled at {} points.",
            params.window_s(),
            params.sample_times.len()
        );
        if let Some(treatment) = params.treatment {
            info!(
                "Treatment scheduled at iteration {} (recovery fraction {}).",
                treatment.iteration, treatment.recovery_fraction
            );
        }

        Ok(Self {
            config,
            params,
            state,
            model,
            solver,
            current_iteration: 0,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Replaces the configured integrator.
    pub fn with_solver(mut self, solver: Solver) -> Self {
        self.solver = solver;
        self
    }

    /// Advances the simulation by one outer iteration.
    pub fn step(&mut self) -> Result<(), SimulationError> {
        let iteration = self.current_iteration;
        if iteration >= self.params.num_iterations {
            return Err(SimulationError::Finished(self.params.num_iterations));
        }

        // --- 1. Scheduled reperfusion (committed together with the ODE results) ---
        let treated = self.params.treatment.filter(|t| t.iteration == iteration).map(|t| {
            let mut perfusion = self.state.perfusion.clone();
            apply_recovery(&mut perfusion, t.recovery_fraction);
            perfusion
        });

        // --- 2. Per-site death model (Parallel) ---
        let perfusion = treated.as_deref().unwrap_or(self.state.perfusion.as_slice());
        let updates = self.integrate_sites(perfusion, iteration)?;

        if let Some(perfusion) = treated {
            self.state.perfusion = perfusion;
            info!(
                "Iteration {}: treatment applied, {} sites still hypoperfused.",
                iteration,
                hypoperfused_sites(&self.state.perfusion)
            );
        }
        let updated = updates.len();
        for (idx, end) in updates {
            // Death is irreversible; solver round-off must not lower D.
            self.state.infarct[idx] = end.dead.max(self.state.infarct[idx]);
            self.state.toxin[idx] = end.toxin;
        }

        // --- 3. Toxin diffusion (Parallel), then swap buffers ---
        self.diffuse_toxin();

        self.check_invariants(iteration)?;
        trace!("Iteration {}: integrated {} sites.", iteration, updated);

        self.current_iteration += 1;
        Ok(())
    }

    /// Runs all remaining iterations, recording the initial state and every
    /// `record_interval_iterations`-th iteration plus the last one.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        let total = self.params.num_iterations;
        let interval = self.config.output.record_interval_iterations.max(1);
        if self.recorded_snapshots.is_empty() {
            self.record_snapshot();
        }

        let start_time = Instant::now();
        while self.current_iteration < total {
            let step_start_time = Instant::now();
            self.step()?;
            let done = self.current_iteration;

            debug!(
                "Iteration [{}/{}] ({:.1} min) | Step Time: {:6.2} ms | Elapsed: {:.2} s",
                done,
                total,
                self.sim_time_min(),
                step_start_time.elapsed().as_secs_f64() * 1000.0,
                start_time.elapsed().as_secs_f64()
            );

            if done % interval == 0 || done == total {
                self.record_snapshot();
            }
        }

        info!(
            "Simulation finished {} iterations in {:.3} seconds.",
            total,
            start_time.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Integrates every site with perfusion below 1 over one window and returns the end
    /// states in site order. Fully perfused sites are skipped. Nothing is written back, so a
    /// failing site leaves the tissue fields as they were.
    fn integrate_sites(
        &self,
        perfusion: &[f64],
        iteration: u32,
    ) -> Result<Vec<(usize, SiteState)>, SimulationError> {
        let grid = self.state.grid;
        let model = self.model;
        let solver = &self.solver;
        let sample_times = self.params.sample_times.as_slice();
        let infarct = &self.state.infarct;
        let toxin = &self.state.toxin;

        // Sites are independent; results come back in site order.
        let results: Vec<Result<(usize, SiteState), (usize, OdeError)>> = (0..grid.num_sites())
            .into_par_iter()
            .filter(|&idx| perfusion[idx] < 1.0)
            .map(|idx| {
                let start = SiteState::new(infarct[idx], toxin[idx], perfusion[idx]);
                model
                    .advance(solver, start, sample_times)
                    .map(|end| (idx, end))
                    .map_err(|e| (idx, e))
            })
            .collect();

        // Sequential collect stops at the first failure in row-major order.
        results.into_iter().collect::<Result<Vec<_>, _>>().map_err(|(idx, source)| {
            let (i, j) = grid.coords(idx);
            SimulationError::SolverFailure { i, j, iteration, source }
        })
    }

    fn diffuse_toxin(&mut self) {
        let grid = self.state.grid;
        diffuse(&grid, &self.state.toxin, &mut self.state.toxin_next, self.params.diffusion_coefficient);
        self.state.swap_toxin_buffers();
    }

    /// Scans all fields for values outside `[-tol, 1 + tol]` and applies the configured policy.
    /// Returns the number of violations found.
    fn check_invariants(&self, iteration: u32) -> Result<usize, SimulationError> {
        let policy = self.config.invariants.policy;
        if policy == InvariantPolicy::Off {
            return Ok(0);
        }
        let tol = self.config.invariants.tolerance;
        let grid = self.state.grid;
        let fields = [
            (FieldKind::Perfusion, &self.state.perfusion),
            (FieldKind::Infarct, &self.state.infarct),
            (FieldKind::Toxin, &self.state.toxin),
        ];

        let mut violations = 0;
        for (field, values) in fields {
            for (idx, &value) in values.iter().enumerate() {
                if value >= -tol && value <= 1.0 + tol {
                    continue;
                }
                let (i, j) = grid.coords(idx);
                if policy == InvariantPolicy::Fatal {
                    return Err(SimulationError::InvariantViolation { field, i, j, iteration, value });
                }
                if violations < MAX_REPORTED_VIOLATIONS {
                    warn!(
                        "Iteration {}: {} value {} at site ({}, {}) is outside [0, 1]; check the model parameters.",
                        iteration, field, value, i, j
                    );
                }
                violations += 1;
            }
        }
        if violations > MAX_REPORTED_VIOLATIONS {
            warn!(
                "Iteration {}: {} further out-of-range values not shown.",
                iteration,
                violations - MAX_REPORTED_VIOLATIONS
            );
        }
        Ok(violations)
    }

    /// Records the current fields as a snapshot.
    pub fn record_snapshot(&mut self) {
        let stats = FieldStats::from_fields(&self.state.infarct, &self.state.toxin);
        debug!(
            "Recording snapshot at {:.1} min: mean infarct {:.4}, max toxin {:.4}, {} dead sites.",
            self.sim_time_min(),
            stats.mean_infarct,
            stats.max_toxin,
            stats.dead_sites
        );
        let perfusion = if self.config.output.save_perfusion_in_snapshot {
            Some(self.state.perfusion.clone())
        } else {
            None
        };
        self.recorded_snapshots.push(FieldSnapshot {
            iteration: self.current_iteration,
            time_min: self.sim_time_min(),
            infarct: self.state.infarct.clone(),
            toxin: self.state.toxin.clone(),
            perfusion,
            stats,
        });
    }

    /// Simulated time covered by the completed iterations, in minutes.
    pub fn sim_time_min(&self) -> f64 {
        self.current_iteration as f64 * self.params.outer_step_min
    }

    pub fn current_iteration(&self) -> u32 {
        self.current_iteration
    }

    pub fn is_finished(&self) -> bool {
        self.current_iteration >= self.params.num_iterations
    }

    pub fn grid(&self) -> Grid {
        self.state.grid
    }

    pub fn site(&self, i: usize, j: usize) -> SiteState {
        let idx = self.state.grid.idx(i, j);
        SiteState::new(self.state.infarct[idx], self.state.toxin[idx], self.state.perfusion[idx])
    }

    pub fn infarct(&self) -> &[f64] {
        &self.state.infarct
    }

    pub fn toxin(&self) -> &[f64] {
        &self.state.toxin
    }

    pub fn perfusion(&self) -> &[f64] {
        &self.state.perfusion
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Provides access to the recorded snapshots.
    pub fn recorded_snapshots(&self) -> &[FieldSnapshot] {
        &self.recorded_snapshots
    }

    /// Consumes the simulation, packaging the recorded snapshots with the grid shape.
    pub fn into_archive(self) -> SnapshotArchive {
        SnapshotArchive {
            nx: self.params.nx,
            ny: self.params.ny,
            outer_step_min: self.params.outer_step_min,
            snapshots: self.recorded_snapshots,
        }
    }
}
