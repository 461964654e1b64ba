use serde::{Deserialize, Serialize};
use anyhow::Result;
use thiserror::Error;
use crate::sim_params::{DeathParams, SimParams, Treatment};
use std::path::Path;

/// Largest diffusion coefficient for which the explicit 4-neighbour stencil stays stable on a unit grid.
pub const MAX_DIFFUSION_COEFFICIENT: f64 = 0.25;

/// Reasons a configuration is rejected before the simulation starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("grid dimensions must be positive (got {nx} x {ny})")]
    EmptyGrid { nx: usize, ny: usize },

    #[error("perfusion region {index} is empty or outside the {nx} x {ny} grid")]
    RegionOutOfBounds { index: usize, nx: usize, ny: usize },

    #[error("perfusion region {index} has value {value}, expected a value in [0, 1]")]
    RegionValue { index: usize, value: f64 },

    #[error("{name} must be finite and non-negative (got {value})")]
    NegativeRate { name: &'static str, value: f64 },

    #[error("death threshold must lie in [0, 1] (got {0})")]
    DeathThreshold(f64),

    #[error("diffusion coefficient must lie in [0, 0.25] for stability (got {value})")]
    UnstableDiffusion { value: f64 },

    #[error("{name} must be finite and positive (got {value})")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{numerator_name} ({numerator}) is not a whole multiple of {denominator_name} ({denominator})")]
    NotAMultiple {
        numerator_name: &'static str,
        numerator: f64,
        denominator_name: &'static str,
        denominator: f64,
    },

    #[error("treatment iteration {iteration} is outside [0, {num_iterations})")]
    TreatmentIteration { iteration: u32, num_iterations: u32 },

    #[error("recovery fraction must lie in [0, 1] (got {0})")]
    RecoveryFraction(f64),

    #[error("{0} must be greater than 0")]
    Zero(&'static str),

    #[error("invariant tolerance must be finite and non-negative (got {0})")]
    InvariantTolerance(f64),

    #[error("three-state model: {0}")]
    ThreeState(String),
}

// Configuration for the tissue lattice
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct GridConfig {
    pub nx: usize,
    pub ny: usize,
}

/// A rectangular block of reduced perfusion, half-open on both axes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PerfusionRegion {
    pub i_start: usize,
    pub i_end: usize,
    pub j_start: usize,
    pub j_end: usize,
    pub value: f64,
}

// Initial perfusion pattern. Regions are painted in order over a fully perfused field.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct PerfusionConfig {
    #[serde(default)]
    pub regions: Vec<PerfusionRegion>,
}

// Rate constants of the per-site death/toxin model
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub death_threshold: f64,
    pub death_rate: f64,
    pub toxin_production_rate: f64,
    pub toxin_clearance_rate: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct DiffusionConfig {
    pub coefficient: f64,
}

// Configuration for timing
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TimingConfig {
    pub total_time_min: f64,
    pub outer_step_min: f64,
    #[serde(default = "default_sample_interval_s")]
    pub sample_interval_s: f64,
}

// Scripted one-off reperfusion event
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct TreatmentConfig {
    pub iteration: u32,
    pub recovery_fraction: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverMethod {
    /// Dormand–Prince 4(5) with adaptive step control.
    Rk45,
    /// Classical fixed-step Runge–Kutta.
    Rk4,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SolverConfig {
    #[serde(default = "default_solver_method")]
    pub method: SolverMethod,
    #[serde(default = "default_tolerance")]
    pub rtol: f64,
    #[serde(default = "default_tolerance")]
    pub atol: f64,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_fixed_step_s")]
    pub fixed_step_s: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvariantPolicy {
    Off,
    Warn,
    Fatal,
}

// What to do when a field value leaves [0, 1]
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct InvariantConfig {
    #[serde(default = "default_invariant_policy")]
    pub policy: InvariantPolicy,
    #[serde(default = "default_invariant_tolerance")]
    pub tolerance: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Bincode,
    Messagepack,
}

// Configuration for output settings, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub base_filename: String,
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
    #[serde(default = "default_record_interval")]
    pub record_interval_iterations: u32,
    #[serde(default = "default_true")]
    pub save_final_csv: bool,
    #[serde(default)]
    pub save_perfusion_in_snapshot: bool,
}

/// Logistic curve `1 / (1 + exp(-(slope * b - offset)))` mapping blockage to hypoxic fraction.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct HypoxiaCurve {
    pub slope: f64,
    pub offset: f64,
}

impl HypoxiaCurve {
    #[inline]
    pub fn eval(&self, blockage: f64) -> f64 {
        1.0 / (1.0 + (-(self.slope * blockage - self.offset)).exp())
    }
}

// Parameters of the single-compartment alive/vulnerable/dead model
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ThreeStateConfig {
    pub forward_rate: f64,
    pub backward_rate: f64,
    /// Blockage clearance rate per second; negative values shrink the blockage.
    pub extravasation_rate: f64,
    pub initial_blockage: f64,
    pub duration_s: f64,
    pub num_samples: usize,
    #[serde(default = "default_dynamics_curve")]
    pub dynamics_hypoxia: HypoxiaCurve,
    #[serde(default = "default_reported_curve")]
    pub reported_hypoxia: HypoxiaCurve,
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub grid: GridConfig,
    #[serde(default)]
    pub perfusion: PerfusionConfig,
    pub model: ModelConfig,
    pub diffusion: DiffusionConfig,
    pub timing: TimingConfig,
    #[serde(default)]
    pub treatment: Option<TreatmentConfig>,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub invariants: InvariantConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub three_state: Option<ThreeStateConfig>,
}

fn default_sample_interval_s() -> f64 {
    5.0
}

fn default_solver_method() -> SolverMethod {
    SolverMethod::Rk45
}

// Same magnitude as the LSODA defaults the rate constants were fitted with
fn default_tolerance() -> f64 {
    1.49012e-8
}

fn default_max_steps() -> usize {
    100_000
}

fn default_fixed_step_s() -> f64 {
    1.0
}

fn default_invariant_policy() -> InvariantPolicy {
    InvariantPolicy::Warn
}

fn default_invariant_tolerance() -> f64 {
    1e-9
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Bincode
}

fn default_record_interval() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_dynamics_curve() -> HypoxiaCurve {
    HypoxiaCurve { slope: 30.71, offset: 5.35 }
}

fn default_reported_curve() -> HypoxiaCurve {
    HypoxiaCurve { slope: 30.19, offset: 5.11 }
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            method: default_solver_method(),
            rtol: default_tolerance(),
            atol: default_tolerance(),
            max_steps: default_max_steps(),
            fixed_step_s: default_fixed_step_s(),
        }
    }
}

impl Default for InvariantConfig {
    fn default() -> Self {
        InvariantConfig {
            policy: default_invariant_policy(),
            tolerance: default_invariant_tolerance(),
        }
    }
}

impl Default for ThreeStateConfig {
    fn default() -> Self {
        ThreeStateConfig {
            forward_rate: 6e-5,
            backward_rate: 4e-5,
            extravasation_rate: -0.1754 / 86400.0,
            initial_blockage: 0.15,
            duration_s: 604_800.0,
            num_samples: 10_080,
            dynamics_hypoxia: default_dynamics_curve(),
            reported_hypoxia: default_reported_curve(),
        }
    }
}

impl Default for SimulationConfig {
    /// The 50 x 50 ischaemic-core scenario with reperfusion after two hours.
    fn default() -> Self {
        let block = |lo: usize, hi: usize, value: f64| PerfusionRegion {
            i_start: lo,
            i_end: hi,
            j_start: lo,
            j_end: hi,
            value,
        };
        SimulationConfig {
            grid: GridConfig { nx: 50, ny: 50 },
            perfusion: PerfusionConfig {
                regions: vec![
                    block(10, 40, 0.3),
                    block(15, 35, 0.2),
                    block(20, 30, 0.1),
                    block(22, 28, 0.0),
                ],
            },
            model: ModelConfig {
                death_threshold: 0.09163922,
                death_rate: 0.00060644,
                toxin_production_rate: 0.00429805,
                toxin_clearance_rate: 0.0999227,
            },
            diffusion: DiffusionConfig { coefficient: MAX_DIFFUSION_COEFFICIENT },
            timing: TimingConfig {
                total_time_min: 360.0,
                outer_step_min: 5.0,
                sample_interval_s: default_sample_interval_s(),
            },
            treatment: Some(TreatmentConfig { iteration: 24, recovery_fraction: 0.8 }),
            solver: SolverConfig::default(),
            invariants: InvariantConfig::default(),
            output: OutputConfig {
                base_filename: "infarct_sim".to_string(),
                format: default_output_format(),
                record_interval_iterations: default_record_interval(),
                save_final_csv: true,
                save_perfusion_in_snapshot: false,
            },
            three_state: None,
        }
    }
}

/// Returns `numerator / denominator` if it is a whole number (within round-off).
fn whole_ratio(numerator: f64, denominator: f64) -> Option<u32> {
    let ratio = numerator / denominator;
    let rounded = ratio.round();
    if rounded >= 1.0 && (ratio - rounded).abs() <= 1e-9 * rounded.max(1.0) && rounded <= u32::MAX as f64 {
        Some(rounded as u32)
    } else {
        None
    }
}

fn check_rate(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeRate { name, value })
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(text)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Number of outer iterations, `total_time_min / outer_step_min`.
    pub fn num_iterations(&self) -> Result<u32, ConfigError> {
        check_positive("total_time_min", self.timing.total_time_min)?;
        check_positive("outer_step_min", self.timing.outer_step_min)?;
        whole_ratio(self.timing.total_time_min, self.timing.outer_step_min).ok_or(ConfigError::NotAMultiple {
            numerator_name: "total_time_min",
            numerator: self.timing.total_time_min,
            denominator_name: "outer_step_min",
            denominator: self.timing.outer_step_min,
        })
    }

    /// Checks every parameter the propagation run depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let GridConfig { nx, ny } = self.grid;
        if nx == 0 || ny == 0 {
            return Err(ConfigError::EmptyGrid { nx, ny });
        }

        for (index, region) in self.perfusion.regions.iter().enumerate() {
            if region.i_start >= region.i_end
                || region.j_start >= region.j_end
                || region.i_end > nx
                || region.j_end > ny
            {
                return Err(ConfigError::RegionOutOfBounds { index, nx, ny });
            }
            if !(0.0..=1.0).contains(&region.value) {
                return Err(ConfigError::RegionValue { index, value: region.value });
            }
        }

        let model = &self.model;
        if !(0.0..=1.0).contains(&model.death_threshold) {
            return Err(ConfigError::DeathThreshold(model.death_threshold));
        }
        check_rate("death_rate", model.death_rate)?;
        check_rate("toxin_production_rate", model.toxin_production_rate)?;
        check_rate("toxin_clearance_rate", model.toxin_clearance_rate)?;

        let co = self.diffusion.coefficient;
        if !(0.0..=MAX_DIFFUSION_COEFFICIENT).contains(&co) {
            return Err(ConfigError::UnstableDiffusion { value: co });
        }

        let num_iterations = self.num_iterations()?;
        check_positive("sample_interval_s", self.timing.sample_interval_s)?;
        let window_s = self.timing.outer_step_min * 60.0;
        if whole_ratio(window_s, self.timing.sample_interval_s).is_none() {
            return Err(ConfigError::NotAMultiple {
                numerator_name: "outer_step_min (in seconds)",
                numerator: window_s,
                denominator_name: "sample_interval_s",
                denominator: self.timing.sample_interval_s,
            });
        }

        if let Some(treatment) = &self.treatment {
            if treatment.iteration >= num_iterations {
                return Err(ConfigError::TreatmentIteration {
                    iteration: treatment.iteration,
                    num_iterations,
                });
            }
            if !(0.0..=1.0).contains(&treatment.recovery_fraction) {
                return Err(ConfigError::RecoveryFraction(treatment.recovery_fraction));
            }
        }

        self.solver.validate()?;

        let tol = self.invariants.tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(ConfigError::InvariantTolerance(tol));
        }
        if self.output.record_interval_iterations == 0 {
            return Err(ConfigError::Zero("output.record_interval_iterations"));
        }

        if let Some(three_state) = &self.three_state {
            three_state.validate()?;
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    /// Call [`SimulationConfig::validate`] first.
    pub fn get_sim_params(&self) -> Result<SimParams, ConfigError> {
        let num_iterations = self.num_iterations()?;

        // The per-site window is integrated in seconds, one sample per interval.
        let window_s = self.timing.outer_step_min * 60.0;
        let num_samples = whole_ratio(window_s, self.timing.sample_interval_s).ok_or(ConfigError::NotAMultiple {
            numerator_name: "outer_step_min (in seconds)",
            numerator: window_s,
            denominator_name: "sample_interval_s",
            denominator: self.timing.sample_interval_s,
        })? as usize
            + 1;
        let sample_times = (0..num_samples)
            .map(|k| window_s * k as f64 / (num_samples - 1) as f64)
            .collect();

        Ok(SimParams {
            nx: self.grid.nx,
            ny: self.grid.ny,
            num_sites: self.grid.nx * self.grid.ny,
            num_iterations,
            outer_step_min: self.timing.outer_step_min,
            sample_times,
            death: DeathParams {
                threshold: self.model.death_threshold,
                death_rate: self.model.death_rate,
                toxin_production: self.model.toxin_production_rate,
                toxin_clearance: self.model.toxin_clearance_rate,
            },
            diffusion_coefficient: self.diffusion.coefficient,
            treatment: self.treatment.as_ref().map(|t| Treatment {
                iteration: t.iteration,
                recovery_fraction: t.recovery_fraction,
            }),
        })
    }
}

impl SolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("solver.rtol", self.rtol)?;
        check_positive("solver.atol", self.atol)?;
        check_positive("solver.fixed_step_s", self.fixed_step_s)?;
        if self.max_steps == 0 {
            return Err(ConfigError::Zero("solver.max_steps"));
        }
        Ok(())
    }
}

/// The tables a standalone three-state run reads from a config file.
/// Grid, model, timing and the other propagation tables are ignored.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ThreeStateRunConfig {
    #[serde(default)]
    pub three_state: Option<ThreeStateConfig>,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub output: Option<ThreeStateOutput>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ThreeStateOutput {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
}

fn default_base_filename() -> String {
    "infarct_sim".to_string()
}

impl ThreeStateRunConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses the three-state tables and validates them; an absent `[three_state]` means defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ThreeStateRunConfig = toml::from_str(text)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.model().validate()?;
        config.solver.validate()?;
        Ok(config)
    }

    pub fn model(&self) -> ThreeStateConfig {
        self.three_state.clone().unwrap_or_default()
    }

    pub fn base_filename(&self) -> String {
        self.output.as_ref().map_or_else(default_base_filename, |o| o.base_filename.clone())
    }
}

impl ThreeStateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_rate("three_state.forward_rate", self.forward_rate)?;
        check_rate("three_state.backward_rate", self.backward_rate)?;
        if !self.extravasation_rate.is_finite() {
            return Err(ConfigError::ThreeState("extravasation_rate must be finite".into()));
        }
        if !(0.0..=1.0).contains(&self.initial_blockage) {
            return Err(ConfigError::ThreeState(format!(
                "initial_blockage must lie in [0, 1] (got {})",
                self.initial_blockage
            )));
        }
        check_positive("three_state.duration_s", self.duration_s)?;
        if self.num_samples < 2 {
            return Err(ConfigError::ThreeState("num_samples must be at least 2".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.validate(), Ok(()));
        let params = config.get_sim_params().unwrap();
        assert_eq!(params.num_iterations, 72);
        assert_eq!(params.sample_times.len(), 61);
        assert_eq!(*params.sample_times.last().unwrap(), 300.0);
        assert_eq!(params.num_sites, 2500);
    }

    #[test]
    fn rejects_unstable_diffusion() {
        let mut config = SimulationConfig::default();
        config.diffusion.coefficient = 0.26;
        assert_eq!(config.validate(), Err(ConfigError::UnstableDiffusion { value: 0.26 }));

        config.diffusion.coefficient = 0.25;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_negative_rates_and_empty_grid() {
        let mut config = SimulationConfig::default();
        config.model.toxin_clearance_rate = -0.1;
        assert!(matches!(config.validate(), Err(ConfigError::NegativeRate { name: "toxin_clearance_rate", .. })));

        let mut config = SimulationConfig::default();
        config.grid.nx = 0;
        config.perfusion.regions.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyGrid { nx: 0, ny: 50 }));
    }

    #[test]
    fn rejects_treatment_outside_run() {
        let mut config = SimulationConfig::default();
        config.treatment = Some(TreatmentConfig { iteration: 72, recovery_fraction: 0.8 });
        assert_eq!(
            config.validate(),
            Err(ConfigError::TreatmentIteration { iteration: 72, num_iterations: 72 })
        );

        config.treatment = Some(TreatmentConfig { iteration: 71, recovery_fraction: 1.5 });
        assert_eq!(config.validate(), Err(ConfigError::RecoveryFraction(1.5)));
    }

    #[test]
    fn rejects_fractional_iteration_count() {
        let mut config = SimulationConfig::default();
        config.timing.total_time_min = 362.5;
        assert!(matches!(config.validate(), Err(ConfigError::NotAMultiple { .. })));
    }

    #[test]
    fn rejects_region_outside_grid() {
        let mut config = SimulationConfig::default();
        config.perfusion.regions.push(PerfusionRegion { i_start: 45, i_end: 51, j_start: 0, j_end: 5, value: 0.5 });
        assert_eq!(config.validate(), Err(ConfigError::RegionOutOfBounds { index: 4, nx: 50, ny: 50 }));
    }

    #[test]
    fn parses_minimal_toml_with_defaults() {
        let text = r#"
            [grid]
            nx = 20
            ny = 10

            [[perfusion.regions]]
            i_start = 5
            i_end = 15
            j_start = 2
            j_end = 8
            value = 0.3

            [model]
            death_threshold = 0.09163922
            death_rate = 0.00060644
            toxin_production_rate = 0.00429805
            toxin_clearance_rate = 0.0999227

            [diffusion]
            coefficient = 0.2

            [timing]
            total_time_min = 60
            outer_step_min = 5

            [treatment]
            iteration = 6
            recovery_fraction = 0.8

            [output]
            base_filename = "run"
            format = "json"
        "#;
        let config = SimulationConfig::from_toml_str(text).unwrap();
        assert_eq!(config.grid, GridConfig { nx: 20, ny: 10 });
        assert_eq!(config.solver.method, SolverMethod::Rk45);
        assert_eq!(config.invariants.policy, InvariantPolicy::Warn);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.num_iterations().unwrap(), 12);
        assert!(config.three_state.is_none());
    }

    #[test]
    fn three_state_run_ignores_propagation_tables() {
        let text = r#"
            [grid]
            nx = 0
            ny = 10

            [timing]
            total_time_min = 7
            outer_step_min = 5

            [output]
            base_filename = "week"
            format = "json"

            [three_state]
            forward_rate = 6e-5
            backward_rate = 4e-5
            extravasation_rate = -2.0e-6
            initial_blockage = 0.2
            duration_s = 86400.0
            num_samples = 25
        "#;
        assert!(SimulationConfig::from_toml_str(text).is_err());

        let config = ThreeStateRunConfig::from_toml_str(text).unwrap();
        assert_eq!(config.model().initial_blockage, 0.2);
        assert_eq!(config.model().num_samples, 25);
        assert_eq!(config.base_filename(), "week");
        assert_eq!(config.solver, SolverConfig::default());

        let empty = ThreeStateRunConfig::from_toml_str("").unwrap();
        assert_eq!(empty.model(), ThreeStateConfig::default());
        assert_eq!(empty.base_filename(), "infarct_sim");

        let broken = "[three_state]\nforward_rate = 6e-5\nbackward_rate = 4e-5\nextravasation_rate = 0.0\ninitial_blockage = 1.5\nduration_s = 10.0\nnum_samples = 3\n";
        assert!(ThreeStateRunConfig::from_toml_str(broken).is_err());
    }

    #[test]
    fn hypoxia_curve_midpoint() {
        let curve = HypoxiaCurve { slope: 30.71, offset: 5.35 };
        let midpoint = 5.35 / 30.71;
        assert!((curve.eval(midpoint) - 0.5).abs() < 1e-12);
        assert!(curve.eval(0.0) < 0.01);
        assert!(curve.eval(1.0) > 0.99);
    }
}
