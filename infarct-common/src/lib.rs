pub mod archive;
pub mod config;
pub mod sim_params;
pub mod snapshot;

// Re-export key types for easier use by dependent crates
pub use config::{
    ConfigError, DiffusionConfig, GridConfig, HypoxiaCurve, InvariantConfig, InvariantPolicy, ModelConfig,
    OutputConfig, OutputFormat, PerfusionConfig, PerfusionRegion, SimulationConfig, SolverConfig, SolverMethod,
    ThreeStateConfig, ThreeStateOutput, ThreeStateRunConfig, TimingConfig, TreatmentConfig, MAX_DIFFUSION_COEFFICIENT,
};
pub use archive::{format_from_path, read_archive, snapshot_path, write_archive};
pub use sim_params::{DeathParams, SimParams, Treatment};
pub use snapshot::{FieldSnapshot, FieldStats, SnapshotArchive};
