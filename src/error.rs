use crate::ode::OdeError;
use infarct_common::ConfigError;
use thiserror::Error;

/// Which tissue field an invariant check looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Perfusion,
    Infarct,
    Toxin,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FieldKind::Perfusion => "perfusion",
            FieldKind::Infarct => "infarct",
            FieldKind::Toxin => "toxin",
        })
    }
}

/// Errors that abort a propagation run.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("ODE solver failed at site ({i}, {j}) in iteration {iteration}: {source}")]
    SolverFailure {
        i: usize,
        j: usize,
        iteration: u32,
        #[source]
        source: OdeError,
    },

    #[error("{field} value {value} at site ({i}, {j}) left [0, 1] in iteration {iteration}")]
    InvariantViolation {
        field: FieldKind,
        i: usize,
        j: usize,
        iteration: u32,
        value: f64,
    },

    #[error("simulation already finished all {0} iterations")]
    Finished(u32),
}
