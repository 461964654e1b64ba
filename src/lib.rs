//! Micro-infarct propagation engine.
//!
//! A 2-D tissue grid where every hypoperfused site runs a small cell-death
//! ODE (dead fraction, toxin, perfusion) between outer iterations, toxin
//! diffuses between neighbouring sites, and perfusion can be partially
//! restored once by a scheduled treatment.

pub mod death_model;
pub mod diffusion;
pub mod error;
pub mod grid;
pub mod ode;
pub mod output;
pub mod perfusion;
pub mod simulation;
pub mod three_state;
pub mod tissue_state;

pub use death_model::{CellDeathModel, SiteState};
pub use error::{FieldKind, SimulationError};
pub use grid::Grid;
pub use ode::{Integrator, OdeError, OdeSystem, Rk4, Rk45, Solver};
pub use simulation::InfarctSimulation;
pub use three_state::{run_three_state, ThreeStateModel, ThreeStateSample};
