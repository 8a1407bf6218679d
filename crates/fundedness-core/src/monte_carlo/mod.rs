//! Vectorised Monte Carlo projection of retirement wealth.

pub mod config;
pub mod returns;
pub mod simulation;
pub mod stats;

pub use config::{ReturnModel, SimulationConfig};
pub use returns::{generate_returns, generate_shocks, lognormal_return};
pub use simulation::{
    run_simulation, simulate_with_policies, PathOptions, Schedule, SimulationInput,
    SimulationResult, SpendingSpec,
};
