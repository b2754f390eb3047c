pub mod config;
pub mod persistence;
pub mod simulation;

pub use config::SimulationConfig;
pub use simulation::{Garden, Simulation};
