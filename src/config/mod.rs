pub mod fuzzy;
pub mod simulation;

pub use fuzzy::FuzzyConfig;
pub use simulation::{GenerationConfig, InterpolationConfig, SimulationConfig};
