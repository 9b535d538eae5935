pub mod category;
pub mod engine;
pub mod membership;
pub mod rule;
pub mod variable;

pub use category::{Categorizer, Category};
pub use engine::{FuzzySystem, InferenceError, Simulation, SimulationState};
pub use membership::MembershipFunction;
pub use variable::{FuzzyVariable, Role, UNDEFINED_LABEL, Universe};
