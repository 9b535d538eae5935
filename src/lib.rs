pub mod cli;
pub mod config;
pub mod fuzzy;
pub mod simulation;
pub mod spatial;
