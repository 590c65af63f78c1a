pub mod artifact;
pub mod chain;
pub mod cli;
pub mod config;
pub mod explorer;
pub mod orchestrator;
mod run;

pub use run::run;
