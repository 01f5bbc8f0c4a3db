//! Configuration management for the resource generator.
//!
//! Provides environment detection, configuration loading from YAML files and
//! shared option types consumed by the generator and its CLI.

mod environment;
mod load;
pub mod shared;

pub use environment::*;
pub use load::*;
