//! Shared types, configuration, and error taxonomy for the tastemap
//! workspace.

pub mod types;
pub mod config;
pub mod error;

pub use types::*;
pub use config::Config;
pub use error::EngineError;
