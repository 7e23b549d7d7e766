//! Trade Engine Core - shared data models, errors, configuration, and math.

pub mod config;
pub mod errors;
pub mod models;
pub mod rounding;

pub use config::Config;
pub use errors::{Error, Result};
pub use models::*;
