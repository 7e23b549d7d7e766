//! The Trade Engine (C4): admission, post-entry lay-down, reactive
//! reductions, and maintenance sweeps over a reactive single-actor core.

mod admission;
pub mod engine;
mod maintenance;
mod postentry;
mod reactive;
pub mod signal_source;

pub use engine::{Engine, EngineCommand};
pub use signal_source::{NullSignalSource, SignalSource};
