//! Durable persistence: the Instrument Cache and State Store components.

pub mod cache;
pub mod state_store;

pub use cache::InstrumentCache;
pub use state_store::StateStore;
