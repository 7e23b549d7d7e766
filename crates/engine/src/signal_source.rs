//! The Signal Intake Adapter contract surface (§4.6). The adapter itself —
//! chat polling, NLP parsing, fingerprint dedup, admission-cap enforcement,
//! staleness filtering — is out of scope; only the boundary lives here.

use async_trait::async_trait;
use tradebot_core::Signal;

#[async_trait]
pub trait SignalSource: Send {
    /// Returns any newly accepted signals since the last poll. Everything
    /// returned has already passed dedup, caps, and staleness filtering.
    async fn poll(&mut self) -> Vec<Signal>;
}

/// A `SignalSource` that never produces anything — used in tests and as
/// the default when no real adapter is wired in.
#[derive(Debug, Default)]
pub struct NullSignalSource;

#[async_trait]
impl SignalSource for NullSignalSource {
    async fn poll(&mut self) -> Vec<Signal> {
        Vec::new()
    }
}
