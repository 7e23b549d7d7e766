//! Accepted trade signal, handed from the Signal Intake Adapter to the engine.

use serde::{Deserialize, Serialize};

use super::trade::OrderSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSide {
    Buy,
    Sell,
}

impl SignalSide {
    pub fn as_order_side(self) -> OrderSide {
        match self {
            SignalSide::Buy => OrderSide::Buy,
            SignalSide::Sell => OrderSide::Sell,
        }
    }
}

/// A signal is immutable once accepted by the adapter; the engine never
/// mutates it, only derives a [`crate::models::trade::Trade`] from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub side: SignalSide,
    pub trigger: f64,
    #[serde(default)]
    pub tp_prices: Vec<f64>,
    #[serde(default)]
    pub sl_price: Option<f64>,
    #[serde(default)]
    pub dca_prices: Vec<f64>,
    pub fingerprint: String,
}
