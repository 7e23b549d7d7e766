//! Signed REST/WS transport for the exchange: the Exchange Client component.

pub mod client;
pub mod signing;
pub mod types;
pub mod ws;

pub use client::ExchangeClient;
pub use ws::{run_private_ws, WsEvent};
