//! Per-symbol quantization rules, cached by the Instrument Cache component.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstrumentRules {
    pub tick_size: f64,
    pub qty_step: f64,
    pub min_qty: f64,
}
