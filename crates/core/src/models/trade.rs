//! Trade record: the mutable, durable unit of a managed position.

use serde::{Deserialize, Serialize};

/// Order side as submitted to the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// The opposite side, used when sizing reduce-only closes.
    pub fn opposite(self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Lifecycle status of a `Trade`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Pending,
    Open,
    Expired,
    Closed,
}

/// A managed position, keyed by `trade_id`.
///
/// `trade_id` is embedded in every order-link-id the engine creates and is
/// the sole handle used to correlate exchange execution events back to this
/// record (see [`crate::models::exec_event`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: String,
    pub symbol: String,
    pub order_side: OrderSide,
    pub trigger: f64,

    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub base_qty: f64,

    #[serde(default)]
    pub sl_price: Option<f64>,
    #[serde(default)]
    pub tp_prices: Vec<f64>,
    #[serde(default)]
    pub tp_splits: Vec<f64>,
    #[serde(default)]
    pub dca_prices: Vec<f64>,

    #[serde(default)]
    pub entry_order_id: Option<String>,
    #[serde(default)]
    pub tp_order_ids: Vec<Option<String>>,
    #[serde(default)]
    pub tp1_order_id: Option<String>,

    pub status: TradeStatus,

    #[serde(default)]
    pub post_orders_placed: bool,
    #[serde(default)]
    pub sl_moved_to_be: bool,
    #[serde(default)]
    pub trailing_started: bool,

    pub placed_ts: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub filled_ts: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub closed_ts: Option<chrono::DateTime<chrono::Utc>>,
}

impl Trade {
    /// `order_link_id` of the `n`th take-profit order (1-indexed, matching
    /// the exchange's `{trade_id}:TP{n}` convention).
    pub fn tp_link_id(&self, n: usize) -> String {
        format!("{}:TP{}", self.trade_id, n)
    }

    /// `order_link_id` of the `n`th DCA add (1-indexed).
    pub fn dca_link_id(&self, n: usize) -> String {
        format!("{}:DCA{}", self.trade_id, n)
    }

    /// Whether this trade's terminal timestamp is old enough to prune,
    /// per the 24h retention window in the data model.
    pub fn prunable(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        match self.status {
            TradeStatus::Closed => self.closed_ts,
            TradeStatus::Expired => self.closed_ts,
            _ => None,
        }
        .map(|ts| now - ts >= chrono::Duration::hours(24))
        .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Trade {
        Trade {
            trade_id: "t1".into(),
            symbol: "BTCUSDT".into(),
            order_side: OrderSide::Buy,
            trigger: 60000.0,
            entry_price: None,
            base_qty: 0.004,
            sl_price: Some(58000.0),
            tp_prices: vec![61000.0, 62000.0],
            tp_splits: vec![50.0, 50.0],
            dca_prices: vec![],
            entry_order_id: Some("eo1".into()),
            tp_order_ids: vec![],
            tp1_order_id: None,
            status: TradeStatus::Pending,
            post_orders_placed: false,
            sl_moved_to_be: false,
            trailing_started: false,
            placed_ts: chrono::Utc::now(),
            filled_ts: None,
            closed_ts: None,
        }
    }

    #[test]
    fn link_ids_follow_exchange_convention() {
        let t = sample();
        assert_eq!(t.tp_link_id(1), "t1:TP1");
        assert_eq!(t.dca_link_id(2), "t1:DCA2");
    }

    #[test]
    fn not_prunable_before_24h() {
        let mut t = sample();
        t.status = TradeStatus::Closed;
        t.closed_ts = Some(chrono::Utc::now() - chrono::Duration::hours(1));
        assert!(!t.prunable(chrono::Utc::now()));
    }

    #[test]
    fn prunable_after_24h() {
        let mut t = sample();
        t.status = TradeStatus::Expired;
        t.closed_ts = Some(chrono::Utc::now() - chrono::Duration::hours(25));
        assert!(t.prunable(chrono::Utc::now()));
    }
}
