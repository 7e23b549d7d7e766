//! Execution/order events streamed from the private WebSocket feed.

use serde::{Deserialize, Serialize};

/// A fill (or partial fill) reported on the `execution` topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionEvent {
    pub symbol: String,
    #[serde(default)]
    pub order_link_id: Option<String>,
    #[serde(default)]
    pub exec_price: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub last_price: Option<f64>,
    #[serde(default)]
    pub exec_qty: Option<f64>,
}

impl ExecutionEvent {
    /// Resolves a fill price, preferring `execPrice`, falling back through
    /// `price` then `lastPrice`.
    pub fn resolved_price(&self) -> Option<f64> {
        self.exec_price.or(self.price).or(self.last_price)
    }
}

/// An update reported on the `order` topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    pub symbol: String,
    #[serde(default)]
    pub order_link_id: Option<String>,
    #[serde(default)]
    pub order_status: Option<String>,
}

/// The parsed meaning of an `order_link_id`: which trade it belongs to and
/// which derived order (if any) it names. This is the sole correlation
/// mechanism between exchange events and engine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    /// `{trade_id}` — the entry order itself.
    Entry,
    /// `{trade_id}:TP{n}`, 1-indexed.
    TakeProfit(usize),
    /// `{trade_id}:DCA{n}`, 1-indexed.
    Dca(usize),
}

/// Parses an `order_link_id` into a `(trade_id, LinkKind)` pair. Returns
/// `None` for unrecognized suffixes, which callers must ignore rather than
/// error on (per the invariant-violation handling in the error design).
pub fn parse_link_id(link_id: &str) -> Option<(String, LinkKind)> {
    match link_id.split_once(':') {
        None => Some((link_id.to_string(), LinkKind::Entry)),
        Some((trade_id, suffix)) => {
            if let Some(n) = suffix.strip_prefix("TP") {
                n.parse::<usize>()
                    .ok()
                    .map(|n| (trade_id.to_string(), LinkKind::TakeProfit(n)))
            } else if let Some(n) = suffix.strip_prefix("DCA") {
                n.parse::<usize>()
                    .ok()
                    .map(|n| (trade_id.to_string(), LinkKind::Dca(n)))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entry_link() {
        assert_eq!(
            parse_link_id("abc123"),
            Some(("abc123".to_string(), LinkKind::Entry))
        );
    }

    #[test]
    fn parses_tp_link() {
        assert_eq!(
            parse_link_id("abc123:TP1"),
            Some(("abc123".to_string(), LinkKind::TakeProfit(1)))
        );
    }

    #[test]
    fn parses_dca_link() {
        assert_eq!(
            parse_link_id("abc123:DCA2"),
            Some(("abc123".to_string(), LinkKind::Dca(2)))
        );
    }

    #[test]
    fn unknown_suffix_is_ignored() {
        assert_eq!(parse_link_id("abc123:WHATEVER"), None);
    }

    #[test]
    fn resolved_price_prefers_exec_price() {
        let ev = ExecutionEvent {
            symbol: "BTCUSDT".into(),
            order_link_id: None,
            exec_price: Some(100.0),
            price: Some(99.0),
            last_price: Some(98.0),
            exec_qty: None,
        };
        assert_eq!(ev.resolved_price(), Some(100.0));
    }
}
