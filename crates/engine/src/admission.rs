//! Admission control (§4.1): turns an accepted `Signal` into a `pending`
//! `Trade` and a live conditional entry order.

use tracing::{info, warn};

use tradebot_core::rounding::{round_price, round_qty};
use tradebot_core::{OrderSide, Result, Signal, Trade, TradeStatus};
use tradebot_exchange::types::PlaceOrderRequest;

use crate::engine::Engine;

impl Engine {
    pub async fn admit(&mut self, signal: Signal) -> Result<()> {
        // The adapter already de-dups by fingerprint, but `seen_fingerprints`
        // is engine-owned persisted state — re-checking here is what actually
        // guarantees idempotent admission rather than trusting the caller.
        if self.state.seen_fingerprints.contains(&signal.fingerprint) {
            info!(fingerprint = %signal.fingerprint, "duplicate signal fingerprint, skipping admission");
            return Ok(());
        }

        let order_side = signal.side.as_order_side();

        if let Err(e) = self.exchange.set_leverage(&self.config.category, &signal.symbol, self.config.leverage).await {
            warn!(symbol = %signal.symbol, error = %e, "failed to set leverage, continuing");
        }

        let last = self.exchange.last_price(&self.config.category, &signal.symbol).await?;

        if let Some(reason) = rejection_reason(
            order_side,
            last,
            signal.trigger,
            self.config.entry_too_far_pct,
            self.config.entry_expiration_price_pct,
        ) {
            info!(symbol = %signal.symbol, reason, "signal rejected at admission");
            return Ok(());
        }

        let rules = self.instrument_rules(&signal.symbol).await?;

        let trigger_adj = round_price(
            adjust_trigger(order_side, signal.trigger, self.config.entry_trigger_buffer_pct),
            rules.tick_size,
        );
        let limit_price = round_price(
            offset_limit(order_side, signal.trigger, self.config.entry_limit_price_offset_pct),
            rules.tick_size,
        );

        let equity = self.exchange.wallet_equity(&self.config.account_type).await?;
        let base_qty = round_qty(calc_base_qty(equity, self.config.risk_pct, self.config.leverage, signal.trigger), rules.qty_step, rules.min_qty);

        let direction = trigger_direction(last, trigger_adj);

        let trade_id = self.next_trade_id(&signal.symbol);

        let body = PlaceOrderRequest {
            category: self.config.category.clone(),
            symbol: signal.symbol.clone(),
            side: side_str(order_side).to_string(),
            order_type: "Limit".to_string(),
            qty: fmt(base_qty),
            price: Some(fmt(limit_price)),
            trigger_price: Some(fmt(trigger_adj)),
            trigger_by: Some("LastPrice".to_string()),
            trigger_direction: Some(direction),
            reduce_only: false,
            time_in_force: "GTC".to_string(),
            order_link_id: trade_id.clone(),
        };

        let entry_order_id = self.exchange.place_order(&body).await?;

        let now = chrono::Utc::now();
        let trade = Trade {
            trade_id: trade_id.clone(),
            symbol: signal.symbol.clone(),
            order_side,
            trigger: signal.trigger,
            entry_price: None,
            base_qty,
            sl_price: signal.sl_price,
            tp_prices: signal.tp_prices.clone(),
            tp_splits: self.config.tp_splits.clone(),
            dca_prices: signal.dca_prices.clone(),
            entry_order_id: Some(entry_order_id),
            tp_order_ids: Vec::new(),
            tp1_order_id: None,
            status: TradeStatus::Pending,
            post_orders_placed: false,
            sl_moved_to_be: false,
            trailing_started: false,
            placed_ts: now,
            filled_ts: None,
            closed_ts: None,
        };

        self.state.open_trades.insert(trade_id.clone(), trade);
        self.state.seen_fingerprints.insert(signal.fingerprint);
        self.state.increment_today(now);
        self.persist().await?;

        info!(trade_id, symbol = %signal.symbol, "trade admitted");
        Ok(())
    }
}

/// Implements both admission gatekeepers. Returns a rejection reason, or
/// `None` if the signal passes both.
pub(crate) fn rejection_reason(
    side: OrderSide,
    last: f64,
    trigger: f64,
    too_far_pct: f64,
    expiry_price_pct: f64,
) -> Option<&'static str> {
    if too_far(side, last, trigger, too_far_pct) {
        return Some("too far past trigger");
    }
    if expiry_price_pct > 0.0 && beyond_expiry_price(side, last, trigger, expiry_price_pct) {
        return Some("beyond expiry price");
    }
    None
}

fn too_far(side: OrderSide, last: f64, trigger: f64, too_far_pct: f64) -> bool {
    match side {
        OrderSide::Buy => last >= trigger * (1.0 + too_far_pct / 100.0),
        OrderSide::Sell => last <= trigger * (1.0 - too_far_pct / 100.0),
    }
}

fn beyond_expiry_price(side: OrderSide, last: f64, trigger: f64, expiry_pct: f64) -> bool {
    match side {
        OrderSide::Buy => last >= trigger * (1.0 + expiry_pct / 100.0),
        OrderSide::Sell => last <= trigger * (1.0 - expiry_pct / 100.0),
    }
}

fn adjust_trigger(side: OrderSide, trigger: f64, buffer_pct: f64) -> f64 {
    match side {
        OrderSide::Buy => trigger * (1.0 + buffer_pct / 100.0),
        OrderSide::Sell => trigger * (1.0 - buffer_pct / 100.0),
    }
}

fn offset_limit(side: OrderSide, trigger: f64, offset_pct: f64) -> f64 {
    match side {
        OrderSide::Buy => trigger * (1.0 - offset_pct / 100.0),
        OrderSide::Sell => trigger * (1.0 + offset_pct / 100.0),
    }
}

pub(crate) fn trigger_direction(last: f64, trigger_adj: f64) -> u8 {
    if last < trigger_adj {
        1 // rises
    } else if last > trigger_adj {
        2 // falls
    } else {
        1 // default to rises when equal
    }
}

fn calc_base_qty(equity: f64, risk_pct: f64, leverage: u32, trigger: f64) -> f64 {
    let margin = equity * risk_pct / 100.0;
    let notional = margin * leverage as f64;
    notional / trigger
}

fn side_str(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "Buy",
        OrderSide::Sell => "Sell",
    }
}

/// Formats a price/qty the way Bybit expects: a plain decimal string, not
/// scientific notation, with trailing zeros trimmed.
pub(crate) fn fmt(value: f64) -> String {
    let s = format!("{value:.10}");
    let trimmed = s.trim_end_matches('0');
    let trimmed = trimmed.trim_end_matches('.');
    if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_2_short_rejected_too_far() {
        // ETHUSDT sell, trigger=3000, last=2970, ENTRY_TOO_FAR_PCT=0.5
        let reason = rejection_reason(OrderSide::Sell, 2970.0, 3000.0, 0.5, 0.0);
        assert_eq!(reason, Some("too far past trigger"));
    }

    #[test]
    fn long_not_rejected_when_within_range() {
        let reason = rejection_reason(OrderSide::Buy, 59800.0, 60000.0, 0.5, 0.6);
        assert_eq!(reason, None);
    }

    #[test]
    fn scenario_1_base_qty_and_direction() {
        // equity=1000, risk=5%, leverage=5, trigger=60000 -> qty=0.004 after rounding
        let qty = calc_base_qty(1000.0, 5.0, 5, 60000.0);
        assert_eq!(round_qty(qty, 0.001, 0.001), 0.004);

        let direction = trigger_direction(59800.0, 60000.0);
        assert_eq!(direction, 1);
    }

    #[test]
    fn fmt_trims_trailing_zeros() {
        assert_eq!(fmt(60000.0), "60000");
        assert_eq!(fmt(60000.1), "60000.1");
    }

    #[test]
    fn invariant_7_duplicate_fingerprint_is_a_pure_lookup() {
        // The dedup check itself (seen_fingerprints.contains) is exercised
        // directly here since admit() needs a live ExchangeClient past this
        // point; the ring's own dedup behavior is covered in state.rs.
        use tradebot_core::FingerprintRing;
        let mut ring = FingerprintRing::new(16);
        ring.insert("sig-abc".to_string());
        assert!(ring.contains("sig-abc"));
    }
}
