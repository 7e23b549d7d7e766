//! Post-entry lay-down (§4.2): the SL, TP ladder, and DCA adds placed once
//! an entry fill promotes a trade to `open`.

use tracing::{info, warn};

use tradebot_core::rounding::{round_price, round_qty};
use tradebot_core::{ExecutionEvent, OrderSide, Result, TradeStatus};
use tradebot_exchange::types::{PlaceOrderRequest, TradingStopRequest};

use crate::admission::{fmt, trigger_direction};
use crate::engine::Engine;

impl Engine {
    /// Handles a fill on the entry order: promotes the trade to `open` and
    /// (on first fill) lays down SL/TP/DCA orders.
    pub(crate) async fn handle_entry_fill(&mut self, trade_id: &str, ev: &ExecutionEvent) -> Result<()> {
        let Some(trade) = self.state.open_trades.get(trade_id) else {
            return Ok(());
        };
        if trade.status != TradeStatus::Pending {
            return Ok(());
        }

        let entry_price = ev.resolved_price().unwrap_or(trade.trigger);

        {
            let trade = self.state.open_trades.get_mut(trade_id).expect("checked above");
            trade.entry_price = Some(entry_price);
            trade.status = TradeStatus::Open;
            trade.filled_ts = Some(chrono::Utc::now());
        }
        self.persist().await?;
        info!(trade_id, entry_price, "entry filled");

        let already_placed = self.state.open_trades.get(trade_id).map(|t| t.post_orders_placed).unwrap_or(true);
        if !already_placed {
            self.lay_down_post_entry_orders(trade_id).await?;
        }
        Ok(())
    }

    async fn lay_down_post_entry_orders(&mut self, trade_id: &str) -> Result<()> {
        let (symbol, order_side, entry_price, rules) = {
            let trade = self.state.open_trades.get(trade_id).expect("trade exists");
            let rules = self.instrument_rules(&trade.symbol).await?;
            (trade.symbol.clone(), trade.order_side, trade.entry_price.unwrap_or(trade.trigger), rules)
        };

        // a. SL, defaulted from config distance if the signal carried none.
        let sl_price = {
            let trade = self.state.open_trades.get(trade_id).expect("trade exists");
            trade.sl_price.unwrap_or_else(|| default_sl_price(order_side, entry_price, self.config.initial_sl_pct))
        };
        let sl_price = round_price(sl_price, rules.tick_size);

        let stop_body = TradingStopRequest {
            category: self.config.category.clone(),
            symbol: symbol.clone(),
            position_idx: 0,
            tpsl_mode: "Full".to_string(),
            stop_loss: Some(fmt(sl_price)),
            active_price: None,
            trailing_stop: None,
        };
        self.exchange.set_trading_stop(&stop_body).await?;
        if let Some(trade) = self.state.open_trades.get_mut(trade_id) {
            trade.sl_price = Some(sl_price);
        }

        // b. Position size; if zero, the fill hasn't been reflected yet —
        // retry on the next event or tick rather than marking placed.
        let position_size = self
            .exchange
            .positions(&self.config.category, &symbol)
            .await?
            .into_iter()
            .find(|p| p.symbol == symbol)
            .map(|p| p.size_f64())
            .unwrap_or(0.0);

        if position_size == 0.0 {
            warn!(trade_id, "position size is zero after entry fill, deferring post-entry orders");
            return Ok(());
        }

        // c. TP ladder, falling back to config-derived distances when the
        // signal carried no TP prices.
        let tp_prices = {
            let trade = self.state.open_trades.get(trade_id).expect("trade exists");
            if trade.tp_prices.is_empty() {
                fallback_tp_prices(order_side, entry_price, &self.config.fallback_tp_pct)
            } else {
                trade.tp_prices.clone()
            }
        };

        let tp_splits = self.state.open_trades.get(trade_id).expect("trade exists").tp_splits.clone();
        let n = tp_prices.len().min(tp_splits.len());

        let mut tp_order_ids: Vec<Option<String>> = vec![None; n];
        let mut tp1_order_id = None;

        for i in 0..n {
            if tp_splits[i] <= 0.0 {
                continue;
            }
            let qty = round_qty(position_size * tp_splits[i] / 100.0, rules.qty_step, rules.min_qty);
            if qty <= 0.0 {
                continue;
            }
            let price = round_price(tp_prices[i], rules.tick_size);
            let link_id = format!("{trade_id}:TP{}", i + 1);

            let body = PlaceOrderRequest {
                category: self.config.category.clone(),
                symbol: symbol.clone(),
                side: side_str(order_side.opposite()).to_string(),
                order_type: "Limit".to_string(),
                qty: fmt(qty),
                price: Some(fmt(price)),
                trigger_price: None,
                trigger_by: None,
                trigger_direction: None,
                reduce_only: true,
                time_in_force: "GTC".to_string(),
                order_link_id: link_id,
            };
            let order_id = self.exchange.place_order(&body).await?;
            if i == 0 {
                tp1_order_id = Some(order_id.clone());
            }
            tp_order_ids[i] = Some(order_id);
        }

        // d. DCA adds.
        let dca_prices = self.state.open_trades.get(trade_id).expect("trade exists").dca_prices.clone();
        let base_qty = self.state.open_trades.get(trade_id).expect("trade exists").base_qty;
        let last = self.exchange.last_price(&self.config.category, &symbol).await?;
        let dca_mults = &self.config.dca_qty_mults;
        let m = dca_prices.len().min(dca_mults.len());

        for j in 0..m {
            let qty = round_qty(base_qty * dca_mults[j], rules.qty_step, rules.min_qty);
            let price = round_price(dca_prices[j], rules.tick_size);
            let direction = trigger_direction(last, price);
            let link_id = format!("{trade_id}:DCA{}", j + 1);

            let body = PlaceOrderRequest {
                category: self.config.category.clone(),
                symbol: symbol.clone(),
                side: side_str(order_side).to_string(),
                order_type: "Limit".to_string(),
                qty: fmt(qty),
                price: Some(fmt(price)),
                trigger_price: Some(fmt(price)),
                trigger_by: Some("LastPrice".to_string()),
                trigger_direction: Some(direction),
                reduce_only: false,
                time_in_force: "GTC".to_string(),
                order_link_id: link_id,
            };
            self.exchange.place_order(&body).await?;
        }

        // e. Mark placed and persist.
        if let Some(trade) = self.state.open_trades.get_mut(trade_id) {
            trade.tp_prices = tp_prices;
            trade.tp_order_ids = tp_order_ids;
            trade.tp1_order_id = tp1_order_id;
            trade.post_orders_placed = true;
        }
        self.persist().await?;
        info!(trade_id, "post-entry orders placed");
        Ok(())
    }
}

fn default_sl_price(side: OrderSide, entry_price: f64, initial_sl_pct: f64) -> f64 {
    match side {
        OrderSide::Buy => entry_price * (1.0 - initial_sl_pct / 100.0),
        OrderSide::Sell => entry_price * (1.0 + initial_sl_pct / 100.0),
    }
}

fn fallback_tp_prices(side: OrderSide, entry_price: f64, fallback_pct: &[f64]) -> Vec<f64> {
    fallback_pct
        .iter()
        .map(|pct| match side {
            OrderSide::Buy => entry_price * (1.0 + pct / 100.0),
            OrderSide::Sell => entry_price * (1.0 - pct / 100.0),
        })
        .collect()
}

fn side_str(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "Buy",
        OrderSide::Sell => "Sell",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sl_below_entry_for_long() {
        let sl = default_sl_price(OrderSide::Buy, 60000.0, 19.0);
        assert!(sl < 60000.0);
    }

    #[test]
    fn fallback_tp_prices_above_entry_for_long() {
        let tps = fallback_tp_prices(OrderSide::Buy, 60000.0, &[0.85, 1.65, 4.0]);
        assert_eq!(tps.len(), 3);
        assert!(tps.iter().all(|p| *p > 60000.0));
    }

    #[test]
    fn scenario_4_dca_quantities() {
        // base_qty=0.004, DCA_QTY_MULTS=[1.5,2.25] -> 0.006, 0.009
        assert_eq!(round_qty(0.004 * 1.5, 0.001, 0.001), 0.006);
        assert_eq!(round_qty(0.004 * 2.25, 0.001, 0.001), 0.009);
    }
}
