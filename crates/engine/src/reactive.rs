//! Reactive reductions (§4.3): dispatches execution events by order-link-id
//! and promotes SL-to-break-even / activates trailing on TP fills.

use tracing::debug;

use tradebot_core::rounding::round_price;
use tradebot_core::{parse_link_id, ExecutionEvent, LinkKind, Result};
use tradebot_exchange::types::TradingStopRequest;

use crate::admission::fmt;
use crate::engine::Engine;

impl Engine {
    /// The engine's single entry point for the execution-event producer.
    /// Unknown link ids and unknown trades are dropped silently (logged at
    /// debug), per the invariant-violation handling in the error design.
    pub async fn on_execution(&mut self, ev: ExecutionEvent) -> Result<()> {
        let Some(link_id) = ev.order_link_id.as_deref() else {
            debug!("execution event missing order_link_id, dropping");
            return Ok(());
        };
        let Some((trade_id, kind)) = parse_link_id(link_id) else {
            debug!(link_id, "unrecognized order_link_id suffix, dropping");
            return Ok(());
        };
        if !self.state.open_trades.contains_key(&trade_id) {
            debug!(trade_id, "execution event for unknown trade, dropping");
            return Ok(());
        }

        match kind {
            LinkKind::Entry => self.handle_entry_fill(&trade_id, &ev).await,
            LinkKind::TakeProfit(n) => self.handle_tp_fill(&trade_id, n).await,
            LinkKind::Dca(_) => Ok(()),
        }
    }

    async fn handle_tp_fill(&mut self, trade_id: &str, n: usize) -> Result<()> {
        self.maybe_move_sl_to_be(trade_id, n).await?;
        self.maybe_start_trailing(trade_id, n).await?;
        Ok(())
    }

    async fn maybe_move_sl_to_be(&mut self, trade_id: &str, n: usize) -> Result<()> {
        if n != 1 || !self.config.move_sl_to_be_on_tp1 {
            return Ok(());
        }
        let Some(trade) = self.state.open_trades.get(trade_id) else { return Ok(()) };
        if trade.sl_moved_to_be {
            return Ok(());
        }
        let Some(entry_price) = trade.entry_price else { return Ok(()) };
        let symbol = trade.symbol.clone();

        let rules = self.instrument_rules(&symbol).await?;
        let sl_price = round_price(entry_price, rules.tick_size);

        let body = TradingStopRequest {
            category: self.config.category.clone(),
            symbol: symbol.clone(),
            position_idx: 0,
            tpsl_mode: "Full".to_string(),
            stop_loss: Some(fmt(sl_price)),
            active_price: None,
            trailing_stop: None,
        };
        self.exchange.set_trading_stop(&body).await?;

        if let Some(trade) = self.state.open_trades.get_mut(trade_id) {
            trade.sl_price = Some(sl_price);
            trade.sl_moved_to_be = true;
        }
        self.persist().await
    }

    async fn maybe_start_trailing(&mut self, trade_id: &str, n: usize) -> Result<()> {
        if n != self.config.trail_after_tp_index || !self.config.trail_activate_on_tp {
            return Ok(());
        }
        let Some(trade) = self.state.open_trades.get(trade_id) else { return Ok(()) };
        if trade.trailing_started {
            return Ok(());
        }
        let symbol = trade.symbol.clone();
        let anchor_tp = trade.tp_prices.get(n - 1).copied();
        let sl_already_be = trade.sl_moved_to_be;
        let entry_price = trade.entry_price;

        let rules = self.instrument_rules(&symbol).await?;
        let anchor = match anchor_tp {
            Some(p) => round_price(p, rules.tick_size),
            None => round_price(self.exchange.last_price(&self.config.category, &symbol).await?, rules.tick_size),
        };
        let dist = round_price(anchor * self.config.trail_distance_pct / 100.0, rules.tick_size);

        let body = TradingStopRequest {
            category: self.config.category.clone(),
            symbol: symbol.clone(),
            position_idx: 0,
            tpsl_mode: "Full".to_string(),
            stop_loss: if sl_already_be { entry_price.map(|p| fmt(round_price(p, rules.tick_size))) } else { None },
            active_price: Some(fmt(anchor)),
            trailing_stop: Some(fmt(dist)),
        };
        self.exchange.set_trading_stop(&body).await?;

        if let Some(trade) = self.state.open_trades.get_mut(trade_id) {
            trade.trailing_started = true;
        }
        self.persist().await
    }
}

#[cfg(test)]
mod tests {
    use tradebot_core::rounding::round_price;

    #[test]
    fn scenario_5_trail_distance() {
        // anchor TP3 = 63000, TRAIL_DISTANCE_PCT=2.0 -> dist=1260.0
        let anchor = round_price(63000.0, 0.1);
        let dist = round_price(anchor * 2.0 / 100.0, 0.1);
        assert_eq!(dist, 1260.0);
    }
}
