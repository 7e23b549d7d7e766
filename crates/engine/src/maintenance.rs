//! Maintenance sweeps (§4.4): expiry cancellation, close detection, and
//! pruning. Run every tick from the supervisor; per-trade errors are
//! isolated so one failing trade doesn't abort the sweep for others.

use tracing::{info, warn};

use tradebot_core::{Error, Result, TradeStatus};
use tradebot_exchange::types::CancelOrderRequest;

use crate::engine::Engine;

impl Engine {
    /// Runs all maintenance sweeps and persists the result. Per-trade
    /// errors within a sweep are isolated (logged, that trade retried next
    /// tick); a failure to persist the snapshot afterwards is propagated
    /// to the caller, which owns the retry-then-exit policy.
    pub async fn maintenance_tick(&mut self) -> Result<()> {
        self.sweep_expired_entries().await;
        self.sweep_closed_positions().await;
        self.prune_terminal_trades();
        self.persist().await
    }

    async fn sweep_expired_entries(&mut self) {
        let now = chrono::Utc::now();
        let cutoff = chrono::Duration::minutes(self.config.entry_expiration_min);

        let candidates: Vec<String> = self
            .state
            .open_trades
            .values()
            .filter(|t| t.status == TradeStatus::Pending && now - t.placed_ts >= cutoff)
            .map(|t| t.trade_id.clone())
            .collect();

        for trade_id in candidates {
            let (symbol, order_id) = {
                let trade = self.state.open_trades.get(&trade_id).expect("collected above");
                (trade.symbol.clone(), trade.entry_order_id.clone())
            };

            let cancel_result = self
                .exchange
                .cancel_order(&CancelOrderRequest {
                    category: self.config.category.clone(),
                    symbol,
                    order_id,
                    order_link_id: Some(trade_id.clone()),
                })
                .await;

            // An `Exchange` error here (e.g. "order not exists") means the
            // entry is already gone at the exchange — still expire it. A
            // transport error means the cancel may not have landed; leave
            // it pending so the next tick retries.
            let should_expire = match cancel_result {
                Ok(()) => true,
                Err(Error::Exchange { ret_code, ref ret_msg }) => {
                    warn!(trade_id, ret_code, ret_msg, "cancel reported exchange error, treating as already gone");
                    true
                }
                Err(ref e) => {
                    warn!(trade_id, error = %e, "cancel failed, will retry next tick");
                    false
                }
            };

            if should_expire {
                if let Some(trade) = self.state.open_trades.get_mut(&trade_id) {
                    trade.status = TradeStatus::Expired;
                    trade.closed_ts = Some(chrono::Utc::now());
                }
                info!(trade_id, "entry expired");
            }
        }
    }

    async fn sweep_closed_positions(&mut self) {
        let candidates: Vec<(String, String)> = self
            .state
            .open_trades
            .values()
            .filter(|t| t.status == TradeStatus::Open)
            .map(|t| (t.trade_id.clone(), t.symbol.clone()))
            .collect();

        for (trade_id, symbol) in candidates {
            let positions = match self.exchange.positions(&self.config.category, &symbol).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(trade_id, error = %e, "failed to query position, will retry next tick");
                    continue;
                }
            };

            let size = positions.into_iter().find(|p| p.symbol == symbol).map(|p| p.size_f64()).unwrap_or(0.0);

            if size == 0.0 {
                if let Some(trade) = self.state.open_trades.get_mut(&trade_id) {
                    trade.status = TradeStatus::Closed;
                    trade.closed_ts = Some(chrono::Utc::now());
                }
                info!(trade_id, "position closed");
            }
        }
    }

    fn prune_terminal_trades(&mut self) {
        let now = chrono::Utc::now();
        let pruned = self.state.prune(now);
        if pruned > 0 {
            info!(pruned, "pruned terminal trades older than 24h");
        }
    }
}
