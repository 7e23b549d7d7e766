//! The Trade Engine actor: owns `GlobalState` exclusively and is driven by
//! a single serialized command stream (see the concurrency model).

use std::sync::Arc;

use tradebot_core::{Config, Error, ExecutionEvent, GlobalState, OrderEvent, Result, Signal};
use tradebot_exchange::ExchangeClient;
use tradebot_store::{InstrumentCache, StateStore};
use tracing::{error, info};

/// Work items funneled through the bounded queue by the two producers
/// (timer and WS consumer). The engine drains one to completion before
/// starting the next.
#[derive(Debug)]
pub enum EngineCommand {
    Signal(Signal),
    Execution(ExecutionEvent),
    Order(OrderEvent),
    Tick,
}

pub struct Engine {
    pub(crate) config: Arc<Config>,
    pub(crate) exchange: Arc<ExchangeClient>,
    pub(crate) instruments: Arc<InstrumentCache>,
    pub(crate) store: StateStore,
    pub(crate) state: GlobalState,
    pub(crate) next_seq: u64,
}

impl Engine {
    pub fn new(
        config: Arc<Config>,
        exchange: Arc<ExchangeClient>,
        instruments: Arc<InstrumentCache>,
        store: StateStore,
        state: GlobalState,
    ) -> Self {
        Self { config, exchange, instruments, store, state, next_seq: 0 }
    }

    pub fn state(&self) -> &GlobalState {
        &self.state
    }

    /// Dispatches one queue item. Every other error is logged and
    /// swallowed here — per the error design, nothing but a persistence
    /// failure should abort the actor loop. A `Persistence` error is
    /// propagated to the caller (the supervisor), which owns the
    /// retry-then-exit policy.
    pub async fn handle(&mut self, cmd: EngineCommand) -> Result<()> {
        match cmd {
            EngineCommand::Signal(signal) => match self.admit(signal).await {
                Ok(()) => Ok(()),
                Err(e @ Error::Persistence(_)) => Err(e),
                Err(e) => {
                    error!(error = %e, "admission failed");
                    Ok(())
                }
            },
            EngineCommand::Execution(ev) => match self.on_execution(ev).await {
                Ok(()) => Ok(()),
                Err(e @ Error::Persistence(_)) => Err(e),
                Err(e) => {
                    error!(error = %e, "execution handling failed");
                    Ok(())
                }
            },
            EngineCommand::Order(ev) => {
                self.on_order(ev);
                Ok(())
            }
            EngineCommand::Tick => self.maintenance_tick().await,
        }
    }

    /// Persists the current snapshot. Propagates `Persistence` errors to
    /// the caller rather than swallowing them — the supervisor's top-level
    /// loop is responsible for the retry-then-exit policy.
    pub async fn persist(&self) -> Result<()> {
        self.store.save(&self.state).await
    }

    pub(crate) fn next_trade_id(&mut self, symbol: &str) -> String {
        let id = format!("{}-{}-{}", symbol, chrono::Utc::now().timestamp_millis(), self.next_seq);
        self.next_seq += 1;
        id
    }

    /// Best-effort instrument rules lookup: cache first, exchange on miss.
    pub(crate) async fn instrument_rules(&self, symbol: &str) -> Result<tradebot_core::InstrumentRules> {
        if let Some(rules) = self.instruments.get(symbol) {
            return Ok(rules);
        }
        let rules = self.exchange.instruments_info(&self.config.category, symbol).await?;
        self.instruments.insert(symbol, rules);
        Ok(rules)
    }

    fn on_order(&mut self, ev: OrderEvent) {
        // The order topic carries status transitions the engine does not
        // currently act on (fills are handled via the execution topic);
        // logging keeps the stream observable without growing state.
        info!(symbol = %ev.symbol, link_id = ?ev.order_link_id, status = ?ev.order_status, "order event");
    }
}
