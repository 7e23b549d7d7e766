//! Durable, crash-safe persistence of `GlobalState` (the State Store
//! component): a single JSON snapshot written via write-temp-then-rename.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, instrument};
use tradebot_core::{Error, GlobalState, Result};

/// Owns the on-disk snapshot path. Single-writer by convention: only the
/// Trade Engine actor calls `save`.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads the snapshot from disk, or an empty `GlobalState` if the file
    /// doesn't exist or fails to parse. A corrupt snapshot is treated as
    /// "start fresh" rather than a fatal error, matching the original's
    /// best-effort load.
    #[instrument(skip(self))]
    pub async fn load(&self) -> GlobalState {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(state) => state,
                Err(e) => {
                    debug!(error = %e, path = %self.path.display(), "snapshot failed to parse, starting fresh");
                    GlobalState::default()
                }
            },
            Err(_) => GlobalState::default(),
        }
    }

    /// Atomically replaces the snapshot: write to `{path}.tmp`, then
    /// rename over `path`. A write failure here is a `Persistence` error;
    /// per the error-handling design the supervisor retries once then
    /// exits to avoid diverging in-memory/on-disk state.
    #[instrument(skip(self, state))]
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        let tmp_path = tmp_path(&self.path);
        let body = serde_json::to_string_pretty(state).map_err(|e| Error::Persistence(e.to_string()))?;

        fs::write(&tmp_path, body).await.map_err(|e| Error::Persistence(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).await.map_err(|e| Error::Persistence(e.to_string()))?;
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradebot_core::{OrderSide, Trade, TradeStatus};

    fn sample_trade() -> Trade {
        Trade {
            trade_id: "t1".into(),
            symbol: "BTCUSDT".into(),
            order_side: OrderSide::Buy,
            trigger: 60000.0,
            entry_price: None,
            base_qty: 0.004,
            sl_price: Some(58000.0),
            tp_prices: vec![61000.0],
            tp_splits: vec![100.0],
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

    #[tokio::test]
    async fn missing_file_loads_default() {
        let dir = std::env::temp_dir().join(format!("tradebot-test-missing-{}", std::process::id()));
        let store = StateStore::new(dir.join("state.json"));
        let state = store.load().await;
        assert!(state.open_trades.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = std::env::temp_dir().join(format!("tradebot-test-roundtrip-{}", std::process::id()));
        fs::create_dir_all(&dir).await.unwrap();
        let store = StateStore::new(dir.join("state.json"));

        let mut state = GlobalState::default();
        state.open_trades.insert("t1".into(), sample_trade());
        state.last_signal_id = Some("sig-1".into());

        store.save(&state).await.unwrap();
        let loaded = store.load().await;

        assert_eq!(loaded.last_signal_id, Some("sig-1".into()));
        assert_eq!(loaded.open_trades.len(), 1);
        assert_eq!(loaded.open_trades["t1"].trigger, 60000.0);

        let _ = fs::remove_dir_all(&dir).await;
    }
}
