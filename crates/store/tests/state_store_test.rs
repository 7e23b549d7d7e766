use tradebot_core::{GlobalState, OrderSide, Trade, TradeStatus};
use tradebot_store::StateStore;

fn sample_trade(id: &str) -> Trade {
    Trade {
        trade_id: id.into(),
        symbol: "ETHUSDT".into(),
        order_side: OrderSide::Sell,
        trigger: 3000.0,
        entry_price: Some(2995.0),
        base_qty: 0.5,
        sl_price: Some(3100.0),
        tp_prices: vec![2900.0, 2800.0],
        tp_splits: vec![50.0, 50.0],
        dca_prices: vec![3050.0],
        entry_order_id: Some("eo-9".into()),
        tp_order_ids: vec![Some("tp-1".into()), None],
        tp1_order_id: Some("tp-1".into()),
        status: TradeStatus::Open,
        post_orders_placed: true,
        sl_moved_to_be: false,
        trailing_started: false,
        placed_ts: chrono::Utc::now(),
        filled_ts: Some(chrono::Utc::now()),
        closed_ts: None,
    }
}

#[tokio::test]
async fn snapshot_survives_a_save_load_cycle_across_store_instances() {
    let dir = std::env::temp_dir().join(format!("tradebot-store-it-{}", std::process::id()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let path = dir.join("state.json");

    let mut state = GlobalState::default();
    state.open_trades.insert("t1".into(), sample_trade("t1"));
    let now = chrono::Utc::now();
    state.increment_today(now);
    state.increment_today(now);
    state.increment_today(now);
    state.last_signal_id = Some("sig-42".into());

    StateStore::new(path.clone()).save(&state).await.unwrap();

    // A fresh StateStore instance (as the supervisor builds on restart)
    // must see exactly what was written.
    let reloaded = StateStore::new(path.clone()).load().await;
    assert_eq!(reloaded.today_count(now), 3);
    assert_eq!(reloaded.last_signal_id, Some("sig-42".into()));
    let trade = &reloaded.open_trades["t1"];
    assert_eq!(trade.symbol, "ETHUSDT");
    assert_eq!(trade.status, TradeStatus::Open);
    assert_eq!(trade.tp_prices, vec![2900.0, 2800.0]);

    assert!(!path.with_extension("json.tmp").exists(), "temp file must not survive a successful save");

    let _ = tokio::fs::remove_dir_all(&dir).await;
}
