//! Supervisor binary: wires the exchange client, instrument cache, and
//! state store into a Trade Engine actor, then drives it with a timer
//! producer and a private-WS execution-event consumer until told to stop.

use std::process::ExitCode;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tradebot_core::Config;
use tradebot_engine::{Engine, EngineCommand, NullSignalSource, SignalSource};
use tradebot_exchange::{run_private_ws, ExchangeClient, WsEvent};
use tradebot_store::{InstrumentCache, StateStore};

/// Bound on the engine's command queue. Both producers block on a full
/// queue rather than drop, so this is slack, not a hard cap on throughput.
const QUEUE_BOUND: usize = 256;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FATAL: configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_lowercase())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(dry_run = config.dry_run, testnet = config.bybit_testnet, "starting trade engine");

    let exchange = Arc::new(ExchangeClient::new(
        config.bybit_api_key.clone(),
        config.bybit_api_secret.clone(),
        config.recv_window.clone(),
        config.bybit_testnet,
        config.dry_run,
    ));

    if let Err(e) = exchange.wallet_equity(&config.account_type).await {
        eprintln!("FATAL: failed to reach the exchange at startup: {e}");
        return ExitCode::FAILURE;
    }

    let instruments = Arc::new(InstrumentCache::default());
    let store = StateStore::new(config.state_file.clone());
    let state = store.load().await;
    info!(open_trades = state.open_trades.len(), "loaded state snapshot");

    let config = Arc::new(config);
    let mut engine = Engine::new(config.clone(), exchange.clone(), instruments, store, state);

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<EngineCommand>(QUEUE_BOUND);

    let ws_task = tokio::spawn(forward_ws_events(exchange.ws_url.clone(), config.clone(), cmd_tx.clone()));
    let timer_task = tokio::spawn(run_timer(config.clone(), cmd_tx.clone()));
    drop(cmd_tx);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let exit_code = loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutdown signal received, draining in-flight commands");
                cmd_rx.close();
                let mut drain_failed = false;
                while let Some(cmd) = cmd_rx.recv().await {
                    if let Err(e) = engine.handle(cmd).await {
                        error!(error = %e, "persistence failed while draining, retrying once");
                        if let Err(e) = engine.persist().await {
                            error!(error = %e, "persistence still failing after retry, exiting non-zero");
                            drain_failed = true;
                            break;
                        }
                    }
                }
                break if drain_failed { ExitCode::FAILURE } else { ExitCode::SUCCESS };
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => {
                        if let Err(e) = engine.handle(cmd).await {
                            error!(error = %e, "persistence failed, retrying once before exiting");
                            if let Err(e) = engine.persist().await {
                                error!(error = %e, "persistence still failing after retry, exiting non-zero");
                                break ExitCode::FAILURE;
                            }
                        }
                    }
                    None => {
                        warn!("both producers stopped, shutting down");
                        break ExitCode::SUCCESS;
                    }
                }
            }
        }
    };

    ws_task.abort();
    timer_task.abort();
    exit_code
}

/// Bridges the private WS feed into the engine's command queue, translating
/// `WsEvent`s one-for-one. Reconnection is handled inside `run_private_ws`;
/// this task only ends when the engine's queue is closed.
async fn forward_ws_events(ws_url: String, config: Arc<Config>, cmd_tx: mpsc::Sender<EngineCommand>) {
    let (ws_tx, mut ws_rx) = mpsc::channel::<WsEvent>(QUEUE_BOUND);
    tokio::spawn(run_private_ws(ws_url, config.bybit_api_key.clone(), config.bybit_api_secret.clone(), ws_tx));

    while let Some(event) = ws_rx.recv().await {
        let cmd = match event {
            WsEvent::Execution(ev) => EngineCommand::Execution(ev),
            WsEvent::Order(ev) => EngineCommand::Order(ev),
        };
        if cmd_tx.send(cmd).await.is_err() {
            return;
        }
    }
}

/// Ticks the engine on a `poll_seconds` cadence (jittered to avoid thundering
/// against the exchange in lockstep with other instances), polling the
/// configured signal source for anything newly accepted beforehand.
async fn run_timer(config: Arc<Config>, cmd_tx: mpsc::Sender<EngineCommand>) {
    let mut signal_source: Box<dyn SignalSource> = Box::new(NullSignalSource);

    loop {
        let jitter = if config.poll_jitter_max > 0 {
            rand::thread_rng().gen_range(0..=config.poll_jitter_max)
        } else {
            0
        };
        sleep(Duration::from_secs(config.poll_seconds + jitter)).await;

        for signal in signal_source.poll().await {
            if cmd_tx.send(EngineCommand::Signal(signal)).await.is_err() {
                return;
            }
        }

        if cmd_tx.send(EngineCommand::Tick).await.is_err() {
            return;
        }
    }
}
