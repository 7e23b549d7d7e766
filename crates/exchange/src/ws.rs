//! Private WebSocket consumer: authenticates, subscribes to `execution` and
//! `order`, and reconnects indefinitely on drop.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tradebot_core::{ExecutionEvent, OrderEvent};
use tracing::{debug, info, warn};

use crate::signing::sign_ws_auth;

const PING_INTERVAL: Duration = Duration::from_secs(20);
const PING_TIMEOUT: Duration = Duration::from_secs(10);
const RECONNECT_FLOOR: Duration = Duration::from_secs(2);

/// A decoded message from the private feed, handed to the supervisor for
/// enqueueing onto the engine's single-consumer command queue.
#[derive(Debug, Clone)]
pub enum WsEvent {
    Execution(ExecutionEvent),
    Order(OrderEvent),
}

/// Why a session ended: either the consumer shut down (terminal) or a
/// connection-level problem that should trigger a reconnect.
enum SessionEnd {
    ConsumerClosed,
    Connection(String),
}

/// Runs the private WS feed forever, sending decoded events to `tx`.
/// Returns only once `tx`'s receiver has been dropped (the consumer shut
/// down); every connection-level error instead triggers a reconnect.
pub async fn run_private_ws(ws_url: String, api_key: String, api_secret: String, tx: mpsc::Sender<WsEvent>) {
    loop {
        match run_session(&ws_url, &api_key, &api_secret, &tx).await {
            SessionEnd::ConsumerClosed => {
                info!("private ws consumer shut down");
                return;
            }
            SessionEnd::Connection(reason) => {
                warn!(reason, "private ws session ended, reconnecting");
            }
        }
        sleep(RECONNECT_FLOOR).await;
    }
}

async fn run_session(ws_url: &str, api_key: &str, api_secret: &str, tx: &mpsc::Sender<WsEvent>) -> SessionEnd {
    let (mut stream, _) = match connect_async(ws_url).await {
        Ok(pair) => pair,
        Err(e) => return SessionEnd::Connection(e.to_string()),
    };

    let expires_ms = chrono::Utc::now().timestamp_millis() + 10_000;
    let signature = sign_ws_auth(api_secret, expires_ms);

    let auth = json!({ "op": "auth", "args": [api_key, expires_ms, signature] });
    if let Err(e) = stream.send(Message::Text(auth.to_string())).await {
        return SessionEnd::Connection(e.to_string());
    }

    let subscribe = json!({ "op": "subscribe", "args": ["execution", "order"] });
    if let Err(e) = stream.send(Message::Text(subscribe.to_string())).await {
        return SessionEnd::Connection(e.to_string());
    }

    let mut ping_tick = interval(PING_INTERVAL);
    ping_tick.tick().await; // first tick fires immediately; consume it

    loop {
        tokio::select! {
            _ = ping_tick.tick() => {
                let ping = json!({ "op": "ping" });
                let send = stream.send(Message::Text(ping.to_string()));
                if timeout(PING_TIMEOUT, send).await.is_err() {
                    return SessionEnd::Connection("ping timed out".to_string());
                }
            }
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match dispatch(&text, tx).await {
                            Ok(true) => {}
                            Ok(false) => return SessionEnd::ConsumerClosed,
                            Err(e) => debug!(error = %e, "dropping malformed ws message"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        return SessionEnd::Connection("connection closed".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Connection(e.to_string()),
                }
            }
        }
    }
}

/// Decodes one WS text frame and forwards any `execution`/`order` items.
/// Returns `Ok(false)` if the consumer-side channel is closed (caller
/// should stop the session without reconnecting), `Ok(true)` to continue,
/// or `Err` for a malformed frame (logged and otherwise ignored).
async fn dispatch(text: &str, tx: &mpsc::Sender<WsEvent>) -> Result<bool, String> {
    let msg: serde_json::Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
    let topic = msg.get("topic").and_then(|t| t.as_str()).unwrap_or("");
    let Some(data) = msg.get("data") else { return Ok(true) };

    let items: Vec<serde_json::Value> = match data {
        serde_json::Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };

    if topic.starts_with("execution") {
        for item in items {
            match serde_json::from_value::<ExecutionEvent>(item) {
                Ok(ev) => {
                    if tx.send(WsEvent::Execution(ev)).await.is_err() {
                        return Ok(false);
                    }
                }
                Err(e) => debug!(error = %e, "invalid execution event"),
            }
        }
    } else if topic.starts_with("order") {
        for item in items {
            match serde_json::from_value::<OrderEvent>(item) {
                Ok(ev) => {
                    if tx.send(WsEvent::Order(ev)).await.is_err() {
                        return Ok(false);
                    }
                }
                Err(e) => debug!(error = %e, "invalid order event"),
            }
        }
    }

    Ok(true)
}
