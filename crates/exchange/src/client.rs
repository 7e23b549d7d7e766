//! Signed REST client for Bybit V5, with uniform retry/error classification.

use std::time::Duration;

use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tradebot_core::{Error, Result};
use tracing::{debug, instrument, warn};

use crate::signing::sign;
use crate::types::*;

const MAINNET_BASE: &str = "https://api.bybit.com";
const TESTNET_BASE: &str = "https://api-testnet.bybit.com";
pub const MAINNET_WS: &str = "wss://stream.bybit.com/v5/private";
pub const TESTNET_WS: &str = "wss://stream-testnet.bybit.com/v5/private";

const MAX_ATTEMPTS: u32 = 5;

fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_secs_f64((0.75 * attempt as f64).min(6.0))
}

/// Signed REST + authenticated-WS transport for the exchange.
///
/// Every mutating call is idempotent with respect to internal retries: the
/// same `order_link_id` is resubmitted verbatim on a transient failure, so
/// the exchange's own idempotency guard (on the order-link-id) absorbs the
/// duplicate.
#[derive(Clone)]
pub struct ExchangeClient {
    api_key: String,
    api_secret: String,
    recv_window: String,
    base: String,
    pub ws_url: String,
    http: HttpClient,
    dry_run: bool,
}

impl ExchangeClient {
    pub fn new(api_key: String, api_secret: String, recv_window: String, testnet: bool, dry_run: bool) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client builds");

        Self {
            api_key,
            api_secret,
            recv_window,
            base: if testnet { TESTNET_BASE } else { MAINNET_BASE }.to_string(),
            ws_url: if testnet { TESTNET_WS } else { MAINNET_WS }.to_string(),
            http,
            dry_run,
        }
    }

    fn timestamp_ms() -> String {
        chrono::Utc::now().timestamp_millis().to_string()
    }

    /// Performs a signed GET, retrying transient classes per the engine's
    /// backoff policy.
    async fn get_signed<T: DeserializeOwned>(&self, path: &str, query: &str) -> Result<T> {
        let payload = query.to_string();
        self.request_signed(Method::GET, path, &payload, None).await
    }

    /// Performs a signed POST with a compact JSON body (the exact byte
    /// sequence sent is what gets signed).
    async fn post_signed<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        let payload = serde_json::to_string(body)?;
        self.request_signed(Method::POST, path, &payload, Some(payload.clone())).await
    }

    #[instrument(skip(self, payload, body))]
    async fn request_signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: &str,
        body: Option<String>,
    ) -> Result<T> {
        let full_url = if method == Method::GET && !payload.is_empty() {
            format!("{}{}?{}", self.base, path, payload)
        } else {
            format!("{}{}", self.base, path)
        };

        for attempt in 1..=MAX_ATTEMPTS {
            let timestamp = Self::timestamp_ms();
            let signature = sign(&self.api_secret, &timestamp, &self.api_key, &self.recv_window, payload);

            let mut req = self
                .http
                .request(method.clone(), &full_url)
                .header("X-BAPI-API-KEY", &self.api_key)
                .header("X-BAPI-SIGN", signature)
                .header("X-BAPI-SIGN-TYPE", "2")
                .header("X-BAPI-TIMESTAMP", &timestamp)
                .header("X-BAPI-RECV-WINDOW", &self.recv_window)
                .header("Content-Type", "application/json");

            if method != Method::GET {
                req = req.body(body.clone().unwrap_or_default());
            }

            let response = req.send().await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    if attempt == MAX_ATTEMPTS {
                        return Err(Error::Transport(e.to_string()));
                    }
                    warn!(attempt, error = %e, "transport error, retrying");
                    sleep(retry_backoff(attempt)).await;
                    continue;
                }
            };

            let status = response.status();
            if matches!(
                status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ) {
                if attempt == MAX_ATTEMPTS {
                    return Err(Error::Transport(format!("exhausted retries, last status {status}")));
                }
                warn!(attempt, %status, "transient status, retrying");
                sleep(retry_backoff(attempt)).await;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(Error::Auth(format!("unauthorized: {status}")));
            }

            let envelope: BybitEnvelope<T> = response.json().await.map_err(|e| Error::InvalidEvent(e.to_string()))?;
            if envelope.ret_code != 0 {
                return Err(Error::Exchange { ret_code: envelope.ret_code, ret_msg: envelope.ret_msg });
            }
            debug!(attempt, "request succeeded");
            return Ok(envelope.result);
        }

        unreachable!("loop always returns by the final attempt")
    }

    #[instrument(skip(self))]
    pub async fn last_price(&self, category: &str, symbol: &str) -> Result<f64> {
        let query = format!("category={category}&symbol={symbol}");
        let list: TickerList = self.get_signed("/v5/market/tickers", &query).await?;
        let ticker = list.list.first().ok_or_else(|| Error::InvalidEvent("no ticker data".into()))?;
        ticker.last_price.parse().map_err(|_| Error::InvalidEvent("non-numeric lastPrice".into()))
    }

    #[instrument(skip(self))]
    pub async fn instruments_info(&self, category: &str, symbol: &str) -> Result<tradebot_core::InstrumentRules> {
        let query = format!("category={category}&symbol={symbol}");
        let list: InstrumentInfoList = self.get_signed("/v5/market/instruments-info", &query).await?;
        let entry = list.list.first().ok_or_else(|| Error::InvalidEvent("no instrument info".into()))?;
        Ok(tradebot_core::InstrumentRules {
            tick_size: entry.price_filter.tick_size.parse().unwrap_or(0.0),
            qty_step: entry.lot_size_filter.qty_step.parse().unwrap_or(0.0),
            min_qty: entry.lot_size_filter.min_order_qty.parse().unwrap_or(0.0),
        })
    }

    #[instrument(skip(self))]
    pub async fn wallet_equity(&self, account_type: &str) -> Result<f64> {
        let query = format!("accountType={account_type}");
        let list: WalletBalanceList = self.get_signed("/v5/account/wallet-balance", &query).await?;
        let account = list.list.first().ok_or_else(|| Error::InvalidEvent("no wallet data".into()))?;
        account.total_equity.parse().map_err(|_| Error::InvalidEvent("non-numeric totalEquity".into()))
    }

    #[instrument(skip(self))]
    pub async fn set_leverage(&self, category: &str, symbol: &str, leverage: u32) -> Result<()> {
        if self.dry_run {
            debug!(symbol, leverage, "dry-run: skipping set_leverage");
            return Ok(());
        }
        let body = SetLeverageRequest {
            category: category.to_string(),
            symbol: symbol.to_string(),
            buy_leverage: leverage.to_string(),
            sell_leverage: leverage.to_string(),
        };
        let _: serde_json::Value = self.post_signed("/v5/position/set-leverage", &body).await?;
        Ok(())
    }

    #[instrument(skip(self, body))]
    pub async fn place_order(&self, body: &PlaceOrderRequest) -> Result<String> {
        if self.dry_run {
            debug!(order_link_id = %body.order_link_id, "dry-run: synthesizing order id");
            return Ok(format!("dry-run-{}", body.order_link_id));
        }
        let result: OrderIdResult = self.post_signed("/v5/order/create", body).await?;
        Ok(result.order_id)
    }

    #[instrument(skip(self, body))]
    pub async fn cancel_order(&self, body: &CancelOrderRequest) -> Result<()> {
        if self.dry_run {
            return Ok(());
        }
        let _: serde_json::Value = self.post_signed("/v5/order/cancel", body).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn positions(&self, category: &str, symbol: &str) -> Result<Vec<PositionRecord>> {
        let query = format!("category={category}&symbol={symbol}");
        let list: PositionList = self.get_signed("/v5/position/list", &query).await?;
        Ok(list.list)
    }

    #[instrument(skip(self, body))]
    pub async fn set_trading_stop(&self, body: &TradingStopRequest) -> Result<()> {
        if self.dry_run {
            debug!(symbol = %body.symbol, "dry-run: skipping set_trading_stop");
            return Ok(());
        }
        let _: serde_json::Value = self.post_signed("/v5/position/trading-stop", body).await?;
        Ok(())
    }
}
