//! Wire types for the Bybit V5 REST surface the engine depends on.

use serde::{Deserialize, Serialize};

/// `{retCode, retMsg, result}` response envelope common to every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BybitEnvelope<T> {
    #[serde(rename = "retCode")]
    pub ret_code: i64,
    #[serde(rename = "retMsg")]
    pub ret_msg: String,
    pub result: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerList {
    pub list: Vec<Ticker>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ticker {
    #[serde(rename = "lastPrice")]
    pub last_price: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentInfoList {
    pub list: Vec<InstrumentInfoEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentInfoEntry {
    #[serde(rename = "priceFilter")]
    pub price_filter: PriceFilter,
    #[serde(rename = "lotSizeFilter")]
    pub lot_size_filter: LotSizeFilter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceFilter {
    #[serde(rename = "tickSize")]
    pub tick_size: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LotSizeFilter {
    #[serde(rename = "qtyStep")]
    pub qty_step: String,
    #[serde(rename = "minOrderQty")]
    pub min_order_qty: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletBalanceList {
    pub list: Vec<WalletAccount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletAccount {
    #[serde(rename = "totalEquity")]
    pub total_equity: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionList {
    pub list: Vec<PositionRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionRecord {
    pub symbol: String,
    pub size: String,
}

impl PositionRecord {
    pub fn size_f64(&self) -> f64 {
        self.size.parse().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderIdResult {
    #[serde(rename = "orderId")]
    pub order_id: String,
}

/// Body for `POST /v5/order/create`. Field presence mirrors what the engine
/// actually issues: conditional entries, reduce-only TPs, conditional DCAs.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderRequest {
    pub category: String,
    pub symbol: String,
    pub side: String,
    #[serde(rename = "orderType")]
    pub order_type: String,
    pub qty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(rename = "triggerPrice", skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<String>,
    #[serde(rename = "triggerBy", skip_serializing_if = "Option::is_none")]
    pub trigger_by: Option<String>,
    #[serde(rename = "triggerDirection", skip_serializing_if = "Option::is_none")]
    pub trigger_direction: Option<u8>,
    #[serde(rename = "reduceOnly")]
    pub reduce_only: bool,
    #[serde(rename = "timeInForce")]
    pub time_in_force: String,
    #[serde(rename = "orderLinkId")]
    pub order_link_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderRequest {
    pub category: String,
    pub symbol: String,
    #[serde(rename = "orderId", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(rename = "orderLinkId", skip_serializing_if = "Option::is_none")]
    pub order_link_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetLeverageRequest {
    pub category: String,
    pub symbol: String,
    #[serde(rename = "buyLeverage")]
    pub buy_leverage: String,
    #[serde(rename = "sellLeverage")]
    pub sell_leverage: String,
}

/// Body for `POST /v5/position/trading-stop`, covering SL/TP/BE and
/// trailing-stop updates in one call (`Full` TPSL mode, the whole-position
/// form the engine always uses).
#[derive(Debug, Clone, Serialize, Default)]
pub struct TradingStopRequest {
    pub category: String,
    pub symbol: String,
    #[serde(rename = "positionIdx")]
    pub position_idx: u8,
    #[serde(rename = "tpslMode")]
    pub tpsl_mode: String,
    #[serde(rename = "stopLoss", skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<String>,
    #[serde(rename = "activePrice", skip_serializing_if = "Option::is_none")]
    pub active_price: Option<String>,
    #[serde(rename = "trailingStop", skip_serializing_if = "Option::is_none")]
    pub trailing_stop: Option<String>,
}
