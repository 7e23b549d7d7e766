//! Runtime configuration, loaded once at startup from the environment.
//!
//! Every field here corresponds to a key documented in the external
//! interfaces table; nothing here is re-read after construction (no runtime
//! config mutation).

use std::env;

use crate::errors::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Bybit credentials / endpoint selection
    pub bybit_api_key: String,
    pub bybit_api_secret: String,
    pub bybit_testnet: bool,
    pub account_type: String,
    pub recv_window: String,

    // Trading
    pub category: String,
    pub quote: String,
    pub leverage: u32,
    pub risk_pct: f64,

    // Limits
    pub max_concurrent_trades: u32,
    pub max_trades_per_day: u32,

    // Entry rules
    pub entry_expiration_min: i64,
    pub entry_too_far_pct: f64,
    pub entry_trigger_buffer_pct: f64,
    pub entry_limit_price_offset_pct: f64,
    pub entry_expiration_price_pct: f64,

    // TP/SL
    pub move_sl_to_be_on_tp1: bool,
    pub initial_sl_pct: f64,
    pub tp_splits: Vec<f64>,
    pub fallback_tp_pct: Vec<f64>,

    // Trailing
    pub trail_after_tp_index: usize,
    pub trail_distance_pct: f64,
    pub trail_activate_on_tp: bool,

    // DCA
    pub dca_qty_mults: Vec<f64>,

    // Timing
    pub poll_seconds: u64,
    pub poll_jitter_max: u64,

    // Misc
    pub dry_run: bool,
    pub state_file: String,
    pub log_level: String,
}

fn get(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string()).trim().to_string()
}

fn get_bool(name: &str, default: &str) -> bool {
    matches!(
        get(name, default).to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn get_int<T: std::str::FromStr>(name: &str, default: &str) -> Result<T> {
    get(name, default)
        .parse::<T>()
        .map_err(|_| Error::Config(format!("{name} must be an integer")))
}

fn get_float(name: &str, default: &str) -> Result<f64> {
    get(name, default)
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{name} must be a number")))
}

fn get_float_list(name: &str, default: &str) -> Result<Vec<f64>> {
    get(name, default)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(|_| Error::Config(format!("{name} has a non-numeric entry"))))
        .collect()
}

/// Normalizes a list of TP split percentages so they sum to 100, mirroring
/// the original's safety normalization.
fn normalize_splits(splits: Vec<f64>) -> Vec<f64> {
    let sum: f64 = splits.iter().sum();
    if (sum - 100.0).abs() > 0.001 {
        let denom = if sum == 0.0 { 100.0 } else { sum };
        splits.into_iter().map(|x| x * 100.0 / denom).collect()
    } else {
        splits
    }
}

impl Config {
    /// Loads `.env` if present, then builds a `Config` from the process
    /// environment. Any missing credential or malformed numeric field is a
    /// fatal configuration error (exit code 1 at startup, per the external
    /// interfaces contract).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let bybit_api_key = get("BYBIT_API_KEY", "");
        let bybit_api_secret = get("BYBIT_API_SECRET", "");
        if bybit_api_key.is_empty() || bybit_api_secret.is_empty() {
            return Err(Error::Config("BYBIT_API_KEY and BYBIT_API_SECRET are required".into()));
        }

        Ok(Self {
            bybit_api_key,
            bybit_api_secret,
            bybit_testnet: get_bool("BYBIT_TESTNET", "false"),
            account_type: get("ACCOUNT_TYPE", "UNIFIED"),
            recv_window: get("RECV_WINDOW", "5000"),

            category: get("CATEGORY", "linear"),
            quote: get("QUOTE", "USDT").to_uppercase(),
            leverage: get_int("LEVERAGE", "5")?,
            risk_pct: get_float("RISK_PCT", "5")?,

            max_concurrent_trades: get_int("MAX_CONCURRENT_TRADES", "3")?,
            max_trades_per_day: get_int("MAX_TRADES_PER_DAY", "20")?,

            entry_expiration_min: get_int("ENTRY_EXPIRATION_MIN", "180")?,
            entry_too_far_pct: get_float("ENTRY_TOO_FAR_PCT", "0.5")?,
            entry_trigger_buffer_pct: get_float("ENTRY_TRIGGER_BUFFER_PCT", "0.0")?,
            entry_limit_price_offset_pct: get_float("ENTRY_LIMIT_PRICE_OFFSET_PCT", "0.0")?,
            entry_expiration_price_pct: get_float("ENTRY_EXPIRATION_PRICE_PCT", "0.6")?,

            move_sl_to_be_on_tp1: get_bool("MOVE_SL_TO_BE_ON_TP1", "true"),
            initial_sl_pct: get_float("INITIAL_SL_PCT", "19.0")?,
            tp_splits: normalize_splits(get_float_list("TP_SPLITS", "30,30,30,10")?),
            fallback_tp_pct: get_float_list("FALLBACK_TP_PCT", "0.85,1.65,4.0")?,

            trail_after_tp_index: get_int("TRAIL_AFTER_TP_INDEX", "3")?,
            trail_distance_pct: get_float("TRAIL_DISTANCE_PCT", "2.0")?,
            trail_activate_on_tp: get_bool("TRAIL_ACTIVATE_ON_TP", "true"),

            dca_qty_mults: get_float_list("DCA_QTY_MULTS", "1.5,2.25,3.0")?,

            poll_seconds: get_int("POLL_SECONDS", "15")?,
            poll_jitter_max: get_int("POLL_JITTER_MAX", "5")?,

            dry_run: get_bool("DRY_RUN", "true"),
            state_file: get("STATE_FILE", "state.json"),
            log_level: get("LOG_LEVEL", "INFO").to_uppercase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_splits_that_already_sum_to_100() {
        assert_eq!(normalize_splits(vec![30.0, 30.0, 30.0, 10.0]), vec![30.0, 30.0, 30.0, 10.0]);
    }

    #[test]
    fn normalizes_splits_that_overshoot() {
        let out = normalize_splits(vec![50.0, 50.0, 50.0]);
        let sum: f64 = out.iter().sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }
}
