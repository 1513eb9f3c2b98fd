//! Market data source seam and provider adapters
//!
//! Providers differ in list/ticker/kline endpoints, payload shapes, and
//! interval-token spelling; each adapter keeps those quirks local and
//! surfaces every transport problem as a single `Fetch` error for the
//! health monitor.

pub mod binance;
pub mod kucoin;

use crate::config::{Provider, SourceConfig};
use crate::error::{BotError, Result};
use crate::types::{Candle, PriceObservation};
use async_trait::async_trait;

/// A pollable price/candle provider.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;

    /// The tradable symbol universe, possibly truncated by config.
    async fn list_symbols(&self) -> Result<Vec<String>>;

    /// Latest tick price for one symbol.
    async fn fetch_price(&self, symbol: &str) -> Result<PriceObservation>;

    /// Most recent candle spanning `window_minutes`.
    async fn fetch_candle(&self, symbol: &str, window_minutes: u32) -> Result<Candle>;
}

/// Build the configured provider adapter.
pub fn build(config: &SourceConfig) -> Result<Box<dyn MarketDataSource>> {
    Ok(match config.provider {
        Provider::Kucoin => Box::new(kucoin::KucoinSource::new(config)?),
        Provider::Binance => Box::new(binance::BinanceSource::new(config)?),
    })
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| BotError::Config(format!("failed to build HTTP client: {e}")))
}

/// Kline rows arrive as arrays mixing strings and numbers depending on
/// the venue; accept either for a numeric field.
pub(crate) fn row_f64(row: &[serde_json::Value], idx: usize) -> Result<f64> {
    let value = row
        .get(idx)
        .ok_or_else(|| BotError::Fetch(format!("kline row missing field {idx}")))?;
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| BotError::Fetch(format!("kline field {idx} out of range"))),
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| BotError::Fetch(format!("kline field {idx} not numeric: {e}"))),
        other => Err(BotError::Fetch(format!(
            "kline field {idx} has unexpected type: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_f64_accepts_strings_and_numbers() {
        let row = vec![json!("1545904980"), json!("0.058"), json!(104.5)];
        assert_eq!(row_f64(&row, 1).unwrap(), 0.058);
        assert_eq!(row_f64(&row, 2).unwrap(), 104.5);
    }

    #[test]
    fn row_f64_rejects_missing_and_malformed_fields() {
        let row = vec![json!("x"), json!(null)];
        assert!(matches!(row_f64(&row, 0), Err(BotError::Fetch(_))));
        assert!(matches!(row_f64(&row, 1), Err(BotError::Fetch(_))));
        assert!(matches!(row_f64(&row, 9), Err(BotError::Fetch(_))));
    }
}
