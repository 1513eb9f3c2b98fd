//! KuCoin adapter
//!
//! Public endpoints only: active contracts for the symbol universe,
//! level-1 ticker for tick prices, spot klines for candles. Kline rows
//! come back newest-first with string-typed OHLC fields.

use super::{http_client, row_f64, MarketDataSource};
use crate::config::SourceConfig;
use crate::error::{BotError, Result};
use crate::types::{Candle, PriceObservation};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://api.kucoin.com";

pub struct KucoinSource {
    http: Client,
    base_url: String,
    symbol_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ContractsResponse {
    #[serde(default)]
    data: Vec<Contract>,
}

#[derive(Debug, Deserialize)]
struct Contract {
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KlinesResponse {
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct TickerResponse {
    data: Option<TickerData>,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    price: Option<String>,
}

impl KucoinSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: BASE_URL.to_string(),
            symbol_limit: config.symbol_limit,
        })
    }

    /// KuCoin spells intervals as "15min"/"1hour"/"1day".
    fn interval_token(window_minutes: u32) -> String {
        match window_minutes {
            1 | 3 | 5 | 15 | 30 => format!("{window_minutes}min"),
            60 => "1hour".to_string(),
            120 => "2hour".to_string(),
            240 => "4hour".to_string(),
            1440 => "1day".to_string(),
            other => format!("{other}min"),
        }
    }
}

#[async_trait]
impl MarketDataSource for KucoinSource {
    fn name(&self) -> &str {
        "kucoin"
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/v1/contracts/active", self.base_url);
        let resp: ContractsResponse = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(BotError::fetch)?
            .error_for_status()
            .map_err(BotError::fetch)?
            .json()
            .await
            .map_err(BotError::fetch)?;

        let mut symbols: Vec<String> =
            resp.data.into_iter().filter_map(|c| c.symbol).collect();
        if let Some(limit) = self.symbol_limit {
            symbols.truncate(limit);
        }
        Ok(symbols)
    }

    async fn fetch_price(&self, symbol: &str) -> Result<PriceObservation> {
        let url = format!("{}/api/v1/market/orderbook/level1", self.base_url);
        let resp: TickerResponse = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(BotError::fetch)?
            .error_for_status()
            .map_err(BotError::fetch)?
            .json()
            .await
            .map_err(BotError::fetch)?;

        let price = resp
            .data
            .and_then(|d| d.price)
            .ok_or_else(|| BotError::Fetch(format!("empty ticker for {symbol}")))?
            .parse::<f64>()
            .map_err(|e| BotError::Fetch(format!("bad ticker price for {symbol}: {e}")))?;

        Ok(PriceObservation {
            symbol: symbol.to_string(),
            price,
            observed_at: Utc::now(),
        })
    }

    async fn fetch_candle(&self, symbol: &str, window_minutes: u32) -> Result<Candle> {
        let end = Utc::now().timestamp();
        let start = end - i64::from(window_minutes) * 60;
        let url = format!("{}/api/v1/market/candles", self.base_url);
        let interval = Self::interval_token(window_minutes);
        let (start_s, end_s) = (start.to_string(), end.to_string());

        let resp: KlinesResponse = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("type", interval.as_str()),
                ("startAt", start_s.as_str()),
                ("endAt", end_s.as_str()),
            ])
            .send()
            .await
            .map_err(BotError::fetch)?
            .error_for_status()
            .map_err(BotError::fetch)?
            .json()
            .await
            .map_err(BotError::fetch)?;

        // Newest candle first; row layout [time, open, close, high, low, ...].
        let newest = resp
            .data
            .first()
            .ok_or_else(|| BotError::Fetch(format!("no candles for {symbol}")))?;

        Ok(Candle {
            open: row_f64(newest, 1)?,
            close: row_f64(newest, 2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_tokens_match_kucoin_spelling() {
        assert_eq!(KucoinSource::interval_token(15), "15min");
        assert_eq!(KucoinSource::interval_token(1), "1min");
        assert_eq!(KucoinSource::interval_token(60), "1hour");
        assert_eq!(KucoinSource::interval_token(240), "4hour");
        assert_eq!(KucoinSource::interval_token(1440), "1day");
    }
}
