//! Binance adapter
//!
//! Symbol universe from `exchangeInfo` (trading USDT pairs), tick prices
//! from the string-typed `ticker/price` payload, candles from `klines`.

use super::{http_client, row_f64, MarketDataSource};
use crate::config::SourceConfig;
use crate::error::{BotError, Result};
use crate::types::{Candle, PriceObservation};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

const BASE_URL: &str = "https://api.binance.com";

pub struct BinanceSource {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    symbol_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfo {
    #[serde(default)]
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    status: String,
    #[serde(rename = "quoteAsset")]
    quote_asset: String,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

impl BinanceSource {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: BASE_URL.to_string(),
            api_key: config.api_key.clone(),
            symbol_limit: config.symbol_limit,
        })
    }

    /// Binance spells intervals as "15m"/"1h"/"1d".
    fn interval_token(window_minutes: u32) -> String {
        match window_minutes {
            1 | 3 | 5 | 15 | 30 => format!("{window_minutes}m"),
            60 => "1h".to_string(),
            120 => "2h".to_string(),
            240 => "4h".to_string(),
            1440 => "1d".to_string(),
            other => format!("{other}m"),
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url);
        if let Some(key) = &self.api_key {
            req = req.header("X-MBX-APIKEY", key);
        }
        req
    }
}

#[async_trait]
impl MarketDataSource for BinanceSource {
    fn name(&self) -> &str {
        "binance"
    }

    async fn list_symbols(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/v3/exchangeInfo", self.base_url);
        let resp: ExchangeInfo = self
            .get(&url)
            .send()
            .await
            .map_err(BotError::fetch)?
            .error_for_status()
            .map_err(BotError::fetch)?
            .json()
            .await
            .map_err(BotError::fetch)?;

        let mut symbols: Vec<String> = resp
            .symbols
            .into_iter()
            .filter(|s| s.status == "TRADING" && s.quote_asset == "USDT")
            .map(|s| s.symbol)
            .collect();
        if let Some(limit) = self.symbol_limit {
            symbols.truncate(limit);
        }
        Ok(symbols)
    }

    async fn fetch_price(&self, symbol: &str) -> Result<PriceObservation> {
        let url = format!("{}/api/v3/ticker/price", self.base_url);
        let resp: TickerPrice = self
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
            .price
            .parse::<f64>()
            .map_err(|e| BotError::Fetch(format!("bad ticker price for {symbol}: {e}")))?;

        Ok(PriceObservation {
            symbol: symbol.to_string(),
            price,
            observed_at: Utc::now(),
        })
    }

    async fn fetch_candle(&self, symbol: &str, window_minutes: u32) -> Result<Candle> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let interval = Self::interval_token(window_minutes);
        let resp: Vec<Vec<serde_json::Value>> = self
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(BotError::fetch)?
            .error_for_status()
            .map_err(BotError::fetch)?
            .json()
            .await
            .map_err(BotError::fetch)?;

        // Row layout [openTime, open, high, low, close, volume, ...].
        let row = resp
            .last()
            .ok_or_else(|| BotError::Fetch(format!("no candles for {symbol}")))?;

        Ok(Candle {
            open: row_f64(row, 1)?,
            close: row_f64(row, 4)?,
        })
    }
}
