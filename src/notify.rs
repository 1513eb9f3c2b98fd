//! Alert formatting and Telegram dispatch
//!
//! Renders change events and operational notices into channel-ready HTML
//! and sends them through the Bot API, pacing sequential sends so a busy
//! tick does not trip the channel rate limit. A failed delivery is logged
//! and never blocks the rest of the batch.

use crate::error::{BotError, Result};
use crate::types::{Alert, Direction, HealthNotice};
use async_trait::async_trait;
use chrono::Duration;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// Delivery options for a single message.
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    pub html: bool,
    pub disable_link_preview: bool,
}

impl SendOptions {
    /// Alerts keep the link preview so the chart embeds in the chat.
    pub fn alert() -> Self {
        Self {
            html: true,
            disable_link_preview: false,
        }
    }

    pub fn notice() -> Self {
        Self {
            html: true,
            disable_link_preview: true,
        }
    }
}

/// Notification channel seam. The bot only ever needs fire-and-forget
/// text delivery.
#[async_trait]
pub trait Channel: Send + Sync {
    async fn send(&self, text: &str, opts: SendOptions) -> Result<()>;
}

/// Telegram Bot API channel.
pub struct TelegramChannel {
    http: Client,
    bot_token: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    disable_web_page_preview: bool,
}

impl TelegramChannel {
    pub fn new(bot_token: String, chat_id: String) -> Self {
        Self {
            http: Client::new(),
            bot_token,
            chat_id,
        }
    }
}

#[async_trait]
impl Channel for TelegramChannel {
    async fn send(&self, text: &str, opts: SendOptions) -> Result<()> {
        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            self.bot_token
        );

        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: opts.html.then_some("HTML"),
            disable_web_page_preview: opts.disable_link_preview,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(BotError::delivery)?;

        if !response.status().is_success() {
            return Err(BotError::Delivery(format!(
                "Telegram API returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// High-level notifier: formats and dispatches alerts and notices.
///
/// A disabled notifier (no channel configured, or dry-run mode) logs
/// every message instead of sending it.
#[derive(Clone)]
pub struct Notifier {
    channel: Option<Arc<dyn Channel>>,
    batch_alerts: bool,
    pace: StdDuration,
}

impl Notifier {
    pub fn new(channel: Arc<dyn Channel>, batch_alerts: bool) -> Self {
        Self {
            channel: Some(channel),
            batch_alerts,
            pace: StdDuration::from_millis(300),
        }
    }

    pub fn disabled() -> Self {
        Self {
            channel: None,
            batch_alerts: true,
            pace: StdDuration::ZERO,
        }
    }

    /// Override the inter-message delay (tests use zero).
    pub fn with_pace(mut self, pace: StdDuration) -> Self {
        self.pace = pace;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.channel.is_some()
    }

    /// Send a tick's alerts, batched or one message per alert according
    /// to the configured mode. Per-message failures are logged and do
    /// not abort delivery of the remaining messages.
    pub async fn dispatch_alerts(&self, alerts: &[Alert], lookback_minutes: u32) {
        if alerts.is_empty() {
            return;
        }

        let messages: Vec<String> = if self.batch_alerts {
            vec![batch_message(alerts, lookback_minutes)]
        } else {
            alerts
                .iter()
                .map(|a| format_alert(a, lookback_minutes))
                .collect()
        };

        for (i, text) in messages.iter().enumerate() {
            if i > 0 && !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }
            if let Err(e) = self.deliver(text, SendOptions::alert()).await {
                tracing::error!("Failed to deliver alert: {}", e);
            }
        }
    }

    pub async fn health(&self, notice: &HealthNotice, source_name: &str) {
        let text = format_health(notice, source_name);
        if let Err(e) = self.deliver(&text, SendOptions::notice()).await {
            tracing::error!("Failed to deliver health notice: {}", e);
        }
    }

    pub async fn heartbeat(&self, watched_symbols: usize, signals_today: u32) {
        let text = format!(
            "💓 Bot is alive. Watching {} symbols, {} signals today.",
            watched_symbols, signals_today
        );
        if let Err(e) = self.deliver(&text, SendOptions::notice()).await {
            tracing::error!("Failed to deliver heartbeat: {}", e);
        }
    }

    pub async fn startup(&self, source_name: &str, lookback_minutes: u32, threshold_pct: f64) -> Result<()> {
        let text = format!(
            "✅ Bot started. Watching {} ({}m window, moves ≥ {}%).",
            source_name, lookback_minutes, threshold_pct
        );
        self.deliver(&text, SendOptions::notice()).await
    }

    pub async fn send(&self, text: &str) -> Result<()> {
        self.deliver(text, SendOptions::notice()).await
    }

    async fn deliver(&self, text: &str, opts: SendOptions) -> Result<()> {
        match &self.channel {
            Some(channel) => channel.send(text, opts).await,
            None => {
                tracing::info!("Notifier disabled, message suppressed:\n{}", text);
                Ok(())
            }
        }
    }
}

/// Reference link for a symbol, with the quote suffix stripped to get
/// the coin the chart site expects.
pub fn reference_link(symbol: &str) -> String {
    let mut base = symbol;
    for suffix in ["USDTM", "USDT", "USDM", "USD"] {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped;
            break;
        }
    }
    format!(
        "https://www.coinglass.com/pro/futures/LiquidationHeatMap?coin={}&type=pair",
        base
    )
}

/// Render one alert as channel HTML.
pub fn format_alert(alert: &Alert, lookback_minutes: u32) -> String {
    let (glyph, verb) = match alert.direction {
        Direction::Up => ("🟢⬆️", "Up"),
        Direction::Down => ("🔴⬇️", "Down"),
    };
    format!(
        "{} <b>{}</b>\n\
         {} <b>{:.2}%</b> in {} minutes, now at {}.\n\
         Signal #{} today.\n\
         <a href=\"{}\">CoinGlass liquidation map</a>",
        glyph,
        alert.symbol,
        verb,
        alert.pct_change.abs(),
        lookback_minutes,
        alert.price,
        alert.signal_number_today,
        alert.link,
    )
}

fn batch_message(alerts: &[Alert], lookback_minutes: u32) -> String {
    let body: Vec<String> = alerts
        .iter()
        .map(|a| format_alert(a, lookback_minutes))
        .collect();
    format!(
        "⚡ <b>High volatility detected</b>\n\n{}",
        body.join("\n\n")
    )
}

fn format_health(notice: &HealthNotice, source_name: &str) -> String {
    match notice {
        HealthNotice::SourceDown { since } => format!(
            "🚨 <b>{} unreachable</b>\nNo data since {}.",
            source_name,
            since.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        HealthNotice::SourceRecovered {
            downtime,
            last_success,
        } => {
            let last = last_success
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "✅ <b>{} recovered</b>\nDown for {}; last success at {}.",
                source_name,
                format_duration(*downtime),
                last
            )
        }
    }
}

fn format_duration(d: Duration) -> String {
    let minutes = d.num_minutes();
    if minutes >= 60 {
        format!("{}h {}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}
