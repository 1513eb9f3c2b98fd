//! Scheduler loop driving the detection engine
//!
//! Owns every piece of mutable engine state (baselines, daily counters,
//! health monitor, heartbeat timer, symbol universe) and runs the
//! fetch → evaluate → dispatch cycle on a fixed poll interval. A failed
//! tick is logged and followed by a shortened backoff sleep; the loop
//! itself never exits.


use crate::config::{DetectionStrategy, EngineConfig};
use crate::engine::{DailySignalCounter, WindowEvaluator};
use crate::error::{BotError, Result};
use crate::health::HealthMonitor;
use crate::notify::{reference_link, Notifier};
use crate::source::MarketDataSource;
use crate::types::{Alert, ChangeEvent};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Summary of one tick, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub symbols_polled: usize,
    pub fetch_failures: usize,
    pub alerts_sent: usize,
}

pub struct Scheduler {
    source: Box<dyn MarketDataSource>,
    notifier: Notifier,
    evaluator: WindowEvaluator,
    counter: DailySignalCounter,
    health: HealthMonitor,
    strategy: DetectionStrategy,
    lookback_minutes: u32,
    poll_interval: Duration,
    error_backoff: Duration,
    heartbeat_interval: chrono::Duration,
    symbols: Vec<String>,
    last_heartbeat: Option<DateTime<Utc>>,
}

impl Scheduler {
    pub fn new(
        engine: &EngineConfig,
        source: Box<dyn MarketDataSource>,
        notifier: Notifier,
    ) -> Self {
        Self {
            source,
            notifier,
            evaluator: WindowEvaluator::new(
                engine.lookback_minutes,
                engine.volatility_threshold_pct,
            ),
            counter: DailySignalCounter::new(Utc::now().date_naive()),
            health: HealthMonitor::new(engine.outage_grace_minutes),
            strategy: engine.strategy,
            lookback_minutes: engine.lookback_minutes,
            poll_interval: Duration::from_secs(engine.poll_interval_secs),
            error_backoff: Duration::from_secs(engine.error_backoff_secs),
            heartbeat_interval: chrono::Duration::seconds(
                engine.heartbeat_interval_secs as i64,
            ),
            symbols: Vec::new(),
            last_heartbeat: None,
        }
    }

    /// Poll forever. Only startup misconfiguration gets to kill the
    /// process; runtime errors are logged and retried after a backoff.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            "Scheduler starting: {} via {:?} strategy, poll every {:?}",
            self.source.name(),
            self.strategy,
            self.poll_interval
        );

        loop {
            let now = Utc::now();
            match self.tick(now).await {
                Ok(report) => {
                    if report.alerts_sent == 0 {
                        tracing::info!(
                            "No significant moves ({} symbols, {} fetch failures)",
                            report.symbols_polled,
                            report.fetch_failures
                        );
                    }
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => {
                    tracing::error!("Tick failed: {}", e);
                    tokio::time::sleep(self.error_backoff).await;
                }
            }
        }
    }

    /// One full pass: roll counters, refresh the universe if needed,
    /// poll every symbol, dispatch alerts, then the heartbeat check.
    /// `now` is injected so tests can drive time.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<TickReport> {
        if self.counter.roll_over(now.date_naive()) {
            tracing::debug!("Daily signal counters reset");
        }

        self.ensure_symbols(now).await?;

        let mut report = TickReport::default();
        let mut events: Vec<ChangeEvent> = Vec::new();

        for symbol in self.symbols.clone() {
            report.symbols_polled += 1;
            match self.sample(&symbol, now).await {
                Ok(event) => {
                    if let Some(notice) = self.health.on_success(now) {
                        self.notifier.health(&notice, self.source.name()).await;
                    }
                    if let Some(event) = event {
                        events.push(event);
                    }
                }
                Err(BotError::Fetch(reason)) => {
                    report.fetch_failures += 1;
                    tracing::warn!("Fetch failed for {}: {}", symbol, reason);
                    if let Some(notice) = self.health.on_failure(now) {
                        self.notifier.health(&notice, self.source.name()).await;
                    }
                }
                Err(e) => {
                    // Evaluation problems skip the symbol for this tick;
                    // its baseline is left as it was.
                    tracing::warn!("Skipping {} this tick: {}", symbol, e);
                }
            }
        }

        let alerts: Vec<Alert> = events
            .into_iter()
            .map(|event| {
                let number = self.counter.increment(&event.symbol);
                Alert {
                    link: reference_link(&event.symbol),
                    direction: event.direction(),
                    symbol: event.symbol,
                    pct_change: event.pct_change,
                    price: event.current_price,
                    signal_number_today: number,
                    timestamp: event.observed_at,
                }
            })
            .collect();

        report.alerts_sent = alerts.len();
        self.notifier
            .dispatch_alerts(&alerts, self.lookback_minutes)
            .await;

        self.maybe_heartbeat(now).await;

        tracing::debug!(
            "Tick complete: {} symbols, {} failures, {} alerts",
            report.symbols_polled,
            report.fetch_failures,
            report.alerts_sent
        );
        Ok(report)
    }

    /// Fetch the symbol universe when we don't have one yet. The list
    /// call counts as a fetch for health purposes like any other.
    async fn ensure_symbols(&mut self, now: DateTime<Utc>) -> Result<()> {
        if !self.symbols.is_empty() {
            return Ok(());
        }

        let outcome = self.source.list_symbols().await.and_then(|symbols| {
            if symbols.is_empty() {
                Err(BotError::Fetch("symbol universe is empty".to_string()))
            } else {
                Ok(symbols)
            }
        });

        match outcome {
            Ok(symbols) => {
                tracing::info!(
                    "Loaded {} symbols from {}",
                    symbols.len(),
                    self.source.name()
                );
                if let Some(notice) = self.health.on_success(now) {
                    self.notifier.health(&notice, self.source.name()).await;
                }
                self.symbols = symbols;
                Ok(())
            }
            Err(e) => {
                if let Some(notice) = self.health.on_failure(now) {
                    self.notifier.health(&notice, self.source.name()).await;
                }
                Err(e)
            }
        }
    }

    async fn sample(&mut self, symbol: &str, now: DateTime<Utc>) -> Result<Option<ChangeEvent>> {
        match self.strategy {
            DetectionStrategy::Candle => {
                let candle = self
                    .source
                    .fetch_candle(symbol, self.lookback_minutes)
                    .await?;
                Ok(self.evaluator.observe_candle(symbol, &candle, now))
            }
            DetectionStrategy::Rolling => {
                let obs = self.source.fetch_price(symbol).await?;
                self.evaluator.observe(symbol, obs.price, obs.observed_at)
            }
        }
    }

    /// The first tick seeds the heartbeat timer (the startup banner
    /// already announced liveness); later ticks emit one notice per
    /// elapsed interval.
    async fn maybe_heartbeat(&mut self, now: DateTime<Utc>) {
        let last = *self.last_heartbeat.get_or_insert(now);
        if now - last >= self.heartbeat_interval {
            self.notifier
                .heartbeat(self.symbols.len(), self.counter.total_today())
                .await;
            self.last_heartbeat = Some(now);
        }
    }
}
