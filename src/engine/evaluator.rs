//! Window evaluation over per-symbol price baselines

use crate::error::{BotError, Result};
use crate::types::{Candle, ChangeEvent, PriceObservation};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Evaluates price observations against a lookback window and threshold.
///
/// Supports two measurement strategies behind the same type: a rolling
/// per-symbol baseline sampled at tick cadence ([`observe`]), and a
/// stateless fixed-duration candle comparison ([`observe_candle`]).
/// A deployment uses one or the other, never both.
///
/// [`observe`]: WindowEvaluator::observe
/// [`observe_candle`]: WindowEvaluator::observe_candle
pub struct WindowEvaluator {
    lookback: Duration,
    threshold_pct: f64,
    history: HashMap<String, PriceObservation>,
}

impl WindowEvaluator {
    pub fn new(lookback_minutes: u32, threshold_pct: f64) -> Self {
        Self {
            lookback: Duration::minutes(i64::from(lookback_minutes)),
            threshold_pct,
            history: HashMap::new(),
        }
    }

    /// Evaluate a fresh price sample against the stored baseline.
    ///
    /// The first sample for a symbol only seeds the baseline. Samples
    /// older than the stored baseline are ignored, and samples inside the
    /// lookback window leave the baseline untouched. Once the window has
    /// elapsed the baseline is rebased to the new sample whether or not
    /// the threshold was crossed, so windows never overlap.
    pub fn observe(
        &mut self,
        symbol: &str,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<ChangeEvent>> {
        if !price.is_finite() {
            return Err(BotError::Evaluation(format!(
                "non-finite price {price} for {symbol}"
            )));
        }

        let Some(baseline) = self.history.get(symbol) else {
            self.rebase(symbol, price, now);
            return Ok(None);
        };

        // Baselines only move forward in time.
        if now < baseline.observed_at {
            return Ok(None);
        }

        let elapsed = now - baseline.observed_at;
        if elapsed < self.lookback {
            return Ok(None);
        }

        let base_price = baseline.price;
        self.rebase(symbol, price, now);

        // A zero base cannot anchor a ratio; the fresh baseline stands.
        if base_price == 0.0 {
            return Ok(None);
        }

        let pct_change = (price - base_price) / base_price * 100.0;
        if pct_change.abs() < self.threshold_pct {
            return Ok(None);
        }

        Ok(Some(ChangeEvent {
            symbol: symbol.to_string(),
            base_price,
            current_price: price,
            pct_change,
            elapsed,
            observed_at: now,
        }))
    }

    /// Evaluate a fixed-duration candle spanning the lookback window.
    ///
    /// Pure with respect to stored state: the provider already anchored
    /// the comparison at the candle open.
    pub fn observe_candle(
        &self,
        symbol: &str,
        candle: &Candle,
        now: DateTime<Utc>,
    ) -> Option<ChangeEvent> {
        if !candle.open.is_finite() || !candle.close.is_finite() || candle.open == 0.0 {
            return None;
        }

        let pct_change = (candle.close - candle.open) / candle.open * 100.0;
        if pct_change.abs() < self.threshold_pct {
            return None;
        }

        Some(ChangeEvent {
            symbol: symbol.to_string(),
            base_price: candle.open,
            current_price: candle.close,
            pct_change,
            elapsed: self.lookback,
            observed_at: now,
        })
    }

    pub fn baseline(&self, symbol: &str) -> Option<&PriceObservation> {
        self.history.get(symbol)
    }

    pub fn tracked_symbols(&self) -> usize {
        self.history.len()
    }

    fn rebase(&mut self, symbol: &str, price: f64, now: DateTime<Utc>) {
        self.history.insert(
            symbol.to_string(),
            PriceObservation {
                symbol: symbol.to_string(),
                price,
                observed_at: now,
            },
        );
    }
}
