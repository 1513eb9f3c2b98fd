//! Core data types shared across the bot

use chrono::{DateTime, Duration, Utc};

/// A single price sample for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    pub symbol: String,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

/// Fixed-interval open/close pair, as returned by kline endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub close: f64,
}

/// Direction of a qualifying move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A qualifying price move produced by the window evaluator.
///
/// Only emitted for genuine re-evaluations (never the seeding sample)
/// once the lookback window has elapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub symbol: String,
    pub base_price: f64,
    pub current_price: f64,
    /// Signed percentage change, `(current - base) / base * 100`.
    pub pct_change: f64,
    pub elapsed: Duration,
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn direction(&self) -> Direction {
        if self.pct_change >= 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

/// The unit handed to the dispatcher: a change event stamped with its
/// daily signal number and reference link.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub symbol: String,
    pub direction: Direction,
    /// Signed percentage change carried over from the event.
    pub pct_change: f64,
    /// Current price at the time of the event.
    pub price: f64,
    /// Post-increment daily count for this symbol ("signal #N today").
    pub signal_number_today: u32,
    pub link: String,
    pub timestamp: DateTime<Utc>,
}

/// Operational notice emitted by the health monitor.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthNotice {
    /// The data source has been failing for longer than the grace period.
    SourceDown { since: DateTime<Utc> },
    /// The data source answered again after a notified outage.
    SourceRecovered {
        downtime: Duration,
        last_success: Option<DateTime<Utc>>,
    },
}
