//! Error types for the bot

use thiserror::Error;

/// Bot error type
#[derive(Debug, Error)]
pub enum BotError {
    /// Fatal misconfiguration. The only error that aborts the process,
    /// and only before the scheduler loop starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream fetch failed (timeout, bad status, malformed payload).
    /// Counted by the health monitor, never crashes the loop.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A price observation could not be evaluated (malformed numeric).
    /// The symbol is skipped for this tick, its baseline untouched.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// A channel message could not be delivered. Logged; later messages
    /// and the next tick are unaffected.
    #[error("Delivery error: {0}")]
    Delivery(String),
}

impl BotError {
    pub fn fetch(err: impl std::fmt::Display) -> Self {
        Self::Fetch(err.to_string())
    }

    pub fn delivery(err: impl std::fmt::Display) -> Self {
        Self::Delivery(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
