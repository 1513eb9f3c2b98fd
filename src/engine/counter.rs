//! Per-symbol daily signal counters

use chrono::NaiveDate;
use std::collections::HashMap;

/// Counts qualifying alerts per symbol per UTC calendar day.
///
/// The whole map is cleared exactly once when the date advances;
/// `roll_over` is called at the top of every scheduler tick.
pub struct DailySignalCounter {
    date: NaiveDate,
    counts: HashMap<String, u32>,
}

impl DailySignalCounter {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            date: today,
            counts: HashMap::new(),
        }
    }

    /// Clear all counters if the calendar date has advanced.
    /// Returns true when a reset happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if today == self.date {
            return false;
        }
        self.counts.clear();
        self.date = today;
        true
    }

    /// Bump the symbol's counter and return the post-increment count.
    pub fn increment(&mut self, symbol: &str) -> u32 {
        let count = self.counts.entry(symbol.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn count(&self, symbol: &str) -> u32 {
        self.counts.get(symbol).copied().unwrap_or(0)
    }

    /// Total signals across all symbols since the last reset.
    pub fn total_today(&self) -> u32 {
        self.counts.values().sum()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}
