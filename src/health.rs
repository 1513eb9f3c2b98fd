//! Upstream health tracking
//!
//! Distinguishes transient fetch hiccups from real outages: a "source
//! down" notice goes out only after failures have persisted past the
//! grace period, and a matching recovery notice on the next success.
//! Exactly one of each per outage episode.

use crate::types::HealthNotice;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Down,
}

/// Failure/success stream for one data source.
pub struct HealthMonitor {
    grace: Duration,
    consecutive_failures: u32,
    down_since: Option<DateTime<Utc>>,
    last_success_at: Option<DateTime<Utc>>,
    down_notice_sent: bool,
}

impl HealthMonitor {
    pub fn new(outage_grace_minutes: u32) -> Self {
        Self {
            grace: Duration::minutes(i64::from(outage_grace_minutes)),
            consecutive_failures: 0,
            down_since: None,
            last_success_at: None,
            down_notice_sent: false,
        }
    }

    /// Record a failed fetch. Returns the down notice once the outage
    /// has outlasted the grace period, and never again for this streak.
    pub fn on_failure(&mut self, now: DateTime<Utc>) -> Option<HealthNotice> {
        let since = *self.down_since.get_or_insert(now);
        self.consecutive_failures += 1;

        if !self.down_notice_sent && now - since > self.grace {
            self.down_notice_sent = true;
            return Some(HealthNotice::SourceDown { since });
        }
        None
    }

    /// Record a successful fetch. Returns the recovery notice if (and
    /// only if) a down notice went out for the streak that just ended.
    pub fn on_success(&mut self, now: DateTime<Utc>) -> Option<HealthNotice> {
        let notice = if self.down_notice_sent {
            self.down_since.map(|since| HealthNotice::SourceRecovered {
                downtime: now - since,
                last_success: self.last_success_at,
            })
        } else {
            None
        };

        self.consecutive_failures = 0;
        self.down_since = None;
        self.down_notice_sent = false;
        self.last_success_at = Some(now);

        notice
    }

    pub fn status(&self) -> HealthStatus {
        if self.down_since.is_some() {
            HealthStatus::Down
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_success_at(&self) -> Option<DateTime<Utc>> {
        self.last_success_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn quiet_within_grace_period() {
        let mut monitor = HealthMonitor::new(30);

        assert!(monitor.on_failure(t0()).is_none());
        assert!(monitor.on_failure(t0() + Duration::minutes(15)).is_none());
        assert!(monitor.on_failure(t0() + Duration::minutes(30)).is_none());
        assert_eq!(monitor.consecutive_failures(), 3);
        assert_eq!(monitor.status(), HealthStatus::Down);
    }

    #[test]
    fn single_down_notice_per_streak() {
        let mut monitor = HealthMonitor::new(30);

        monitor.on_failure(t0());
        let notice = monitor.on_failure(t0() + Duration::minutes(31));
        assert_eq!(notice, Some(HealthNotice::SourceDown { since: t0() }));

        // Further failures stay quiet.
        assert!(monitor.on_failure(t0() + Duration::minutes(45)).is_none());
        assert!(monitor.on_failure(t0() + Duration::minutes(90)).is_none());
    }

    #[test]
    fn recovery_notice_reports_downtime_and_last_success() {
        let mut monitor = HealthMonitor::new(30);
        monitor.on_success(t0() - Duration::minutes(3));

        // Fails continuously from t0 to t0+35, grace 30: one down
        // notice, then one recovery reporting ~35 minutes down.
        for m in (0..=33).step_by(3) {
            monitor.on_failure(t0() + Duration::minutes(m));
        }

        let notice = monitor.on_success(t0() + Duration::minutes(35));
        assert_eq!(
            notice,
            Some(HealthNotice::SourceRecovered {
                downtime: Duration::minutes(35),
                last_success: Some(t0() - Duration::minutes(3)),
            })
        );

        assert_eq!(monitor.status(), HealthStatus::Healthy);
        assert_eq!(monitor.consecutive_failures(), 0);
        assert_eq!(monitor.last_success_at(), Some(t0() + Duration::minutes(35)));
    }

    #[test]
    fn short_blip_never_notifies() {
        let mut monitor = HealthMonitor::new(30);

        assert!(monitor.on_failure(t0()).is_none());
        assert!(monitor.on_failure(t0() + Duration::minutes(3)).is_none());
        assert!(monitor.on_success(t0() + Duration::minutes(6)).is_none());
        assert_eq!(monitor.status(), HealthStatus::Healthy);
    }

    #[test]
    fn next_outage_starts_a_fresh_streak() {
        let mut monitor = HealthMonitor::new(30);

        monitor.on_failure(t0());
        monitor.on_failure(t0() + Duration::minutes(31));
        monitor.on_success(t0() + Duration::minutes(40));

        // New streak: grace applies from its own first failure.
        let t1 = t0() + Duration::minutes(60);
        assert!(monitor.on_failure(t1).is_none());
        let notice = monitor.on_failure(t1 + Duration::minutes(31));
        assert_eq!(notice, Some(HealthNotice::SourceDown { since: t1 }));
    }

    #[test]
    fn success_always_updates_last_success() {
        let mut monitor = HealthMonitor::new(30);
        assert_eq!(monitor.last_success_at(), None);

        monitor.on_success(t0());
        assert_eq!(monitor.last_success_at(), Some(t0()));

        monitor.on_success(t0() + Duration::minutes(3));
        assert_eq!(monitor.last_success_at(), Some(t0() + Duration::minutes(3)));
    }
}
