//! Unit tests for the detection engine

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::error::BotError;
    use crate::types::{Candle, Direction};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_sample_seeds_without_alert() {
        let mut eval = WindowEvaluator::new(15, 10.0);

        let event = eval.observe("BTCUSDT", 100.0, t0()).unwrap();
        assert!(event.is_none(), "seeding observation must never alert");

        let baseline = eval.baseline("BTCUSDT").unwrap();
        assert_eq!(baseline.price, 100.0);
        assert_eq!(baseline.observed_at, t0());
    }

    #[test]
    fn event_when_threshold_and_window_met() {
        // Baseline 100 at t0, lookback 15 min, threshold 10%;
        // 112 at t0+16min must yield +12.00%.
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("BTC", 100.0, t0()).unwrap();

        let event = eval
            .observe("BTC", 112.0, t0() + Duration::minutes(16))
            .unwrap()
            .expect("12% move over 16 minutes should alert");

        assert_eq!(event.symbol, "BTC");
        assert_eq!(event.base_price, 100.0);
        assert_eq!(event.current_price, 112.0);
        assert!((event.pct_change - 12.0).abs() < 1e-9);
        assert_eq!(event.elapsed, Duration::minutes(16));
        assert_eq!(event.direction(), Direction::Up);
    }

    #[test]
    fn sub_threshold_move_rebases_without_event() {
        // Same setup, 105 at t0+16min: 5% < 10%, no event, but the
        // baseline must move to (105, t0+16min).
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("BTC", 100.0, t0()).unwrap();

        let later = t0() + Duration::minutes(16);
        let event = eval.observe("BTC", 105.0, later).unwrap();
        assert!(event.is_none());

        let baseline = eval.baseline("BTC").unwrap();
        assert_eq!(baseline.price, 105.0);
        assert_eq!(baseline.observed_at, later);
    }

    #[test]
    fn baseline_rebased_after_event_too() {
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("ETH", 100.0, t0()).unwrap();

        let later = t0() + Duration::minutes(20);
        let event = eval.observe("ETH", 120.0, later).unwrap();
        assert!(event.is_some());

        let baseline = eval.baseline("ETH").unwrap();
        assert_eq!(baseline.price, 120.0);
        assert_eq!(baseline.observed_at, later);
    }

    #[test]
    fn too_early_leaves_baseline_untouched() {
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("BTC", 100.0, t0()).unwrap();

        // A 50% move only 5 minutes in must not alert or rebase.
        let event = eval
            .observe("BTC", 150.0, t0() + Duration::minutes(5))
            .unwrap();
        assert!(event.is_none());

        let baseline = eval.baseline("BTC").unwrap();
        assert_eq!(baseline.price, 100.0);
        assert_eq!(baseline.observed_at, t0());
    }

    #[test]
    fn stale_observation_is_ignored() {
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("BTC", 100.0, t0()).unwrap();

        let event = eval
            .observe("BTC", 200.0, t0() - Duration::minutes(30))
            .unwrap();
        assert!(event.is_none());

        let baseline = eval.baseline("BTC").unwrap();
        assert_eq!(baseline.price, 100.0);
        assert_eq!(baseline.observed_at, t0());
    }

    #[test]
    fn zero_baseline_discards_and_rebases() {
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("DOGE", 0.0, t0()).unwrap();

        // Division-by-zero guard: no event, baseline replaced.
        let later = t0() + Duration::minutes(16);
        let event = eval.observe("DOGE", 50.0, later).unwrap();
        assert!(event.is_none());
        assert_eq!(eval.baseline("DOGE").unwrap().price, 50.0);

        // The fresh baseline works normally afterwards.
        let event = eval
            .observe("DOGE", 60.0, later + Duration::minutes(16))
            .unwrap();
        assert!(event.is_some());
    }

    #[test]
    fn non_finite_price_is_an_evaluation_error() {
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("BTC", 100.0, t0()).unwrap();

        let err = eval
            .observe("BTC", f64::NAN, t0() + Duration::minutes(16))
            .unwrap_err();
        assert!(matches!(err, BotError::Evaluation(_)));

        // Baseline untouched; the symbol just skips this tick.
        assert_eq!(eval.baseline("BTC").unwrap().price, 100.0);
    }

    #[test]
    fn threshold_is_inclusive() {
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("BTC", 100.0, t0()).unwrap();

        let event = eval
            .observe("BTC", 110.0, t0() + Duration::minutes(15))
            .unwrap();
        assert!(event.is_some(), "exactly 10.00% qualifies");
    }

    #[test]
    fn downward_move_alerts_with_down_direction() {
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("SOL", 200.0, t0()).unwrap();

        let event = eval
            .observe("SOL", 170.0, t0() + Duration::minutes(16))
            .unwrap()
            .unwrap();
        assert!((event.pct_change - -15.0).abs() < 1e-9);
        assert_eq!(event.direction(), Direction::Down);
    }

    #[test]
    fn symbols_track_independent_baselines() {
        let mut eval = WindowEvaluator::new(15, 10.0);
        eval.observe("BTC", 100.0, t0()).unwrap();
        eval.observe("ETH", 50.0, t0()).unwrap();
        assert_eq!(eval.tracked_symbols(), 2);

        let event = eval
            .observe("ETH", 60.0, t0() + Duration::minutes(16))
            .unwrap();
        assert!(event.is_some());
        assert_eq!(eval.baseline("BTC").unwrap().price, 100.0);
    }

    #[test]
    fn candle_mode_compares_open_to_close() {
        let eval = WindowEvaluator::new(15, 10.0);
        let candle = Candle {
            open: 100.0,
            close: 88.5,
        };

        let event = eval.observe_candle("XBTUSDTM", &candle, t0()).unwrap();
        assert!((event.pct_change - -11.5).abs() < 1e-9);
        assert_eq!(event.base_price, 100.0);
        assert_eq!(event.current_price, 88.5);
        assert_eq!(event.elapsed, Duration::minutes(15));
    }

    #[test]
    fn candle_below_threshold_is_quiet() {
        let eval = WindowEvaluator::new(15, 10.0);
        let candle = Candle {
            open: 100.0,
            close: 104.0,
        };
        assert!(eval.observe_candle("XBTUSDTM", &candle, t0()).is_none());
    }

    #[test]
    fn candle_with_zero_open_is_discarded() {
        let eval = WindowEvaluator::new(15, 10.0);
        let candle = Candle {
            open: 0.0,
            close: 104.0,
        };
        assert!(eval.observe_candle("XBTUSDTM", &candle, t0()).is_none());
    }

    #[test]
    fn counter_returns_monotonic_signal_numbers() {
        let mut counter = DailySignalCounter::new(t0().date_naive());

        assert_eq!(counter.increment("BTC"), 1);
        assert_eq!(counter.increment("BTC"), 2);
        assert_eq!(counter.increment("BTC"), 3);
        assert_eq!(counter.increment("ETH"), 1);
        assert_eq!(counter.count("BTC"), 3);
        assert_eq!(counter.total_today(), 4);
    }

    #[test]
    fn counter_resets_once_on_date_change() {
        let mut counter = DailySignalCounter::new(t0().date_naive());
        counter.increment("BTC");
        counter.increment("BTC");

        let same_day = (t0() + Duration::hours(5)).date_naive();
        assert!(!counter.roll_over(same_day));
        assert_eq!(counter.count("BTC"), 2);

        let next_day = (t0() + Duration::days(1)).date_naive();
        assert!(counter.roll_over(next_day));
        assert_eq!(counter.count("BTC"), 0);
        assert_eq!(counter.increment("BTC"), 1);

        // Second call on the same new day is a no-op.
        assert!(!counter.roll_over(next_day));
        assert_eq!(counter.count("BTC"), 1);
    }
}
