use chrono::{Duration, NaiveDate};
use fuel_cycle::backtest::Backtester;
use fuel_cycle::config::AlgoConfig;
use fuel_cycle::cycle::CycleAnalyzer;
use fuel_cycle::optimizer::{ThresholdGrid, ThresholdOptimizer};
use fuel_cycle::utils::{noisy_sawtooth_series, sawtooth_series};
use fuel_cycle::DailySeries;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashMap;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[test]
fn test_flat_series_has_no_real_hikes() {
    let series = DailySeries::from_prices(start(), &[172.0; 60]);
    let report = Backtester::default().run(&series, 7, 5.0, None).unwrap();

    assert!(report.records.iter().all(|r| r.actual_hike == 0));

    let m = report.metrics;
    assert_eq!(m.total_days, 60 - 7 - 12);
    assert_eq!(m.confusion.tp, 0);
    assert_eq!(m.confusion.r#fn, 0);
    assert_eq!(m.recall, 0.0);
    assert_eq!(m.precision, 0.0);
    assert_eq!(m.f1_score, 0.0);
    assert_eq!(m.accuracy, m.confusion.tn as f64 / m.total_days as f64);
}

#[test]
fn test_backtest_is_deterministic() {
    let series = noisy_sawtooth_series(start(), 150, 25, 158.0, 26.0, 0.8, 42);
    let backtester = Backtester::default();

    let a = backtester.run(&series, 7, 5.0, Some(7.5)).unwrap();
    let b = backtester.run(&series, 7, 5.0, Some(7.5)).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_records_are_in_date_order() {
    let series = sawtooth_series(start(), 100, 20, 160.0, 24.0);
    let report = Backtester::default().run(&series, 7, 5.0, None).unwrap();
    assert!(report.records.windows(2).all(|w| w[0].date < w[1].date));
}

#[test]
fn test_sawtooth_hikes_are_caught() {
    let series = sawtooth_series(start(), 150, 25, 158.0, 26.0);
    let report = Backtester::default().run(&series, 7, 5.0, None).unwrap();

    assert!(report.metrics.confusion.tp > 0);
    assert!(report.metrics.recall > 0.0);
}

#[test]
fn test_evaluation_ignores_later_days() {
    let base = noisy_sawtooth_series(start(), 100, 25, 158.0, 26.0, 0.8, 7);
    let cutoff = 70;

    let mut longer = base.prices();
    longer.extend((0..40).map(|i| 240.0 - (i % 3) as f64 * 30.0));
    let extended = DailySeries::from_prices(start(), &longer);

    let mut shifted = base.prices();
    shifted[cutoff..].iter_mut().for_each(|p| *p += 40.0);
    let perturbed = DailySeries::from_prices(start(), &shifted);

    let backtester = Backtester::default();
    let reference = backtester.run(&base, 7, 5.0, None).unwrap();
    let last_shared = start() + Duration::days(cutoff as i64);

    for variant in [&extended, &perturbed] {
        let report = backtester.run(variant, 7, 5.0, None).unwrap();
        let by_date: HashMap<NaiveDate, _> = report
            .records
            .iter()
            .map(|r| (r.date, r))
            .collect();

        let mut compared = 0;
        for record in reference.records.iter().filter(|r| r.date < last_shared) {
            if let Some(other) = by_date.get(&record.date) {
                assert_eq!(other.phase, record.phase, "{}", record.date);
                assert_eq!(other.signal_hike, record.signal_hike, "{}", record.date);
                compared += 1;
            }
        }
        assert!(compared > 30);
    }
}

#[rstest]
#[case(0)]
#[case(200)]
fn test_unusable_lookahead(#[case] lookahead: usize) {
    let series = sawtooth_series(start(), 60, 20, 160.0, 24.0);
    assert!(Backtester::default().run(&series, lookahead, 5.0, None).is_none());
}

#[test]
fn test_optimizer_keeps_threshold_when_all_candidates_tie() {
    // +29 jumps are caught by every candidate, 1 cpl declines by none
    let series = sawtooth_series(start(), 90, 30, 160.0, 29.0);
    let current = AlgoConfig::default();

    let outcome = ThresholdOptimizer::default().optimize(&series, 5.0, &current);

    assert!(!outcome.improved);
    assert_eq!(outcome.recommended, current);
    assert_eq!(outcome.message, "Current threshold (8c) is already optimal.");

    let scores: Vec<f64> = outcome.candidates.iter().filter_map(|c| c.score).collect();
    assert_eq!(scores.len(), 17);
    assert!(scores.iter().all(|&s| s == scores[0]));
}

#[test]
fn test_optimizer_preserves_unknown_keys() {
    let series = sawtooth_series(start(), 90, 30, 160.0, 29.0);
    let mut current = AlgoConfig::with_threshold(20.0);
    current
        .extra
        .insert("region".to_string(), serde_json::Value::from("brisbane"));

    let outcome = ThresholdOptimizer::default()
        .with_grid(ThresholdGrid {
            start: 10.0,
            end: 30.0,
            step: 10.0,
        })
        .optimize(&series, 5.0, &current);

    assert_eq!(outcome.candidates.len(), 3);
    assert_eq!(outcome.recommended.extra.get("region"), current.extra.get("region"));
}

#[test]
fn test_optimizer_recommends_threshold_that_sees_hikes() {
    // a 20 cpl threshold never fires on 14 cpl jumps
    let series = sawtooth_series(start(), 150, 30, 160.0, 14.0);
    let current = AlgoConfig::with_threshold(20.0);

    let outcome = ThresholdOptimizer::new(Backtester::new(CycleAnalyzer::default(), 20.0))
        .with_grid(ThresholdGrid {
            start: 10.0,
            end: 20.0,
            step: 10.0,
        })
        .optimize(&series, 5.0, &current);

    assert!(outcome.improved);
    assert_eq!(outcome.recommended.hike_threshold, 10.0);
    assert!(outcome.message.starts_with("Found optimized threshold: 10c"));
}
