//! Quality gate against a real warehouse.

use chrono::NaiveDate;
use equitylab_core::data::frames::{date_column, f64_column, str_column};
use equitylab_core::data::{Warehouse, PRICES_DAILY};
use equitylab_core::features::build_features;
use equitylab_core::quality::{run_checks, CheckDetail};
use equitylab_core::{PipelineConfig, PipelineError};
use polars::prelude::DataFrame;

fn d(day: u32) -> NaiveDate {
    // 2024-01-01 is a Monday
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

struct Rows {
    dates: Vec<Option<NaiveDate>>,
    tickers: Vec<Option<String>>,
    closes: Vec<Option<f64>>,
    returns: Vec<Option<f64>>,
}

impl Rows {
    fn new() -> Self {
        Self {
            dates: Vec::new(),
            tickers: Vec::new(),
            closes: Vec::new(),
            returns: Vec::new(),
        }
    }

    fn push(mut self, day: u32, ticker: &str, close: f64, ret: Option<f64>) -> Self {
        self.dates.push(Some(d(day)));
        self.tickers.push(Some(ticker.to_string()));
        self.closes.push(Some(close));
        self.returns.push(ret);
        self
    }

    fn write(self, wh: &Warehouse) {
        let df = DataFrame::new(vec![
            str_column("symbol", &self.tickers),
            date_column("date", &self.dates).unwrap(),
            f64_column("close", &self.closes),
            f64_column("ret_1d", &self.returns),
        ])
        .unwrap();
        wh.write(PRICES_DAILY, df).unwrap();
    }
}

/// AAA and BBB on Mon 1 .. Fri 5, clean.
fn clean_week() -> Rows {
    let mut rows = Rows::new();
    for ticker in ["AAA", "BBB"] {
        for day in 1..=5 {
            let ret = (day > 1).then_some(0.01);
            rows = rows.push(day, ticker, 100.0 + day as f64, ret);
        }
    }
    rows
}

#[test]
fn clean_fresh_data_passes() {
    let dir = tempfile::tempdir().unwrap();
    let wh = Warehouse::new(dir.path());
    clean_week().write(&wh);

    // Fri 5 → Tue 9: only Mon 8 lies strictly between
    let report = run_checks(&wh, d(9), &PipelineConfig::default()).unwrap();
    assert!(report.passed(), "{report}");
    assert_eq!(report.source, PRICES_DAILY);

    let nulls = report.check("nulls_in_features").unwrap();
    assert_eq!(nulls.detail, CheckDetail::FeatureNulls(None));
}

#[test]
fn duplicate_key_is_blocking() {
    let dir = tempfile::tempdir().unwrap();
    let wh = Warehouse::new(dir.path());
    clean_week().push(3, "AAA", 103.0, Some(0.01)).write(&wh);

    let report = run_checks(&wh, d(9), &PipelineConfig::default()).unwrap();
    assert!(!report.passed());
    assert_eq!(report.failed_checks(), vec!["dupe_keys_prices"]);
    assert_eq!(
        report.check("dupe_keys_prices").unwrap().detail,
        CheckDetail::DupeKeys { n_dupes: 1 }
    );

    let err = report.into_result().unwrap_err();
    assert!(matches!(err, PipelineError::ValidationFailure { .. }));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn stale_data_fails_freshness() {
    let dir = tempfile::tempdir().unwrap();
    let wh = Warehouse::new(dir.path());
    clean_week().write(&wh);

    // Fri 5 → Sat 13: Mon 8 .. Fri 12 between = 5 business days
    let stale = run_checks(&wh, d(13), &PipelineConfig::default()).unwrap();
    assert_eq!(stale.failed_checks(), vec!["freshness_check"]);

    // Fri 5 → Thu 11: Mon 8 .. Wed 10 = 3 business days, at the threshold
    let edge = run_checks(&wh, d(11), &PipelineConfig::default()).unwrap();
    assert!(edge.passed());

    // Fri 5 → Wed 10: 2 business days
    let fresh = run_checks(&wh, d(10), &PipelineConfig::default()).unwrap();
    assert!(fresh.passed());
}

#[test]
fn missing_return_after_first_row_is_blocking() {
    let dir = tempfile::tempdir().unwrap();
    let wh = Warehouse::new(dir.path());
    let mut rows = clean_week();
    rows.returns[3] = None;
    rows.write(&wh);

    let report = run_checks(&wh, d(9), &PipelineConfig::default()).unwrap();
    assert_eq!(report.failed_checks(), vec!["nulls_in_prices"]);
}

#[test]
fn gaps_are_informational() {
    let dir = tempfile::tempdir().unwrap();
    let wh = Warehouse::new(dir.path());
    Rows::new()
        .push(1, "AAA", 100.0, None)
        .push(5, "AAA", 101.0, Some(0.01))
        .write(&wh);

    let report = run_checks(&wh, d(8), &PipelineConfig::default()).unwrap();
    assert!(report.passed());
    let CheckDetail::DateGaps(gaps) = &report.check("date_gaps_prices").unwrap().detail else {
        panic!("wrong detail");
    };
    assert_eq!(gaps[0].missing_weekdays_estimate, 3);
}

#[test]
fn feature_nulls_reported_after_build() {
    let dir = tempfile::tempdir().unwrap();
    let wh = Warehouse::new(dir.path());
    clean_week().write(&wh);
    build_features(&wh).unwrap();

    let report = run_checks(&wh, d(9), &PipelineConfig::default()).unwrap();
    let CheckDetail::FeatureNulls(Some(nulls)) = report.check("nulls_in_features").unwrap().detail
    else {
        panic!("feature nulls not reported");
    };
    // Five rows per ticker is shorter than every warmup
    assert_eq!(nulls.null_rsi, Some(10));
    assert_eq!(nulls.null_mom, Some(10));
    assert_eq!(nulls.null_vol, Some(10));
    assert!(report.passed());
}

#[test]
fn missing_relation_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let wh = Warehouse::new(dir.path());
    let err = run_checks(&wh, d(9), &PipelineConfig::default()).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
