//! Criterion benchmarks for the feature hot paths.
//!
//! Benchmarks:
//! 1. Single indicators over one long ticker series
//! 2. The feature engine over a multi-ticker universe (partition + sort + compute)

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use equitylab_core::domain::price::simple_return;
use equitylab_core::domain::PriceRow;
use equitylab_core::features::FeatureEngine;
use equitylab_core::indicators::{Indicator, Momentum, Rsi, Volatility};

fn make_rows(ticker: &str, n: usize, phase: f64) -> Vec<PriceRow> {
    let base_date = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    let mut rows: Vec<PriceRow> = Vec::with_capacity(n);
    for i in 0..n {
        let close = 100.0 + (i as f64 * 0.1 + phase).sin() * 10.0 + i as f64 * 0.01;
        let ret = rows.last().and_then(|p| simple_return(p.close, close));
        rows.push(PriceRow::new(
            base_date + chrono::Duration::days(i as i64),
            ticker,
            close,
            ret,
        ));
    }
    rows
}

fn bench_indicators(c: &mut Criterion) {
    let rows = make_rows("SPY", 2_520, 0.0);
    let mut group = c.benchmark_group("indicators");
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Rsi::new(14)),
        Box::new(Momentum::new(10)),
        Box::new(Volatility::new(21)),
    ];
    for ind in &indicators {
        group.bench_function(ind.name(), |b| b.iter(|| ind.compute(black_box(&rows))));
    }
    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("feature_engine");
    for tickers in [10usize, 100] {
        let mut rows = Vec::with_capacity(tickers * 500);
        for t in 0..tickers {
            rows.extend(make_rows(&format!("T{t:03}"), 500, t as f64));
        }
        // Interleave tickers the way a date-ordered relation stores them
        rows.sort_by_key(|r| r.date);

        let engine = FeatureEngine::new();
        group.bench_with_input(BenchmarkId::from_parameter(tickers), &rows, |b, rows| {
            b.iter(|| engine.compute(black_box(rows)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_indicators, bench_engine);
criterion_main!(benches);
