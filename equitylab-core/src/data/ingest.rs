//! Ingestion: fetch → `raw.equity_prices` → `core.fct_prices_daily`.
//!
//! Both steps are replayable. Fetched rows merge into the raw table keyed by
//! `(date, symbol)`, and the daily table is rebuilt from scratch each time.

use super::frames::{date_column, f64_column, frame_to_raw_rows, raw_rows_to_frame, str_column};
use super::provider::{DataError, DataProvider, IngestProgress};
use super::warehouse::{Warehouse, PRICES_DAILY, RAW_PRICES};
use crate::domain::price::simple_return;
use crate::domain::RawPriceRow;
use crate::error::PipelineError;
use crate::normalize::schema::SchemaError;
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Summary of a multi-symbol ingestion.
#[derive(Debug)]
pub struct IngestSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows returned by the provider (after dropping void bars).
    pub rows_fetched: usize,
    pub rows_inserted: usize,
    pub rows_updated: usize,
    /// Row count of `raw.equity_prices` after the merge.
    pub table_rows: usize,
    pub errors: Vec<(String, DataError)>,
}

impl IngestSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Fetch `tickers` over `[start, end]` and merge them into `raw.equity_prices`.
///
/// A failing ticker is recorded and skipped; the others still land. Fails with
/// `NoData` only when no ticker produced any rows.
pub fn ingest_prices(
    provider: &dyn DataProvider,
    warehouse: &Warehouse,
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
    progress: &dyn IngestProgress,
) -> Result<IngestSummary, PipelineError> {
    let total = tickers.len();
    let mut fetched: Vec<RawPriceRow> = Vec::new();
    let mut errors: Vec<(String, DataError)> = Vec::new();
    let mut succeeded = 0;

    for (i, ticker) in tickers.iter().enumerate() {
        let ticker = ticker.trim();
        progress.on_start(ticker, i, total);

        let result = provider.fetch(ticker, start, end).map(|r| {
            let before = r.rows.len();
            let rows: Vec<RawPriceRow> = r.rows.into_iter().filter(|row| !row.is_void()).collect();
            if rows.len() < before {
                log::warn!("{ticker}: dropped {} void bars", before - rows.len());
            }
            let insane = rows.iter().filter(|row| !row.is_sane()).count();
            if insane > 0 {
                log::warn!("{ticker}: {insane} bars fail the OHLC sanity check (kept)");
            }
            rows
        });

        let outcome = result.as_ref().map(|rows| rows.len()).map_err(clone_error);
        progress.on_complete(ticker, &outcome);

        match result {
            Ok(rows) => {
                succeeded += 1;
                fetched.extend(rows);
            }
            Err(e) => {
                log::warn!("{ticker}: fetch from {} failed: {e}", provider.name());
                errors.push((ticker.to_string(), e));
            }
        }
    }

    let failed = total - succeeded;
    progress.on_batch_complete(succeeded, failed, total);

    if fetched.is_empty() {
        return Err(PipelineError::NoData(format!(
            "no rows fetched from {} for {total} ticker(s)",
            provider.name()
        )));
    }

    let rows_fetched = fetched.len();
    let (rows_inserted, rows_updated, table_rows) = merge_raw_rows(warehouse, fetched)?;
    log::info!(
        "{RAW_PRICES}: {rows_inserted} inserted, {rows_updated} updated, {table_rows} total rows"
    );

    Ok(IngestSummary {
        total,
        succeeded,
        failed,
        rows_fetched,
        rows_inserted,
        rows_updated,
        table_rows,
        errors,
    })
}

/// Progress callbacks get a borrowed view; errors are not `Clone`, so rebuild one.
fn clone_error(e: &DataError) -> DataError {
    DataError::Other(e.to_string())
}

/// Merge rows into the raw table, last write wins per `(symbol, date)`.
///
/// Returns `(inserted, updated, total_rows)`.
pub fn merge_raw_rows(
    warehouse: &Warehouse,
    rows: Vec<RawPriceRow>,
) -> Result<(usize, usize, usize), DataError> {
    let mut table: BTreeMap<(String, NaiveDate), RawPriceRow> = BTreeMap::new();
    if warehouse.exists(RAW_PRICES) {
        for row in frame_to_raw_rows(&warehouse.read(RAW_PRICES)?)? {
            table.insert((row.symbol.clone(), row.date), row);
        }
    }

    let mut inserted = 0;
    let mut updated = 0;
    for row in rows {
        match table.insert((row.symbol.clone(), row.date), row) {
            Some(_) => updated += 1,
            None => inserted += 1,
        }
    }

    let merged: Vec<RawPriceRow> = table.into_values().collect();
    let total = merged.len();
    warehouse.write(RAW_PRICES, raw_rows_to_frame(&merged)?)?;
    Ok((inserted, updated, total))
}

/// Summary of a `core.fct_prices_daily` rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub rows: usize,
    pub symbols: usize,
}

/// Rebuild `core.fct_prices_daily` (symbol, date, close, volume, ret_1d) from the raw table.
///
/// `ret_1d = close[t] / close[t-1] - 1` within each symbol ordered by date;
/// the first row of each symbol has no return.
pub fn build_prices_daily(warehouse: &Warehouse) -> Result<BuildSummary, PipelineError> {
    if !warehouse.exists(RAW_PRICES) {
        return Err(SchemaError::NoSourceRelation {
            candidates: vec![RAW_PRICES.to_string()],
        }
        .into());
    }

    let mut rows = frame_to_raw_rows(&warehouse.read(RAW_PRICES)?)?;
    if rows.is_empty() {
        return Err(PipelineError::NoData(format!("{RAW_PRICES} is empty")));
    }
    rows.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));

    let n = rows.len();
    let mut symbols = Vec::with_capacity(n);
    let mut dates = Vec::with_capacity(n);
    let mut closes = Vec::with_capacity(n);
    let mut volumes = Vec::with_capacity(n);
    let mut returns = Vec::with_capacity(n);
    let mut symbol_count = 0;

    for (i, row) in rows.iter().enumerate() {
        let prev = if i > 0 && rows[i - 1].symbol == row.symbol {
            Some(&rows[i - 1])
        } else {
            symbol_count += 1;
            None
        };

        symbols.push(Some(row.symbol.clone()));
        dates.push(Some(row.date));
        closes.push(row.close.is_finite().then_some(row.close));
        volumes.push(row.volume);
        returns.push(prev.and_then(|p| simple_return(p.close, row.close)));
    }

    let df = DataFrame::new(vec![
        str_column("symbol", &symbols),
        date_column("date", &dates)?,
        f64_column("close", &closes),
        Column::new("volume".into(), volumes),
        f64_column("ret_1d", &returns),
    ])
    .map_err(|e| DataError::ParquetError(format!("daily price frame: {e}")))?;

    warehouse.write(PRICES_DAILY, df)?;
    log::info!("{PRICES_DAILY}: {n} rows across {symbol_count} symbols");

    Ok(BuildSummary {
        rows: n,
        symbols: symbol_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::frames::{read_f64s, read_strings};
    use crate::data::provider::{DataSource, FetchResult, NoProgress};

    struct FixedProvider {
        rows: Vec<RawPriceRow>,
    }

    impl DataProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<FetchResult, DataError> {
            let rows: Vec<RawPriceRow> = self
                .rows
                .iter()
                .filter(|r| r.symbol == symbol)
                .cloned()
                .collect();
            if rows.is_empty() {
                return Err(DataError::SymbolNotFound {
                    symbol: symbol.to_string(),
                });
            }
            Ok(FetchResult {
                symbol: symbol.to_string(),
                rows,
                source: DataSource::Synthetic,
            })
        }
    }

    fn row(symbol: &str, day: u32, close: f64) -> RawPriceRow {
        RawPriceRow {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            symbol: symbol.into(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 100,
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[test]
    fn ingest_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let wh = Warehouse::new(dir.path());
        let provider = FixedProvider {
            rows: vec![row("AAA", 2, 10.0), row("AAA", 3, 11.0), row("BBB", 2, 20.0)],
        };
        let tickers = vec!["AAA".to_string(), "BBB".to_string()];
        let (start, end) = range();

        let first = ingest_prices(&provider, &wh, &tickers, start, end, &NoProgress).unwrap();
        assert_eq!(first.rows_inserted, 3);
        assert_eq!(first.table_rows, 3);

        let second = ingest_prices(&provider, &wh, &tickers, start, end, &NoProgress).unwrap();
        assert_eq!(second.rows_inserted, 0);
        assert_eq!(second.rows_updated, 3);
        assert_eq!(second.table_rows, 3);
    }

    #[test]
    fn failing_ticker_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let wh = Warehouse::new(dir.path());
        let provider = FixedProvider {
            rows: vec![row("AAA", 2, 10.0)],
        };
        let tickers = vec!["AAA".to_string(), "MISSING".to_string()];
        let (start, end) = range();

        let summary = ingest_prices(&provider, &wh, &tickers, start, end, &NoProgress).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.errors[0].0, "MISSING");
    }

    #[test]
    fn nothing_fetched_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let wh = Warehouse::new(dir.path());
        let provider = FixedProvider { rows: vec![] };
        let (start, end) = range();
        let err =
            ingest_prices(&provider, &wh, &["AAA".to_string()], start, end, &NoProgress)
                .unwrap_err();
        assert!(matches!(err, PipelineError::NoData(_)));
        assert!(!wh.exists(RAW_PRICES));
    }

    #[test]
    fn build_computes_returns_per_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let wh = Warehouse::new(dir.path());
        merge_raw_rows(
            &wh,
            vec![
                row("BBB", 3, 22.0),
                row("AAA", 2, 10.0),
                row("BBB", 2, 20.0),
                row("AAA", 3, 11.0),
            ],
        )
        .unwrap();

        let summary = build_prices_daily(&wh).unwrap();
        assert_eq!(summary, BuildSummary { rows: 4, symbols: 2 });

        let df = wh.read(PRICES_DAILY).unwrap();
        let symbols = read_strings(&df, "symbol").unwrap();
        let rets = read_f64s(&df, "ret_1d").unwrap();
        assert_eq!(symbols[0].as_deref(), Some("AAA"));
        assert_eq!(rets[0], None);
        assert!((rets[1].unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(rets[2], None);
        assert!((rets[3].unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn build_without_raw_table_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let wh = Warehouse::new(dir.path());
        assert!(matches!(
            build_prices_daily(&wh),
            Err(PipelineError::Schema(_))
        ));
    }
}
