//! Conversions between typed rows and Polars DataFrames.
//!
//! Every table in the warehouse passes through these helpers, so column types
//! are decided in one place: dates are `Date`, prices `Float64`, identifiers
//! `String`, volumes `UInt64`.

use super::provider::DataError;
use crate::domain::{FeatureRow, RawPriceRow};
use chrono::NaiveDate;
use polars::prelude::*;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn to_epoch_days(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

fn from_epoch_days(days: i32) -> NaiveDate {
    epoch() + chrono::Duration::days(days as i64)
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

fn polars_err(context: &'static str) -> impl Fn(PolarsError) -> DataError {
    move |e| DataError::ParquetError(format!("{context}: {e}"))
}

/// Build a `Date` column from optional dates.
pub fn date_column(name: &str, dates: &[Option<NaiveDate>]) -> Result<Column, DataError> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(to_epoch_days)).collect();
    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(polars_err("date cast"))
}

/// Build a `Float64` column from optional values.
pub fn f64_column(name: &str, values: &[Option<f64>]) -> Column {
    Column::new(name.into(), values.to_vec())
}

/// Build a `String` column from optional values.
pub fn str_column(name: &str, values: &[Option<String>]) -> Column {
    let refs: Vec<Option<&str>> = values.iter().map(|v| v.as_deref()).collect();
    Column::new(name.into(), refs)
}

/// Column names of a frame, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, DataError> {
    df.column(name)
        .map_err(|_| DataError::ValidationError(format!("missing column '{name}'")))
}

/// Read a column as dates. `Datetime` and ISO-8601 string columns are cast.
pub fn read_dates(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, DataError> {
    let col = column(df, name)?;
    let cast = match col.dtype() {
        DataType::Date => col.clone(),
        _ => col
            .cast(&DataType::Date)
            .map_err(polars_err("date column cast"))?,
    };
    let ca = cast.date().map_err(polars_err("date column type"))?;
    Ok((0..df.height())
        .map(|i| ca.get(i).map(from_epoch_days))
        .collect())
}

/// Read a numeric column as `f64`, casting integer and `Float32` columns.
pub fn read_f64s(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let col = column(df, name)?;
    let cast = col
        .cast(&DataType::Float64)
        .map_err(polars_err("float column cast"))?;
    let ca = cast.f64().map_err(polars_err("float column type"))?;
    Ok((0..df.height()).map(|i| ca.get(i)).collect())
}

/// Read a column as strings, casting non-string columns.
pub fn read_strings(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, DataError> {
    let col = column(df, name)?;
    let cast = col
        .cast(&DataType::String)
        .map_err(polars_err("string column cast"))?;
    let ca = cast.str().map_err(polars_err("string column type"))?;
    Ok((0..df.height())
        .map(|i| ca.get(i).map(str::to_string))
        .collect())
}

/// Read a column as unsigned integers.
pub fn read_u64s(df: &DataFrame, name: &str) -> Result<Vec<Option<u64>>, DataError> {
    let col = column(df, name)?;
    let cast = col
        .cast(&DataType::UInt64)
        .map_err(polars_err("integer column cast"))?;
    let ca = cast.u64().map_err(polars_err("integer column type"))?;
    Ok((0..df.height()).map(|i| ca.get(i)).collect())
}

/// `raw.equity_prices` layout: date, open, high, low, close, volume, symbol.
///
/// Non-finite prices are stored as nulls.
pub fn raw_rows_to_frame(rows: &[RawPriceRow]) -> Result<DataFrame, DataError> {
    let dates: Vec<Option<NaiveDate>> = rows.iter().map(|r| Some(r.date)).collect();
    let volumes: Vec<u64> = rows.iter().map(|r| r.volume).collect();
    let opens: Vec<Option<f64>> = rows.iter().map(|r| finite(r.open)).collect();
    let highs: Vec<Option<f64>> = rows.iter().map(|r| finite(r.high)).collect();
    let lows: Vec<Option<f64>> = rows.iter().map(|r| finite(r.low)).collect();
    let closes: Vec<Option<f64>> = rows.iter().map(|r| finite(r.close)).collect();
    let symbols: Vec<Option<String>> = rows.iter().map(|r| Some(r.symbol.clone())).collect();

    DataFrame::new(vec![
        date_column("date", &dates)?,
        f64_column("open", &opens),
        f64_column("high", &highs),
        f64_column("low", &lows),
        f64_column("close", &closes),
        Column::new("volume".into(), volumes),
        str_column("symbol", &symbols),
    ])
    .map_err(polars_err("raw price frame"))
}

/// Inverse of [`raw_rows_to_frame`]. Rows without a date or symbol are rejected.
pub fn frame_to_raw_rows(df: &DataFrame) -> Result<Vec<RawPriceRow>, DataError> {
    let dates = read_dates(df, "date")?;
    let symbols = read_strings(df, "symbol")?;
    let opens = read_f64s(df, "open")?;
    let highs = read_f64s(df, "high")?;
    let lows = read_f64s(df, "low")?;
    let closes = read_f64s(df, "close")?;
    let volumes = read_u64s(df, "volume")?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let date = dates[i]
            .ok_or_else(|| DataError::ValidationError(format!("null date at row {i}")))?;
        let symbol = symbols[i]
            .clone()
            .ok_or_else(|| DataError::ValidationError(format!("null symbol at row {i}")))?;
        rows.push(RawPriceRow {
            date,
            symbol,
            open: opens[i].unwrap_or(f64::NAN),
            high: highs[i].unwrap_or(f64::NAN),
            low: lows[i].unwrap_or(f64::NAN),
            close: closes[i].unwrap_or(f64::NAN),
            volume: volumes[i].unwrap_or(0),
        });
    }
    Ok(rows)
}

/// `core.feat_equity_daily` layout: date, ticker, rsi_14, momentum_10d, vol_21d.
pub fn feature_rows_to_frame(rows: &[FeatureRow]) -> Result<DataFrame, DataError> {
    let dates: Vec<Option<NaiveDate>> = rows.iter().map(|r| Some(r.date)).collect();
    let tickers: Vec<Option<String>> = rows.iter().map(|r| Some(r.ticker.clone())).collect();
    let rsi: Vec<Option<f64>> = rows.iter().map(|r| r.rsi_14).collect();
    let mom: Vec<Option<f64>> = rows.iter().map(|r| r.momentum_10d).collect();
    let vol: Vec<Option<f64>> = rows.iter().map(|r| r.vol_21d).collect();

    DataFrame::new(vec![
        date_column("date", &dates)?,
        str_column("ticker", &tickers),
        f64_column("rsi_14", &rsi),
        f64_column("momentum_10d", &mom),
        f64_column("vol_21d", &vol),
    ])
    .map_err(polars_err("feature frame"))
}

/// Inverse of [`feature_rows_to_frame`]. Key columns must be non-null.
pub fn frame_to_feature_rows(df: &DataFrame) -> Result<Vec<FeatureRow>, DataError> {
    let dates = read_dates(df, "date")?;
    let tickers = read_strings(df, "ticker")?;
    let rsi = read_f64s(df, "rsi_14")?;
    let mom = read_f64s(df, "momentum_10d")?;
    let vol = read_f64s(df, "vol_21d")?;

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let date = dates[i]
            .ok_or_else(|| DataError::ValidationError(format!("null feature date at row {i}")))?;
        let ticker = tickers[i]
            .clone()
            .ok_or_else(|| DataError::ValidationError(format!("null feature ticker at row {i}")))?;
        rows.push(FeatureRow {
            date,
            ticker,
            rsi_14: rsi[i],
            momentum_10d: mom[i],
            vol_21d: vol[i],
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn feature_frame_keeps_nulls() {
        let rows = vec![
            FeatureRow {
                date: d(2),
                ticker: "SPY".into(),
                rsi_14: None,
                momentum_10d: Some(0.05),
                vol_21d: None,
            },
            FeatureRow {
                date: d(3),
                ticker: "SPY".into(),
                rsi_14: Some(55.0),
                momentum_10d: None,
                vol_21d: Some(0.01),
            },
        ];
        let df = feature_rows_to_frame(&rows).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("rsi_14").unwrap().null_count(), 1);

        let back = frame_to_feature_rows(&df).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn read_f64s_casts_integer_columns() {
        let df = DataFrame::new(vec![Column::new("close".into(), vec![1i64, 2, 3])]).unwrap();
        let values = read_f64s(&df, "close").unwrap();
        assert_eq!(values, vec![Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn missing_column_is_validation_error() {
        let df = DataFrame::new(vec![Column::new("close".into(), vec![1.0f64])]).unwrap();
        let err = read_dates(&df, "date").unwrap_err();
        assert!(matches!(err, DataError::ValidationError(_)));
    }

    #[test]
    fn date_column_roundtrip_through_reader() {
        let dates = vec![Some(d(2)), None, Some(d(4))];
        let df = DataFrame::new(vec![date_column("date", &dates).unwrap()]).unwrap();
        assert_eq!(read_dates(&df, "date").unwrap(), dates);
    }
}
