//! CSV import provider.
//!
//! Reads daily bar files with a header row containing `date, open, high, low,
//! close, volume, symbol` in any order and any letter case. Extra columns are
//! ignored. Dates may carry a time suffix (`2024-01-02 00:00:00`).

use super::provider::{DataError, DataProvider, DataSource, FetchResult};
use crate::domain::RawPriceRow;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const REQUIRED: [&str; 7] = ["date", "open", "high", "low", "close", "volume", "symbol"];

/// Provider backed by one or more CSV files on disk.
pub struct CsvImport {
    paths: Vec<PathBuf>,
}

impl CsvImport {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Read every row of every file, in file order.
    pub fn read_all(&self) -> Result<Vec<RawPriceRow>, DataError> {
        let mut rows = Vec::new();
        for path in &self.paths {
            rows.extend(read_file(path)?);
        }
        Ok(rows)
    }

    /// Distinct symbols present across all files, sorted.
    pub fn symbols(&self) -> Result<Vec<String>, DataError> {
        let mut symbols: Vec<String> = self.read_all()?.into_iter().map(|r| r.symbol).collect();
        symbols.sort();
        symbols.dedup();
        Ok(symbols)
    }
}

impl DataProvider for CsvImport {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let wanted = symbol.to_uppercase();
        let rows: Vec<RawPriceRow> = self
            .read_all()?
            .into_iter()
            .filter(|r| r.symbol == wanted && r.date >= start && r.date <= end)
            .collect();

        if rows.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(FetchResult {
            symbol: wanted,
            rows,
            source: DataSource::CsvImport,
        })
    }
}

fn normalize_header(h: &str) -> String {
    h.trim().to_lowercase().replace(' ', "_")
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_f64(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

fn read_file(path: &Path) -> Result<Vec<RawPriceRow>, DataError> {
    let csv_err = |e: csv::Error| DataError::CsvError(format!("{}: {e}", path.display()));

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = reader.headers().map_err(csv_err)?.clone();
    let index: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (normalize_header(h), i))
        .collect();

    let missing: Vec<&str> = REQUIRED
        .iter()
        .copied()
        .filter(|c| !index.contains_key(*c))
        .collect();
    if !missing.is_empty() {
        return Err(DataError::CsvError(format!(
            "{}: missing columns {missing:?}",
            path.display()
        )));
    }
    let col = |name: &str| index.get(name).copied().unwrap_or_default();
    let (i_date, i_open, i_high, i_low, i_close, i_volume, i_symbol) = (
        col("date"),
        col("open"),
        col("high"),
        col("low"),
        col("close"),
        col("volume"),
        col("symbol"),
    );

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let field = |i: usize| record.get(i).unwrap_or("");

        let date = parse_date(field(i_date)).ok_or_else(|| {
            DataError::CsvError(format!(
                "{}: bad date '{}' on data line {}",
                path.display(),
                field(i_date),
                line + 1
            ))
        })?;
        let symbol = field(i_symbol).trim().to_uppercase();
        if symbol.is_empty() {
            return Err(DataError::CsvError(format!(
                "{}: empty symbol on data line {}",
                path.display(),
                line + 1
            )));
        }

        let volume = parse_f64(field(i_volume));
        rows.push(RawPriceRow {
            date,
            symbol,
            open: parse_f64(field(i_open)),
            high: parse_f64(field(i_high)),
            low: parse_f64(field(i_low)),
            close: parse_f64(field(i_close)),
            volume: if volume.is_finite() && volume > 0.0 {
                volume as u64
            } else {
                0
            },
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn reads_rows_with_mixed_case_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "prices.csv",
            "Date,Open,High,Low,Close,Volume,Symbol\n\
             2024-01-02,100,101,99,100.5,1000,spy\n\
             2024-01-03 00:00:00,100.5,102,100,101.5,1100.0,spy\n",
        );
        let rows = CsvImport::new(vec![path]).read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "SPY");
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(rows[1].volume, 1100);
    }

    #[test]
    fn missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(dir.path(), "bad.csv", "date,close\n2024-01-02,1\n");
        let err = CsvImport::new(vec![path]).read_all().unwrap_err();
        assert!(matches!(err, DataError::CsvError(_)));
    }

    #[test]
    fn fetch_filters_symbol_and_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "prices.csv",
            "date,open,high,low,close,volume,symbol\n\
             2024-01-02,1,1,1,1,1,AAA\n\
             2024-01-03,1,1,1,1,1,AAA\n\
             2024-01-03,1,1,1,1,1,BBB\n",
        );
        let provider = CsvImport::new(vec![path]);
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();

        let result = provider.fetch("aaa", d(3), d(31)).unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.source, DataSource::CsvImport);

        assert!(provider.fetch("ZZZ", d(1), d(31)).is_err());
        assert_eq!(provider.symbols().unwrap(), vec!["AAA", "BBB"]);
    }
}
