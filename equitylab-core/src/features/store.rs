//! Feature store: keyed upsert into `core.feat_equity_daily`.
//!
//! Key is `(date, ticker)`. An upsert reads the current table, merges the batch
//! and replaces the file in one atomic write, so readers see either the old
//! table or the fully merged one.

use crate::data::frames::{feature_rows_to_frame, frame_to_feature_rows};
use crate::data::provider::DataError;
use crate::data::warehouse::{TableMeta, Warehouse, FEATURES_DAILY};
use crate::domain::FeatureRow;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error("batch contains duplicate key ({date}, {ticker})")]
    DuplicateKey { date: NaiveDate, ticker: String },
}

/// Outcome of one upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

pub struct FeatureStore<'a> {
    warehouse: &'a Warehouse,
}

impl<'a> FeatureStore<'a> {
    pub fn new(warehouse: &'a Warehouse) -> Self {
        Self { warehouse }
    }

    pub fn exists(&self) -> bool {
        self.warehouse.exists(FEATURES_DAILY)
    }

    /// Create the table empty if it does not exist yet.
    pub fn ensure_table(&self) -> Result<(), StoreError> {
        if !self.exists() {
            log::info!("creating empty {FEATURES_DAILY}");
            self.write(&[])?;
        }
        Ok(())
    }

    /// Merge `batch` into the table.
    ///
    /// Existing keys get their three feature columns overwritten; new keys are
    /// appended; keys absent from the batch are untouched. A batch that repeats
    /// a key is rejected before anything is written.
    pub fn upsert(&self, batch: &[FeatureRow]) -> Result<UpsertSummary, StoreError> {
        let mut seen: HashSet<(NaiveDate, &str)> = HashSet::with_capacity(batch.len());
        for row in batch {
            if !seen.insert((row.date, row.ticker.as_str())) {
                return Err(StoreError::DuplicateKey {
                    date: row.date,
                    ticker: row.ticker.clone(),
                });
            }
        }

        self.ensure_table()?;

        let mut table: BTreeMap<(String, NaiveDate), FeatureRow> = self
            .load()?
            .into_iter()
            .map(|r| ((r.ticker.clone(), r.date), r))
            .collect();

        let mut summary = UpsertSummary::default();
        for row in batch {
            match table.insert((row.ticker.clone(), row.date), row.clone()) {
                Some(_) => summary.updated += 1,
                None => summary.inserted += 1,
            }
        }

        let merged: Vec<FeatureRow> = table.into_values().collect();
        let meta = self.write(&merged)?;
        log::debug!(
            "{FEATURES_DAILY}: upserted {} rows, table now {} rows ({})",
            batch.len(),
            meta.row_count,
            meta.data_hash
        );
        Ok(summary)
    }

    /// Every stored row, sorted by `(ticker, date)`.
    pub fn load(&self) -> Result<Vec<FeatureRow>, StoreError> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let mut rows = frame_to_feature_rows(&self.warehouse.read(FEATURES_DAILY)?)?;
        rows.sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));
        Ok(rows)
    }

    /// Rows at the table's latest date, sorted by ticker.
    pub fn latest(&self) -> Result<Vec<FeatureRow>, StoreError> {
        Ok(latest_rows(&self.load()?))
    }

    fn write(&self, rows: &[FeatureRow]) -> Result<TableMeta, StoreError> {
        let df = feature_rows_to_frame(rows)?;
        Ok(self.warehouse.write(FEATURES_DAILY, df)?)
    }
}

/// Rows at the latest date present in `rows`, sorted by ticker.
pub fn latest_rows(rows: &[FeatureRow]) -> Vec<FeatureRow> {
    let Some(max_date) = rows.iter().map(|r| r.date).max() else {
        return Vec::new();
    };
    let mut latest: Vec<FeatureRow> = rows.iter().filter(|r| r.date == max_date).cloned().collect();
    latest.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    latest
}
