//! Price normalizer.
//!
//! Turns whichever price relation the warehouse holds into the canonical
//! per-`(ticker, date)` series of `(close, ret_1d)`:
//!
//! 1. pick the source relation and resolve its schema (`schema`)
//! 2. read it as optional-valued `SourceRow`s, computing `ret_1d` when the
//!    relation has no return column (`load_source`)
//! 3. drop incomplete rows and duplicate keys, sort by `(ticker, date)`
//!    (`canonical_series`)
//!
//! The quality checker works on step 2's output so it can see the nulls that
//! step 3 drops.

pub mod schema;

use crate::data::frames::{read_dates, read_f64s, read_strings};
use crate::data::provider::DataError;
use crate::data::warehouse::Warehouse;
use crate::domain::price::simple_return;
use crate::domain::{PriceRow, SourceRow};
use crate::error::PipelineError;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use schema::{pick_source_relation, SchemaError, SourceSchema};
use std::collections::HashSet;

/// A resolved price relation.
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub schema: SourceSchema,
    /// Column names as stored.
    pub columns: Vec<String>,
    pub rows: Vec<SourceRow>,
    /// True when `ret_1d` was derived here rather than read from the relation.
    pub returns_computed: bool,
}

/// The canonical series plus what was discarded to get there.
#[derive(Debug, Clone, Default)]
pub struct CanonicalSeries {
    pub rows: Vec<PriceRow>,
    pub dropped_incomplete: usize,
    pub dropped_duplicates: usize,
}

/// Load the preferred price relation from the warehouse.
pub fn load_source(warehouse: &Warehouse) -> Result<SourceFrame, PipelineError> {
    let relation = pick_source_relation(warehouse)?;
    let df = warehouse.read(relation)?;
    let frame = source_from_frame(relation, &df)?;
    log::info!(
        "loaded {} rows from {relation} (ticker column '{}'{})",
        frame.rows.len(),
        frame.schema.ticker,
        if frame.returns_computed {
            ", returns computed"
        } else {
            ""
        }
    );
    Ok(frame)
}

/// Resolve and read a price relation held in memory.
pub fn source_from_frame(relation: &str, df: &DataFrame) -> Result<SourceFrame, PipelineError> {
    let columns = crate::data::frames::column_names(df);
    let schema = SourceSchema::resolve(relation, &columns)?;

    if df.height() == 0 {
        return Err(PipelineError::NoData(format!("{relation} is empty")));
    }

    let type_err = |column: &str| {
        let relation = relation.to_string();
        let column = column.to_string();
        move |e: DataError| SchemaError::TypeMismatch {
            relation,
            column,
            detail: e.to_string(),
        }
    };

    let dates = read_dates(df, &schema.date).map_err(type_err(&schema.date))?;
    let tickers = read_strings(df, &schema.ticker).map_err(type_err(&schema.ticker))?;
    let closes = match &schema.close {
        Some(c) => read_f64s(df, c).map_err(type_err(c))?,
        None => vec![None; df.height()],
    };
    let returns = match &schema.ret_1d {
        Some(c) => Some(read_f64s(df, c).map_err(type_err(c))?),
        None => None,
    };

    let mut rows: Vec<SourceRow> = (0..df.height())
        .map(|i| SourceRow {
            date: dates[i],
            ticker: tickers[i].clone(),
            close: closes[i].filter(|v| v.is_finite()),
            ret_1d: returns.as_ref().and_then(|r| r[i]).filter(|v| v.is_finite()),
        })
        .collect();

    let returns_computed = returns.is_none();
    if returns_computed {
        fill_returns(&mut rows);
    }

    Ok(SourceFrame {
        schema,
        columns,
        rows,
        returns_computed,
    })
}

/// Row indices ordered by ticker, then date with null dates last, then input order.
pub(crate) fn ticker_date_order(rows: &[SourceRow]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&rows[a], &rows[b]);
        ra.ticker
            .cmp(&rb.ticker)
            .then(ra.date.is_none().cmp(&rb.date.is_none()))
            .then(ra.date.cmp(&rb.date))
            .then(a.cmp(&b))
    });
    order
}

/// Derive `ret_1d` from the preceding row of the same ticker.
fn fill_returns(rows: &mut [SourceRow]) {
    let order = ticker_date_order(rows);
    let mut prev: Option<usize> = None;
    for &idx in &order {
        let ret = match prev {
            Some(p) if rows[p].ticker == rows[idx].ticker => match (rows[p].close, rows[idx].close) {
                (Some(a), Some(b)) => simple_return(a, b),
                _ => None,
            },
            _ => None,
        };
        rows[idx].ret_1d = ret;
        prev = Some(idx);
    }
}

/// Recompute `ret_1d` along a `(ticker, date)`-sorted series.
fn chain_returns(rows: &mut [PriceRow]) {
    for i in 0..rows.len() {
        let ret = match i.checked_sub(1).map(|p| &rows[p]) {
            Some(prev) if prev.ticker == rows[i].ticker => simple_return(prev.close, rows[i].close),
            _ => None,
        };
        rows[i].ret_1d = ret;
    }
}

/// Build the canonical `(ticker, date)`-sorted series from a source frame.
///
/// Computed returns are rebuilt over the kept rows, so each `ret_1d` refers
/// to the preceding canonical close.
///
/// The close column is mandatory here. Rows missing a date, ticker or close
/// are dropped, and so is every repeat of a `(date, ticker)` key after its
/// first occurrence in input order.
pub fn canonical_series(frame: &SourceFrame) -> Result<CanonicalSeries, SchemaError> {
    frame.schema.require_close()?;

    let mut seen: HashSet<(NaiveDate, &str)> = HashSet::new();
    let mut out = CanonicalSeries::default();

    for row in &frame.rows {
        let (Some(date), Some(ticker), Some(close)) = (row.date, row.ticker.as_deref(), row.close)
        else {
            out.dropped_incomplete += 1;
            continue;
        };
        if !seen.insert((date, ticker)) {
            out.dropped_duplicates += 1;
            continue;
        }
        out.rows.push(PriceRow::new(date, ticker, close, row.ret_1d));
    }

    out.rows
        .sort_by(|a, b| a.ticker.cmp(&b.ticker).then(a.date.cmp(&b.date)));
    if frame.returns_computed {
        chain_returns(&mut out.rows);
    }

    if out.dropped_incomplete > 0 {
        log::warn!(
            "{}: dropped {} rows missing date, ticker or close",
            frame.schema.relation,
            out.dropped_incomplete
        );
    }
    if out.dropped_duplicates > 0 {
        log::warn!(
            "{}: dropped {} duplicate (date, ticker) rows",
            frame.schema.relation,
            out.dropped_duplicates
        );
    }

    Ok(out)
}

/// Load and canonicalize in one step.
pub fn load_prices(warehouse: &Warehouse) -> Result<Vec<PriceRow>, PipelineError> {
    let frame = load_source(warehouse)?;
    Ok(canonical_series(&frame)?.rows)
}
