//! The individual data-quality checks.
//!
//! Each check is a pure function over rows already read from the warehouse and
//! returns a `CheckResult`: a named report plus whether it blocks the run.

use crate::calendar::{business_days_between, is_weekday, weekdays_inclusive};
use crate::domain::SourceRow;
use crate::normalize::ticker_date_order;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

pub const NULLS_IN_PRICES: &str = "nulls_in_prices";
pub const DUPE_KEYS_PRICES: &str = "dupe_keys_prices";
pub const DATE_GAPS_PRICES: &str = "date_gaps_prices";
pub const NULLS_IN_FEATURES: &str = "nulls_in_features";
pub const FRESHNESS_CHECK: &str = "freshness_check";

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub name: &'static str,
    pub blocking: bool,
    pub detail: CheckDetail,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckDetail {
    PriceNulls(PriceNulls),
    DupeKeys { n_dupes: usize },
    DateGaps(Vec<GapRow>),
    /// `None` when the feature table does not exist.
    FeatureNulls(Option<FeatureNulls>),
    Freshness {
        max_date: Option<NaiveDate>,
        business_days_since_max_date: Option<i64>,
        threshold: i64,
    },
}

/// Null breakdown of the price relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceNulls {
    pub null_date: usize,
    pub null_ticker: usize,
    /// `None` when the relation has no close column.
    pub null_close: Option<usize>,
    pub null_ret_1d_excl_first: usize,
    /// Expected: each ticker's first row has no prior close.
    pub null_ret_1d_first_rows: usize,
}

impl PriceNulls {
    pub fn is_blocking(&self) -> bool {
        self.null_date > 0
            || self.null_ticker > 0
            || self.null_close.unwrap_or(0) > 0
            || self.null_ret_1d_excl_first > 0
    }
}

/// Weekday coverage of one ticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapRow {
    pub ticker: String,
    pub min_d: NaiveDate,
    pub max_d: NaiveDate,
    pub have_days: i64,
    pub missing_weekdays_estimate: i64,
}

/// Null counts per feature column; `None` for a column the table lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureNulls {
    pub null_rsi: Option<usize>,
    pub null_mom: Option<usize>,
    pub null_vol: Option<usize>,
}

/// Null counts in the price relation.
///
/// A missing `ret_1d` is expected only on the first row of each ticker, with
/// rows numbered by date and null dates numbered last.
pub fn nulls_in_prices(rows: &[SourceRow], has_close: bool) -> CheckResult {
    let mut nulls = PriceNulls {
        null_close: has_close.then_some(0),
        ..PriceNulls::default()
    };

    let mut prev_ticker: Option<&Option<String>> = None;
    for idx in ticker_date_order(rows) {
        let row = &rows[idx];
        let first = prev_ticker != Some(&row.ticker);
        prev_ticker = Some(&row.ticker);

        if row.date.is_none() {
            nulls.null_date += 1;
        }
        if row.ticker.is_none() {
            nulls.null_ticker += 1;
        }
        if let Some(n) = nulls.null_close.as_mut() {
            if row.close.is_none() {
                *n += 1;
            }
        }
        if row.ret_1d.is_none() {
            if first {
                nulls.null_ret_1d_first_rows += 1;
            } else {
                nulls.null_ret_1d_excl_first += 1;
            }
        }
    }

    CheckResult {
        name: NULLS_IN_PRICES,
        blocking: nulls.is_blocking(),
        detail: CheckDetail::PriceNulls(nulls),
    }
}

/// Number of `(date, ticker)` keys that occur more than once.
pub fn dupe_keys_prices(rows: &[SourceRow]) -> CheckResult {
    let mut counts: HashMap<(Option<NaiveDate>, Option<&str>), usize> = HashMap::new();
    for row in rows {
        *counts.entry((row.date, row.ticker.as_deref())).or_default() += 1;
    }
    let n_dupes = counts.values().filter(|&&c| c > 1).count();

    CheckResult {
        name: DUPE_KEYS_PRICES,
        blocking: n_dupes > 0,
        detail: CheckDetail::DupeKeys { n_dupes },
    }
}

/// Per-ticker weekday coverage, worst `limit` tickers first. Informational.
pub fn date_gaps_prices(rows: &[SourceRow], limit: usize) -> CheckResult {
    let mut spans: BTreeMap<&str, (NaiveDate, NaiveDate, BTreeSet<NaiveDate>)> = BTreeMap::new();
    for row in rows {
        let (Some(date), Some(ticker)) = (row.date, row.ticker.as_deref()) else {
            continue;
        };
        let entry = spans
            .entry(ticker)
            .or_insert_with(|| (date, date, BTreeSet::new()));
        entry.0 = entry.0.min(date);
        entry.1 = entry.1.max(date);
        if is_weekday(date) {
            entry.2.insert(date);
        }
    }

    let mut gaps: Vec<GapRow> = spans
        .into_iter()
        .map(|(ticker, (min_d, max_d, have))| {
            let have_days = have.len() as i64;
            GapRow {
                ticker: ticker.to_string(),
                min_d,
                max_d,
                have_days,
                missing_weekdays_estimate: weekdays_inclusive(min_d, max_d) - have_days,
            }
        })
        .collect();
    gaps.sort_by(|a, b| {
        b.missing_weekdays_estimate
            .cmp(&a.missing_weekdays_estimate)
            .then_with(|| a.ticker.cmp(&b.ticker))
    });
    gaps.truncate(limit);

    CheckResult {
        name: DATE_GAPS_PRICES,
        blocking: false,
        detail: CheckDetail::DateGaps(gaps),
    }
}

/// Null counts in the feature table. Informational.
pub fn nulls_in_features(nulls: Option<FeatureNulls>) -> CheckResult {
    CheckResult {
        name: NULLS_IN_FEATURES,
        blocking: false,
        detail: CheckDetail::FeatureNulls(nulls),
    }
}

/// Weekdays strictly between the latest price date and `today`.
///
/// Blocks when the gap exceeds `threshold`, or when no row carries a date.
pub fn freshness_check(rows: &[SourceRow], today: NaiveDate, threshold: i64) -> CheckResult {
    let max_date = rows.iter().filter_map(|r| r.date).max();
    let since = max_date.map(|d| business_days_between(d, today));

    CheckResult {
        name: FRESHNESS_CHECK,
        blocking: since.map_or(true, |b| b > threshold),
        detail: CheckDetail::Freshness {
            max_date,
            business_days_since_max_date: since,
            threshold,
        },
    }
}

fn count_or_dash(v: Option<usize>) -> String {
    v.map_or_else(|| "-".to_string(), |n| n.to_string())
}

impl fmt::Display for CheckDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckDetail::PriceNulls(n) => {
                writeln!(
                    f,
                    "{:>10} {:>12} {:>11} {:>23} {:>23}",
                    "null_date", "null_ticker", "null_close", "null_ret_1d_excl_first", "null_ret_1d_first_rows"
                )?;
                write!(
                    f,
                    "{:>10} {:>12} {:>11} {:>23} {:>23}",
                    n.null_date,
                    n.null_ticker,
                    count_or_dash(n.null_close),
                    n.null_ret_1d_excl_first,
                    n.null_ret_1d_first_rows
                )
            }
            CheckDetail::DupeKeys { n_dupes } => {
                writeln!(f, "{:>8}", "n_dupes")?;
                write!(f, "{n_dupes:>8}")
            }
            CheckDetail::DateGaps(rows) => {
                if rows.is_empty() {
                    return write!(f, "(no dated rows)");
                }
                write!(
                    f,
                    "{:<8} {:<12} {:<12} {:>9} {:>26}",
                    "ticker", "min_d", "max_d", "have_days", "missing_weekdays_estimate"
                )?;
                for r in rows {
                    write!(
                        f,
                        "\n{:<8} {:<12} {:<12} {:>9} {:>26}",
                        r.ticker,
                        r.min_d.to_string(),
                        r.max_d.to_string(),
                        r.have_days,
                        r.missing_weekdays_estimate
                    )?;
                }
                Ok(())
            }
            CheckDetail::FeatureNulls(None) => write!(f, "skipped (feature table not found)"),
            CheckDetail::FeatureNulls(Some(n)) => {
                writeln!(f, "{:>9} {:>9} {:>9}", "null_rsi", "null_mom", "null_vol")?;
                write!(
                    f,
                    "{:>9} {:>9} {:>9}",
                    count_or_dash(n.null_rsi),
                    count_or_dash(n.null_mom),
                    count_or_dash(n.null_vol)
                )
            }
            CheckDetail::Freshness {
                max_date,
                business_days_since_max_date,
                threshold,
            } => {
                let max_date = max_date.map_or_else(|| "-".to_string(), |d| d.to_string());
                let since = business_days_since_max_date
                    .map_or_else(|| "-".to_string(), |b| b.to_string());
                writeln!(
                    f,
                    "{:<12} {:>28} {:>10}",
                    "max_date", "business_days_since_max_date", "threshold"
                )?;
                write!(f, "{max_date:<12} {since:>28} {threshold:>10}")
            }
        }
    }
}
