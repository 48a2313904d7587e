//! Data-quality gate over the price relation and the feature table.
//!
//! `run_checks` always runs all five checks and returns the full report; the
//! caller decides what a failed report means (the CLI exits with status 1).

pub mod checks;

pub use checks::{CheckDetail, CheckResult, FeatureNulls, GapRow, PriceNulls};

use crate::config::PipelineConfig;
use crate::data::warehouse::{Warehouse, FEATURES_DAILY};
use crate::error::PipelineError;
use crate::normalize::{self, SourceFrame};
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use std::fmt;

/// Results of every check against one source relation.
#[derive(Debug, Clone)]
pub struct QualityReport {
    pub source: String,
    pub columns: Vec<String>,
    pub checks: Vec<CheckResult>,
}

impl QualityReport {
    /// True when no check is blocking.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| !c.blocking)
    }

    /// Names of the blocking checks, in run order.
    pub fn failed_checks(&self) -> Vec<String> {
        self.checks
            .iter()
            .filter(|c| c.blocking)
            .map(|c| c.name.to_string())
            .collect()
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// `Ok(self)` when passed, otherwise `ValidationFailure` naming the blocking checks.
    pub fn into_result(self) -> Result<Self, PipelineError> {
        if self.passed() {
            Ok(self)
        } else {
            Err(PipelineError::ValidationFailure {
                failed_checks: self.failed_checks(),
            })
        }
    }
}

impl fmt::Display for QualityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Using source table: {}", self.source)?;
        writeln!(f, "Detected columns: {}", self.columns.join(", "))?;
        for check in &self.checks {
            let tag = if check.blocking { "  [BLOCKING]" } else { "" };
            writeln!(f, "\n--- {}{tag} ---", check.name)?;
            writeln!(f, "{}", check.detail)?;
        }
        if self.passed() {
            write!(f, "\nChecks passed (or only informational warnings).")
        } else {
            write!(
                f,
                "\nHARD FAIL: blocking checks: {}",
                self.failed_checks().join(", ")
            )
        }
    }
}

/// Run all checks on a loaded source frame.
pub fn check_source(
    frame: &SourceFrame,
    features: Option<FeatureNulls>,
    today: NaiveDate,
    config: &PipelineConfig,
) -> QualityReport {
    let rows = &frame.rows;
    let checks = vec![
        checks::nulls_in_prices(rows, frame.schema.close.is_some()),
        checks::dupe_keys_prices(rows),
        checks::date_gaps_prices(rows, config.gap_report_limit),
        checks::nulls_in_features(features),
        checks::freshness_check(rows, today, config.freshness_max_business_days),
    ];

    for c in checks.iter().filter(|c| c.blocking) {
        log::warn!("quality check {} is blocking", c.name);
    }

    QualityReport {
        source: frame.schema.relation.clone(),
        columns: frame.columns.clone(),
        checks,
    }
}

/// Null counts for whichever feature columns the table has.
pub fn feature_nulls(df: &DataFrame) -> FeatureNulls {
    let nulls = |name: &str| df.column(name).ok().map(|c| c.null_count());
    FeatureNulls {
        null_rsi: nulls("rsi_14"),
        null_mom: nulls("momentum_10d"),
        null_vol: nulls("vol_21d"),
    }
}

/// Load the source relation and feature table and run every check.
///
/// Fails only when the checks cannot run at all (no relation, no date or
/// ticker column, unreadable table). Blocking checks are reported, not
/// raised.
pub fn run_checks(
    warehouse: &Warehouse,
    today: NaiveDate,
    config: &PipelineConfig,
) -> Result<QualityReport, PipelineError> {
    let frame = normalize::load_source(warehouse)?;

    let features = if warehouse.exists(FEATURES_DAILY) {
        Some(feature_nulls(&warehouse.read(FEATURES_DAILY)?))
    } else {
        log::warn!("{FEATURES_DAILY} not found; skipping feature null check");
        None
    };

    let report = check_source(&frame, features, today, config);
    log::info!(
        "quality: {} checks on {}, {}",
        report.checks.len(),
        report.source,
        if report.passed() { "passed" } else { "failed" }
    );
    Ok(report)
}
