//! Source schema resolution.
//!
//! Price relations come from more than one writer, so identifier and close
//! columns may be spelled differently. Resolution maps the stored names onto
//! canonical roles once, against a fixed alias vocabulary, and fails with a
//! single `SchemaError` instead of probing at use time.

use crate::data::warehouse::{Warehouse, PRICES_DAILY, RAW_PRICES};
use thiserror::Error;

/// Accepted identifier column names, in priority order.
pub const TICKER_ALIASES: [&str; 4] = ["ticker", "symbol", "Ticker", "SYMBOL"];
/// Accepted close column names, in priority order.
pub const CLOSE_ALIASES: [&str; 2] = ["close", "Close"];
pub const DATE_COLUMN: &str = "date";
pub const RETURN_COLUMN: &str = "ret_1d";
/// Candidate price relations, in priority order.
pub const SOURCE_RELATIONS: [&str; 2] = [PRICES_DAILY, RAW_PRICES];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no price relation found (looked for {})", candidates.join(", "))]
    NoSourceRelation { candidates: Vec<String> },

    #[error("'{relation}' is missing a {column} column")]
    MissingColumn { relation: String, column: String },

    #[error("column '{column}' in '{relation}' has an unusable type: {detail}")]
    TypeMismatch {
        relation: String,
        column: String,
        detail: String,
    },
}

/// Canonical column mapping for one price relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSchema {
    pub relation: String,
    pub date: String,
    pub ticker: String,
    pub close: Option<String>,
    pub ret_1d: Option<String>,
}

fn pick(columns: &[String], aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .find(|alias| columns.iter().any(|c| c == *alias))
        .map(|alias| alias.to_string())
}

impl SourceSchema {
    /// Resolve canonical roles from a relation's column names.
    ///
    /// Date and identifier are mandatory; close and return are optional here
    /// and enforced by the callers that need them.
    pub fn resolve(relation: &str, columns: &[String]) -> Result<Self, SchemaError> {
        let missing = |column: &str| SchemaError::MissingColumn {
            relation: relation.to_string(),
            column: column.to_string(),
        };

        let date = pick(columns, &[DATE_COLUMN]).ok_or_else(|| missing("'date'"))?;
        let ticker = pick(columns, &TICKER_ALIASES)
            .ok_or_else(|| missing(&format!("ticker ({})", TICKER_ALIASES.join("|"))))?;

        Ok(Self {
            relation: relation.to_string(),
            date,
            ticker,
            close: pick(columns, &CLOSE_ALIASES),
            ret_1d: pick(columns, &[RETURN_COLUMN]),
        })
    }

    /// The close column, or a `SchemaError` when the relation has none.
    pub fn require_close(&self) -> Result<&str, SchemaError> {
        self.close
            .as_deref()
            .ok_or_else(|| SchemaError::MissingColumn {
                relation: self.relation.clone(),
                column: format!("close ({})", CLOSE_ALIASES.join("|")),
            })
    }
}

/// First candidate relation present in the warehouse.
pub fn pick_source_relation(warehouse: &Warehouse) -> Result<&'static str, SchemaError> {
    SOURCE_RELATIONS
        .iter()
        .copied()
        .find(|r| warehouse.exists(r))
        .ok_or_else(|| SchemaError::NoSourceRelation {
            candidates: SOURCE_RELATIONS.iter().map(|s| s.to_string()).collect(),
        })
}
