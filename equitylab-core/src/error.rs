//! Pipeline-level error taxonomy.
//!
//! Layer errors (`DataError`, `SchemaError`, `StoreError`) convert into
//! `PipelineError`, which is what the CLI maps onto exit codes.

use crate::data::provider::DataError;
use crate::features::store::StoreError;
use crate::normalize::schema::SchemaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required relation or column could not be resolved. Fatal.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The upstream source is empty or unreachable. Fatal.
    #[error("no data: {0}")]
    NoData(String),

    /// One or more blocking quality checks tripped.
    #[error("validation failure: blocking checks failed: {}", failed_checks.join(", "))]
    ValidationFailure { failed_checks: Vec<String> },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("config error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Process exit status for this error: 1 for a validation failure,
    /// 2 for anything that aborted the run.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::ValidationFailure { .. } => 1,
            _ => 2,
        }
    }
}
