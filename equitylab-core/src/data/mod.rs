//! Data layer: providers, warehouse tables, ingestion.

pub mod csv_import;
pub mod frames;
pub mod ingest;
pub mod provider;
pub mod warehouse;
pub mod yahoo;

pub use csv_import::CsvImport;
pub use ingest::{build_prices_daily, ingest_prices, BuildSummary, IngestSummary};
pub use provider::{DataError, DataProvider, DataSource, IngestProgress, NoProgress, StdoutProgress};
pub use warehouse::{TableMeta, TableName, Warehouse, FEATURES_DAILY, PRICES_DAILY, RAW_PRICES};
pub use yahoo::YahooProvider;
