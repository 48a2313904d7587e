//! Parquet warehouse: named tables in a directory tree.
//!
//! Layout: `{root}/{schema}/{table}.parquet` with a `{table}.meta.json`
//! sidecar next to each table.
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Metadata sidecar per table (row count, columns, BLAKE3 hash, write time)
//! - Unqualified names resolve to schema `main`

use super::provider::DataError;
use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Raw fetched bars, one row per `(date, symbol)`.
pub const RAW_PRICES: &str = "raw.equity_prices";
/// Daily closes with simple returns, rebuilt from [`RAW_PRICES`].
pub const PRICES_DAILY: &str = "core.fct_prices_daily";
/// Derived features keyed by `(date, ticker)`.
pub const FEATURES_DAILY: &str = "core.feat_equity_daily";

/// Fully qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableName {
    pub schema: String,
    pub table: String,
}

impl TableName {
    /// Parse `schema.table`; a bare `table` lands in schema `main`.
    pub fn parse(full_name: &str) -> Self {
        match full_name.split_once('.') {
            Some((schema, table)) => Self {
                schema: schema.to_string(),
                table: table.to_string(),
            },
            None => Self {
                schema: "main".to_string(),
                table: full_name.to_string(),
            },
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Metadata sidecar written alongside every table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    pub table: String,
    pub row_count: usize,
    pub columns: Vec<String>,
    pub data_hash: String,
    pub written_at: NaiveDateTime,
}

/// The warehouse.
#[derive(Debug, Clone)]
pub struct Warehouse {
    root: PathBuf,
}

impl Warehouse {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the warehouse.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_path(&self, name: &TableName) -> PathBuf {
        self.root
            .join(&name.schema)
            .join(format!("{}.parquet", name.table))
    }

    fn meta_path(&self, name: &TableName) -> PathBuf {
        self.root
            .join(&name.schema)
            .join(format!("{}.meta.json", name.table))
    }

    /// Whether a table has been written.
    pub fn exists(&self, table: &str) -> bool {
        self.table_path(&TableName::parse(table)).is_file()
    }

    /// Read a whole table.
    pub fn read(&self, table: &str) -> Result<DataFrame, DataError> {
        let name = TableName::parse(table);
        let path = self.table_path(&name);
        if !path.is_file() {
            return Err(DataError::TableNotFound {
                table: name.to_string(),
            });
        }
        let file = fs::File::open(&path).map_err(|e| DataError::Io(format!("open {name}: {e}")))?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| DataError::ParquetError(format!("read {name}: {e}")))?;
        log::debug!("read {name}: {} rows", df.height());
        Ok(df)
    }

    /// Column names of a table, in stored order.
    pub fn columns(&self, table: &str) -> Result<Vec<String>, DataError> {
        let df = self.read(table)?;
        Ok(super::frames::column_names(&df))
    }

    /// Replace a table with `df`.
    ///
    /// The new contents are written to a temp file and renamed into place, so
    /// readers see either the old table or the new one, never a partial file.
    pub fn write(&self, table: &str, mut df: DataFrame) -> Result<TableMeta, DataError> {
        let name = TableName::parse(table);
        let path = self.table_path(&name);
        let tmp_path = path.with_extension("parquet.tmp");

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| DataError::Io(format!("failed to create dir: {e}")))?;
        }

        let file = fs::File::create(&tmp_path)
            .map_err(|e| DataError::Io(format!("create {}: {e}", tmp_path.display())))?;
        ParquetWriter::new(file)
            .finish(&mut df)
            .map_err(|e| DataError::ParquetError(format!("write {name}: {e}")))?;

        let bytes = fs::read(&tmp_path).map_err(|e| DataError::Io(format!("hash read: {e}")))?;
        let meta = TableMeta {
            table: name.to_string(),
            row_count: df.height(),
            columns: super::frames::column_names(&df),
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            written_at: chrono::Local::now().naive_local(),
        };

        // Stage the sidecar before swapping the table
        let meta_path = self.meta_path(&name);
        let meta_tmp = meta_path.with_extension("json.tmp");
        let staged = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::Other(format!("meta serialization: {e}")))
            .and_then(|json| {
                fs::write(&meta_tmp, json).map_err(|e| DataError::Io(format!("meta write: {e}")))
            });
        if let Err(e) = staged {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            let _ = fs::remove_file(&meta_tmp);
            DataError::Io(format!("atomic rename failed: {e}"))
        })?;

        if let Err(e) = fs::rename(&meta_tmp, &meta_path) {
            let _ = fs::remove_file(&meta_tmp);
            log::warn!("{name}: table written but metadata not updated: {e}");
        }

        log::debug!("wrote {name}: {} rows", meta.row_count);
        Ok(meta)
    }

    /// Metadata sidecar for a table, if present and parseable.
    pub fn meta(&self, table: &str) -> Option<TableMeta> {
        let content = fs::read_to_string(self.meta_path(&TableName::parse(table))).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// All tables in the warehouse, sorted by name.
    pub fn tables(&self) -> Result<Vec<TableName>, DataError> {
        let mut names = Vec::new();
        if !self.root.is_dir() {
            return Ok(names);
        }

        let schemas =
            fs::read_dir(&self.root).map_err(|e| DataError::Io(format!("read dir: {e}")))?;
        for schema_entry in schemas {
            let schema_entry = schema_entry.map_err(|e| DataError::Io(format!("dir entry: {e}")))?;
            let schema_path = schema_entry.path();
            if !schema_path.is_dir() {
                continue;
            }
            let schema = schema_entry.file_name().to_string_lossy().to_string();

            let files =
                fs::read_dir(&schema_path).map_err(|e| DataError::Io(format!("read dir: {e}")))?;
            for file in files {
                let file = file.map_err(|e| DataError::Io(format!("dir entry: {e}")))?;
                let path = file.path();
                // Skip sidecars and leftover temp files
                if path.extension().and_then(|e| e.to_str()) != Some("parquet") {
                    continue;
                }
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(TableName {
                        schema: schema.clone(),
                        table: stem.to_string(),
                    });
                }
            }
        }

        names.sort();
        Ok(names)
    }
}
