//! In-memory registry of loaded tables and their filled copies.

use super::loader::TableLoader;
use crate::error::{QualityError, Result};
use chrono::Local;
use indexmap::IndexMap;
use parking_lot::RwLock;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Handle of a table held by a [`TableStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableId(String);

impl TableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TableId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Metadata about a stored table, computed once when it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub id: TableId,
    /// Where the table came from: a file path, or `None` for uploads.
    pub source: Option<String>,
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub loaded_at: String,
}

impl TableInfo {
    fn describe(id: TableId, source: Option<String>, df: &DataFrame) -> Self {
        Self {
            id,
            source,
            rows: df.height(),
            columns: df.width(),
            column_names: df
                .get_column_names()
                .into_iter()
                .map(|n| n.to_string())
                .collect(),
            loaded_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// A table together with its cached metadata.
#[derive(Debug, Clone)]
struct LoadedTable {
    df: DataFrame,
    info: TableInfo,
}

/// Thread-safe registry of tables keyed by [`TableId`].
///
/// Readers get a clone of the stored `DataFrame`; the clone shares its
/// column buffers, so operations never hold a lock while they run. Storing
/// a table under an existing id replaces it and discards its filled copy.
#[derive(Debug, Default)]
pub struct TableStore {
    tables: RwLock<IndexMap<TableId, LoadedTable>>,
    filled: RwLock<IndexMap<TableId, DataFrame>>,
}

static_assertions::assert_impl_all!(TableStore: Send, Sync);

impl TableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `df` under `id`, replacing any previous table.
    pub fn insert(&self, id: impl Into<TableId>, df: DataFrame, source: Option<String>) -> TableInfo {
        let id = id.into();
        let info = TableInfo::describe(id.clone(), source, &df);

        self.filled.write().shift_remove(&id);
        let replaced = self
            .tables
            .write()
            .insert(id.clone(), LoadedTable { df, info: info.clone() })
            .is_some();

        debug!(
            "{} table '{}' ({} rows, {} columns)",
            if replaced { "Replaced" } else { "Stored" },
            id,
            info.rows,
            info.columns
        );
        info
    }

    /// Read a CSV file and store it under `id`.
    pub fn load_csv(&self, id: impl Into<TableId>, path: impl AsRef<Path>) -> Result<TableInfo> {
        let path = path.as_ref();
        let df = TableLoader::read_csv(path)?;
        Ok(self.insert(id, df, Some(path.display().to_string())))
    }

    /// Parse uploaded CSV bytes and store them under `id`, overwriting any
    /// previous table with that id.
    pub fn upload_csv(&self, id: impl Into<TableId>, bytes: &[u8]) -> Result<TableInfo> {
        let id = id.into();
        let df = TableLoader::read_csv_bytes(bytes)?;
        info!("Uploaded table '{}' ({} bytes)", id, bytes.len());
        Ok(self.insert(id, df, None))
    }

    /// The table stored under `id`.
    pub fn get(&self, id: &TableId) -> Result<DataFrame> {
        self.tables
            .read()
            .get(id)
            .map(|t| t.df.clone())
            .ok_or_else(|| QualityError::TableNotFound(id.to_string()))
    }

    pub fn info(&self, id: &TableId) -> Option<TableInfo> {
        self.tables.read().get(id).map(|t| t.info.clone())
    }

    pub fn contains(&self, id: &TableId) -> bool {
        self.tables.read().contains_key(id)
    }

    /// Remove a table and its filled copy. Returns whether it existed.
    pub fn remove(&self, id: &TableId) -> bool {
        self.filled.write().shift_remove(id);
        self.tables.write().shift_remove(id).is_some()
    }

    /// Ids of every stored table, in insertion order.
    pub fn ids(&self) -> Vec<TableId> {
        self.tables.read().keys().cloned().collect()
    }

    /// Keep the filled copy of table `id`.
    pub fn store_filled(&self, id: &TableId, df: DataFrame) -> Result<()> {
        if !self.contains(id) {
            return Err(QualityError::TableNotFound(id.to_string()));
        }
        self.filled.write().insert(id.clone(), df);
        Ok(())
    }

    /// The most recent filled copy of table `id`.
    pub fn filled(&self, id: &TableId) -> Result<DataFrame> {
        self.filled
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| QualityError::TableNotFound(format!("{} (filled)", id)))
    }

    /// Write the filled copy of table `id` to `path` as CSV.
    pub fn export_filled(&self, id: &TableId, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.filled(id)?;
        TableLoader::write_csv(&mut df, path)
    }
}
