//! Table-handle front end over the individual checks.
//!
//! [`QualityService`] resolves a [`TableId`] against a shared
//! [`TableStore`] and runs one operation on a snapshot of that table.
//! Profiling operations (schema inference, null rates, snapshot) answer a
//! missing table with an empty result; every other operation reports
//! [`QualityError::TableNotFound`](crate::error::QualityError::TableNotFound).

use crate::anomaly::AnomalyEngine;
use crate::cancellation::CancellationToken;
use crate::config::{AnomalyConfig, ProfileConfig};
use crate::error::Result;
use crate::imputers::NullFiller;
use crate::profiler::DataProfiler;
use crate::reporting::{QualityReport, ReportGenerator};
use crate::table::{TableId, TableStore};
use crate::types::{
    AnomalyRecord, AnomalyScore, ColumnFillReport, DeclaredSchema, FillValues, InferredSchema,
    NullRates, Record, SchemaCheck,
};
use crate::validation::SchemaValidator;
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct QualityService {
    store: Arc<TableStore>,
    anomaly: AnomalyConfig,
    profile: ProfileConfig,
    cancellation: Option<CancellationToken>,
}

static_assertions::assert_impl_all!(QualityService: Send, Sync);

impl QualityService {
    pub fn new(store: Arc<TableStore>) -> Self {
        Self {
            store,
            anomaly: AnomalyConfig::default(),
            profile: ProfileConfig::default(),
            cancellation: None,
        }
    }

    pub fn with_anomaly_config(mut self, config: AnomalyConfig) -> Self {
        self.anomaly = config;
        self
    }

    pub fn with_profile_config(mut self, config: ProfileConfig) -> Self {
        self.profile = config;
        self
    }

    /// Attach a token that aborts anomaly detection.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn store(&self) -> &Arc<TableStore> {
        &self.store
    }

    pub fn detect_anomalies(&self, id: &TableId) -> Result<Vec<AnomalyRecord>> {
        let df = self.store.get(id)?;
        self.engine().detect_anomalies(&df)
    }

    pub fn anomaly_scores(&self, id: &TableId) -> Result<Vec<AnomalyScore>> {
        let df = self.store.get(id)?;
        self.engine().anomaly_scores(&df)
    }

    pub fn infer_schema(&self, id: &TableId) -> InferredSchema {
        self.table_or_empty(id, |df| {
            DataProfiler::infer_schema(df, self.profile.schema_sample_rows)
        })
    }

    pub fn validate_schema(&self, id: &TableId, declared: &DeclaredSchema) -> Result<Vec<SchemaCheck>> {
        let df = self.store.get(id)?;
        Ok(SchemaValidator::validate(&df, declared))
    }

    pub fn null_rates(&self, id: &TableId) -> NullRates {
        self.table_or_empty(id, DataProfiler::null_rates)
    }

    /// Fill missing values and keep the filled copy in the store, where it
    /// can be exported with [`TableStore::export_filled`].
    pub fn fill_nulls(&self, id: &TableId, values: &FillValues) -> Result<Vec<ColumnFillReport>> {
        let df = self.store.get(id)?;
        let filled = NullFiller::fill_nulls(&df, values)?;
        self.store.store_filled(id, filled.table)?;
        Ok(filled.report)
    }

    pub fn snapshot(&self, id: &TableId) -> Vec<Record> {
        self.table_or_empty(id, |df| DataProfiler::snapshot(df, self.profile.snapshot_rows))
    }

    pub fn run_checks(&self, id: &TableId, declared: Option<&DeclaredSchema>) -> Result<QualityReport> {
        let df = self.store.get(id)?;
        let mut generator = ReportGenerator::new(self.anomaly.clone(), self.profile.clone());
        if let Some(token) = &self.cancellation {
            generator = generator.with_cancellation(token.clone());
        }
        generator.run_checks(&df, declared)
    }

    fn engine(&self) -> AnomalyEngine {
        let engine = AnomalyEngine::new(self.anomaly.clone());
        match &self.cancellation {
            Some(token) => engine.with_cancellation(token.clone()),
            None => engine,
        }
    }

    fn table_or_empty<T: Default>(&self, id: &TableId, op: impl FnOnce(&DataFrame) -> T) -> T {
        match self.store.get(id) {
            Ok(df) => op(&df),
            Err(e) => {
                debug!("{}; returning empty result", e);
                T::default()
            }
        }
    }
}
