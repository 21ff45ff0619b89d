//! Collaborators the engine consumes
//!
//! The engine owns no data. Metric values, variables and variable periods
//! all come through the async traits below, supplied by the host. The
//! in-memory implementations back the CLI and the tests.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::warn;

use crate::error::{CalcError, CalcResult};
use crate::types::{DashboardVariable, DateRange, VariablePeriod};

/// Key prefix that namespaces custom fields inside the metric channel
pub const CUSTOM_FIELD_PREFIX: &str = "custom_field_";

pub fn custom_field_key(id: &str) -> String {
    format!("{CUSTOM_FIELD_PREFIX}{id}")
}

/// Fetch a metric value for the caller's current reporting window
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch_metric(&self, key: &str) -> CalcResult<f64>;
}

/// Fetch a metric value for an explicit window (one day in a time series)
#[async_trait]
pub trait DailyMetricSource: Send + Sync {
    async fn fetch_for_day(&self, key: &str, day: &DateRange) -> CalcResult<f64>;
}

/// Read access to dashboard variables and their periods
#[async_trait]
pub trait VariableStore: Send + Sync {
    async fn get_variable(&self, id: &str) -> CalcResult<Option<DashboardVariable>>;
    async fn get_periods(&self, variable_id: &str) -> CalcResult<Vec<VariablePeriod>>;
}

/// Treats every failed fetch as 0.
///
/// The engine itself never swallows errors; wrap a source in this adapter
/// when a chart should keep rendering through a flaky backend.
#[derive(Debug, Clone)]
pub struct ZeroOnError<S>(pub S);

#[async_trait]
impl<S: MetricSource> MetricSource for ZeroOnError<S> {
    async fn fetch_metric(&self, key: &str) -> CalcResult<f64> {
        match self.0.fetch_metric(key).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key, error = %e, "metric fetch failed, using 0");
                Ok(0.0)
            }
        }
    }
}

#[async_trait]
impl<S: DailyMetricSource> DailyMetricSource for ZeroOnError<S> {
    async fn fetch_for_day(&self, key: &str, day: &DateRange) -> CalcResult<f64> {
        match self.0.fetch_for_day(key, day).await {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key, day = %day, error = %e, "metric fetch failed, using 0");
                Ok(0.0)
            }
        }
    }
}

/// Binds a daily source to one window so it can serve scalar evaluation
pub struct ScopedMetrics<'a, S: ?Sized> {
    source: &'a S,
    range: DateRange,
}

impl<'a, S: DailyMetricSource + ?Sized> ScopedMetrics<'a, S> {
    pub fn new(source: &'a S, range: DateRange) -> Self {
        Self { source, range }
    }
}

#[async_trait]
impl<'a, S: DailyMetricSource + ?Sized> MetricSource for ScopedMetrics<'a, S> {
    async fn fetch_metric(&self, key: &str) -> CalcResult<f64> {
        self.source.fetch_for_day(key, &self.range).await
    }
}

//==============================================================================
// In-memory implementations
//==============================================================================

#[derive(Debug, Clone, Default)]
pub struct InMemoryVariables {
    variables: HashMap<String, DashboardVariable>,
    periods: HashMap<String, Vec<VariablePeriod>>,
}

impl InMemoryVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, variable: DashboardVariable) {
        self.variables.insert(variable.id.clone(), variable);
    }

    pub fn add_period(&mut self, period: VariablePeriod) {
        self.periods
            .entry(period.variable_id.clone())
            .or_default()
            .push(period);
    }

    pub fn with_variable(mut self, variable: DashboardVariable) -> Self {
        self.add_variable(variable);
        self
    }

    pub fn with_period(mut self, period: VariablePeriod) -> Self {
        self.add_period(period);
        self
    }
}

#[async_trait]
impl VariableStore for InMemoryVariables {
    async fn get_variable(&self, id: &str) -> CalcResult<Option<DashboardVariable>> {
        Ok(self.variables.get(id).cloned())
    }

    async fn get_periods(&self, variable_id: &str) -> CalcResult<Vec<VariablePeriod>> {
        Ok(self.periods.get(variable_id).cloned().unwrap_or_default())
    }
}

/// Static metric values: a total per key and/or a value per key per day.
///
/// A window query sums the daily values that fall inside the window. Keys
/// without daily data answer with their total; unknown keys are an error,
/// mirroring a backend that does not know the metric. When a key has daily
/// data, that data wins over any total set for it, for windowed and
/// unscoped fetches alike.
#[derive(Debug, Clone, Default)]
pub struct SnapshotMetrics {
    totals: HashMap<String, f64>,
    daily: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl SnapshotMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total(&mut self, key: impl Into<String>, value: f64) {
        self.totals.insert(key.into(), value);
    }

    pub fn set_daily(&mut self, key: impl Into<String>, day: NaiveDate, value: f64) {
        self.daily.entry(key.into()).or_default().insert(day, value);
    }

    pub fn with_total(mut self, key: impl Into<String>, value: f64) -> Self {
        self.set_total(key, value);
        self
    }

    pub fn with_daily(mut self, key: impl Into<String>, day: NaiveDate, value: f64) -> Self {
        self.set_daily(key, day, value);
        self
    }

    fn total(&self, key: &str) -> CalcResult<f64> {
        if let Some(days) = self.daily.get(key) {
            return Ok(days.values().sum());
        }
        self.totals
            .get(key)
            .copied()
            .ok_or_else(|| CalcError::fetch(key, "unknown metric"))
    }

    fn in_range(&self, key: &str, range: &DateRange) -> CalcResult<f64> {
        match self.daily.get(key) {
            Some(days) => Ok(days.range(range.start()..=range.end()).map(|(_, v)| v).sum()),
            None => self.total(key),
        }
    }
}

#[async_trait]
impl MetricSource for SnapshotMetrics {
    async fn fetch_metric(&self, key: &str) -> CalcResult<f64> {
        self.total(key)
    }
}

#[async_trait]
impl DailyMetricSource for SnapshotMetrics {
    async fn fetch_for_day(&self, key: &str, day: &DateRange) -> CalcResult<f64> {
        self.in_range(key, day)
    }
}
