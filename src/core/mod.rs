//! Calculation engine for dashboard formulas

mod evaluator;
mod timeseries;
pub mod validator;
pub mod variables;

use std::sync::Arc;

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::CalcResult;
use crate::source::{DailyMetricSource, MetricSource, VariableStore};
use crate::types::{CalculationNode, DashboardVariable, DateRange, SeriesPoint};

use evaluator::{evaluate, EvalContext};

pub use validator::{validate, Validation};
pub use variables::resolve_variable_value;

/// Entry point for evaluating calculated metrics.
///
/// Holds the variable store and engine settings; metric sources are passed
/// per call because they are usually scoped to a request.
#[derive(Clone)]
pub struct Engine {
    variables: Arc<dyn VariableStore>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(variables: Arc<dyn VariableStore>, config: EngineConfig) -> Self {
        Self { variables, config }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn validate(&self, node: Option<&CalculationNode>) -> Validation {
        validate(node)
    }

    /// Single value, outside any reporting window.
    ///
    /// Periodic variables resolve to 0 here since they have no window.
    pub async fn resolve(
        &self,
        node: &CalculationNode,
        metrics: &dyn MetricSource,
    ) -> CalcResult<f64> {
        self.evaluate_with(node, metrics, None).await
    }

    /// Single value for a KPI card filtered to `period`
    pub async fn resolve_in_period(
        &self,
        node: &CalculationNode,
        metrics: &dyn MetricSource,
        period: &DateRange,
    ) -> CalcResult<f64> {
        self.evaluate_with(node, metrics, Some(*period)).await
    }

    /// One value per calendar day of `period`, in date order
    pub async fn resolve_over_time(
        &self,
        node: &CalculationNode,
        period: &DateRange,
        source: Arc<dyn DailyMetricSource>,
    ) -> CalcResult<Vec<SeriesPoint>> {
        debug!(
            period = %period,
            batch_size = self.config.batch_size,
            "resolving time series"
        );
        timeseries::resolve_over_time(
            Arc::new(node.clone()),
            *period,
            source,
            Arc::clone(&self.variables),
            self.config.batch_size,
        )
        .await
    }

    pub async fn resolve_variable_value(
        &self,
        variable: &DashboardVariable,
        period: Option<&DateRange>,
    ) -> CalcResult<f64> {
        resolve_variable_value(variable, period, self.variables.as_ref()).await
    }

    async fn evaluate_with(
        &self,
        node: &CalculationNode,
        metrics: &dyn MetricSource,
        period: Option<DateRange>,
    ) -> CalcResult<f64> {
        let ctx = EvalContext {
            metrics,
            variables: self.variables.as_ref(),
            period,
        };
        let value = evaluate(node, ctx).await?;
        debug!(value, "evaluated formula");
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{InMemoryVariables, SnapshotMetrics};
    use crate::types::{parse_date, Operator, ValueType, VariableFormat, VariablePeriod};

    fn engine() -> Engine {
        let store = InMemoryVariables::new()
            .with_variable(DashboardVariable {
                id: "quota".to_string(),
                name: "Quota".to_string(),
                value: 1000.0,
                format: VariableFormat::Number,
                value_type: ValueType::Periodic,
                description: None,
            })
            .with_period(VariablePeriod {
                id: "q1".to_string(),
                variable_id: "quota".to_string(),
                start_date: parse_date("2024-01-01").unwrap(),
                end_date: parse_date("2024-03-31").unwrap(),
                value: 50.0,
            });
        Engine::new(Arc::new(store), EngineConfig::default())
    }

    fn attainment() -> CalculationNode {
        CalculationNode::op(
            Operator::Divide,
            CalculationNode::metric("won"),
            CalculationNode::variable("quota"),
        )
    }

    #[tokio::test]
    async fn test_periodic_variable_without_window_divides_by_zero() {
        let metrics = SnapshotMetrics::new().with_total("won", 25.0);
        let value = engine().resolve(&attainment(), &metrics).await.unwrap();
        assert_eq!(value, 0.0);
    }

    #[tokio::test]
    async fn test_resolve_in_period_uses_window() {
        let metrics = SnapshotMetrics::new().with_total("won", 25.0);
        let period = DateRange::parse("2024-02-01", "2024-02-29").unwrap();
        let value = engine()
            .resolve_in_period(&attainment(), &metrics, &period)
            .await
            .unwrap();
        assert_eq!(value, 0.5);
    }

    #[tokio::test]
    async fn test_time_series_variables_follow_the_day() {
        let metrics = SnapshotMetrics::new().with_total("won", 10.0);
        let period = DateRange::parse("2024-03-31", "2024-04-01").unwrap();
        let series = engine()
            .resolve_over_time(&attainment(), &period, Arc::new(metrics))
            .await
            .unwrap();
        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0.2, 0.0]);
    }

    #[tokio::test]
    async fn test_same_inputs_same_result() {
        let metrics = SnapshotMetrics::new().with_total("won", 25.0);
        let period = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
        let engine = engine();
        let first = engine
            .resolve_in_period(&attainment(), &metrics, &period)
            .await
            .unwrap();
        let second = engine
            .resolve_in_period(&attainment(), &metrics, &period)
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
