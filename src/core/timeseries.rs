//! Per-day evaluation of a formula over a date range

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;

use crate::error::{CalcError, CalcResult};
use crate::source::{DailyMetricSource, ScopedMetrics, VariableStore};
use crate::types::{CalculationNode, DateRange, SeriesPoint};

use super::evaluator::{evaluate, EvalContext};

/// Evaluate `node` once per calendar day of `range`.
///
/// Days run `batch_size` at a time: every day of a batch is in flight at
/// once, batches run one after another. Each day sees the metric source
/// and periodic variables scoped to that single day. The series is
/// assembled by day index, so it is chronological whatever order the
/// fetches complete in. The first failing day fails the whole series.
pub(crate) async fn resolve_over_time(
    node: Arc<CalculationNode>,
    range: DateRange,
    source: Arc<dyn DailyMetricSource>,
    variables: Arc<dyn VariableStore>,
    batch_size: usize,
) -> CalcResult<Vec<SeriesPoint>> {
    let days = range.days();
    let mut values = vec![0.0; days.len()];
    let batch_size = batch_size.max(1);

    for (batch_no, batch) in days.chunks(batch_size).enumerate() {
        let offset = batch_no * batch_size;
        debug!(batch = batch_no, days = batch.len(), "evaluating batch");

        let mut tasks = JoinSet::new();
        for (i, day) in batch.iter().copied().enumerate() {
            let node = Arc::clone(&node);
            let source = Arc::clone(&source);
            let variables = Arc::clone(&variables);
            tasks.spawn(async move {
                let window = DateRange::single_day(day);
                let metrics = ScopedMetrics::new(source.as_ref(), window);
                let ctx = EvalContext {
                    metrics: &metrics,
                    variables: variables.as_ref(),
                    period: Some(window),
                };
                evaluate(&node, ctx).await.map(|value| (offset + i, value))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, value) = joined.map_err(|e| CalcError::Task(e.to_string()))??;
            values[index] = value;
        }
    }

    Ok(days
        .into_iter()
        .zip(values)
        .map(|(date, value)| SeriesPoint { date, value })
        .collect())
}
