//! Scalar evaluation of a formula tree
//!
//! Evaluation is total over the shape of the tree: incomplete nodes yield 0
//! so a formula that is still being edited never breaks a dashboard.
//! Failures from the injected sources are not swallowed; they propagate.

use std::future::Future;
use std::pin::Pin;

use crate::error::CalcResult;
use crate::source::{custom_field_key, MetricSource, VariableStore};
use crate::types::{CalculationNode, DateRange};

use super::variables::resolve_variable_value;

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything a single evaluation reads from
#[derive(Clone, Copy)]
pub(crate) struct EvalContext<'a> {
    pub metrics: &'a dyn MetricSource,
    pub variables: &'a dyn VariableStore,
    /// Window periodic variables resolve against; `None` outside a report window
    pub period: Option<DateRange>,
}

pub(crate) fn evaluate<'a>(
    node: &'a CalculationNode,
    ctx: EvalContext<'a>,
) -> BoxFuture<'a, CalcResult<f64>> {
    Box::pin(async move {
        match node {
            CalculationNode::Constant { value } => Ok(value.unwrap_or(0.0)),

            CalculationNode::Metric { metric_key } => match metric_key.as_deref() {
                Some(key) if !key.is_empty() => ctx.metrics.fetch_metric(key).await,
                _ => Ok(0.0),
            },

            CalculationNode::CustomField { custom_field_id } => {
                match custom_field_id.as_deref() {
                    Some(id) if !id.is_empty() => {
                        ctx.metrics.fetch_metric(&custom_field_key(id)).await
                    }
                    _ => Ok(0.0),
                }
            }

            CalculationNode::Variable { variable_id } => {
                let Some(id) = variable_id.as_deref().filter(|id| !id.is_empty()) else {
                    return Ok(0.0);
                };
                match ctx.variables.get_variable(id).await? {
                    Some(variable) => {
                        resolve_variable_value(&variable, ctx.period.as_ref(), ctx.variables)
                            .await
                    }
                    None => Ok(0.0),
                }
            }

            CalculationNode::Operation {
                operator,
                left,
                right,
            } => {
                let (Some(operator), Some(left), Some(right)) = (operator, left, right) else {
                    return Ok(0.0);
                };
                // Operands are independent; no ordering between their fetches.
                let (l, r) = tokio::try_join!(evaluate(left, ctx), evaluate(right, ctx))?;
                Ok(operator.apply(l, r))
            }

            CalculationNode::Unknown => Ok(0.0),
        }
    })
}
