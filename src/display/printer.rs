//! Human-readable rendering of formula trees

use std::collections::HashMap;

use crate::source::custom_field_key;
use crate::types::CalculationNode;

/// Rendered in place of a missing operand or operator
pub const MISSING: &str = "???";
const UNKNOWN_METRIC: &str = "[metric]";
const UNKNOWN_VARIABLE: &str = "[variable]";

/// Display names for the leaves of a formula
pub trait LabelLookup {
    /// Label for a catalog metric key or a `custom_field_` key
    fn metric_label(&self, key: &str) -> Option<&str>;
    fn variable_name(&self, id: &str) -> Option<&str>;
}

#[derive(Debug, Clone, Default)]
pub struct LabelCatalog {
    metrics: HashMap<String, String>,
    variables: HashMap<String, String>,
}

impl LabelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_metric(&mut self, key: impl Into<String>, label: impl Into<String>) {
        self.metrics.insert(key.into(), label.into());
    }

    pub fn add_variable(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.variables.insert(id.into(), name.into());
    }

    pub fn with_metric(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.add_metric(key, label);
        self
    }

    pub fn with_variable(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.add_variable(id, name);
        self
    }
}

impl LabelLookup for LabelCatalog {
    fn metric_label(&self, key: &str) -> Option<&str> {
        self.metrics.get(key).map(String::as_str)
    }

    fn variable_name(&self, id: &str) -> Option<&str> {
        self.variables.get(id).map(String::as_str)
    }
}

/// Render `node` as infix text, e.g. `(Won Deals + Open Deals) × 2`.
///
/// Parentheses appear only around an additive operation nested under a
/// multiplicative one. Never fails, whatever state the tree is in.
pub fn to_text(node: &CalculationNode, labels: &dyn LabelLookup) -> String {
    match node {
        CalculationNode::Constant { value } => match value {
            Some(v) => v.to_string(),
            None => MISSING.to_string(),
        },
        CalculationNode::Metric { metric_key } => leaf_label(metric_key.as_deref(), labels),
        CalculationNode::CustomField { custom_field_id } => match custom_field_id.as_deref() {
            Some(id) if !id.is_empty() => {
                let key = custom_field_key(id);
                labels.metric_label(&key).unwrap_or(&key).to_string()
            }
            _ => UNKNOWN_METRIC.to_string(),
        },
        CalculationNode::Variable { variable_id } => variable_id
            .as_deref()
            .and_then(|id| labels.variable_name(id))
            .unwrap_or(UNKNOWN_VARIABLE)
            .to_string(),
        CalculationNode::Operation {
            operator,
            left,
            right,
        } => {
            let symbol = operator.map_or(MISSING, |op| op.symbol());
            let wrap = |child: &Option<Box<CalculationNode>>| match child.as_deref() {
                None => MISSING.to_string(),
                Some(child) => {
                    let text = to_text(child, labels);
                    let needs_parens = matches!(
                        (operator, child.operator()),
                        (Some(parent), Some(inner)) if parent.is_multiplicative() && inner.is_additive()
                    );
                    if needs_parens {
                        format!("({text})")
                    } else {
                        text
                    }
                }
            };
            format!("{} {} {}", wrap(left), symbol, wrap(right))
        }
        CalculationNode::Unknown => MISSING.to_string(),
    }
}

fn leaf_label(key: Option<&str>, labels: &dyn LabelLookup) -> String {
    match key {
        Some(key) if !key.is_empty() => labels.metric_label(key).unwrap_or(key).to_string(),
        _ => UNKNOWN_METRIC.to_string(),
    }
}
