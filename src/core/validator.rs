//! Structural validation of formula trees
//!
//! Safe to run on every keystroke of the formula builder: never panics,
//! never allocates beyond the verdict.

use serde::Serialize;

use crate::types::CalculationNode;

/// Outcome of validating a formula
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(reason.into()),
        }
    }
}

pub const EMPTY_FORMULA: &str = "Formula is empty";
pub const UNKNOWN_NODE: &str = "Unknown node type";

fn is_blank(s: &Option<String>) -> bool {
    s.as_deref().map_or(true, str::is_empty)
}

/// Check that a formula is complete. `None` means nothing has been built yet.
///
/// Children are checked left before right and the first failure wins.
pub fn validate(node: Option<&CalculationNode>) -> Validation {
    let Some(node) = node else {
        return Validation::invalid(EMPTY_FORMULA);
    };

    match node {
        CalculationNode::Constant { value } => match value {
            Some(_) => Validation::ok(),
            None => Validation::invalid("Constant has no value"),
        },
        CalculationNode::Metric { metric_key } => {
            if is_blank(metric_key) {
                Validation::invalid("Metric is not selected")
            } else {
                Validation::ok()
            }
        }
        CalculationNode::CustomField { custom_field_id } => {
            if is_blank(custom_field_id) {
                Validation::invalid("Custom field is not selected")
            } else {
                Validation::ok()
            }
        }
        CalculationNode::Variable { variable_id } => {
            if is_blank(variable_id) {
                Validation::invalid("Variable is not selected")
            } else {
                Validation::ok()
            }
        }
        CalculationNode::Operation {
            operator,
            left,
            right,
        } => {
            if operator.is_none() {
                return Validation::invalid("Operation has no operator");
            }
            let (Some(left), Some(right)) = (left, right) else {
                return Validation::invalid("Operation needs both a left and a right operand");
            };
            let left = validate(Some(left));
            if !left.valid {
                return left;
            }
            validate(Some(right))
        }
        CalculationNode::Unknown => Validation::invalid(UNKNOWN_NODE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Operator;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_formula() {
        assert_eq!(validate(None), Validation::invalid(EMPTY_FORMULA));
    }

    #[test]
    fn test_zero_constant_is_valid() {
        assert!(validate(Some(&CalculationNode::constant(0.0))).valid);
    }

    #[test]
    fn test_constant_without_value() {
        let node = CalculationNode::Constant { value: None };
        assert!(!validate(Some(&node)).valid);
    }

    #[test]
    fn test_blank_leaf_keys() {
        for node in [
            CalculationNode::metric(""),
            CalculationNode::Metric { metric_key: None },
            CalculationNode::custom_field(""),
            CalculationNode::variable(""),
        ] {
            assert!(!validate(Some(&node)).valid, "{node:?} should be invalid");
        }
    }

    #[test]
    fn test_operation_missing_operator() {
        let node = CalculationNode::Operation {
            operator: None,
            left: Some(Box::new(CalculationNode::constant(1.0))),
            right: Some(Box::new(CalculationNode::constant(2.0))),
        };
        assert_eq!(
            validate(Some(&node)).error.as_deref(),
            Some("Operation has no operator")
        );
    }

    #[test]
    fn test_operation_missing_child() {
        let node = CalculationNode::Operation {
            operator: Some(Operator::Add),
            left: Some(Box::new(CalculationNode::constant(1.0))),
            right: None,
        };
        assert!(!validate(Some(&node)).valid);
    }

    #[test]
    fn test_left_error_reported_before_right() {
        let node = CalculationNode::op(
            Operator::Multiply,
            CalculationNode::metric(""),
            CalculationNode::variable(""),
        );
        assert_eq!(
            validate(Some(&node)).error.as_deref(),
            Some("Metric is not selected")
        );
    }

    #[test]
    fn test_nested_error_propagates_verbatim() {
        let node = CalculationNode::op(
            Operator::Add,
            CalculationNode::constant(1.0),
            CalculationNode::op(
                Operator::Divide,
                CalculationNode::metric("leads"),
                CalculationNode::custom_field(""),
            ),
        );
        assert_eq!(
            validate(Some(&node)).error.as_deref(),
            Some("Custom field is not selected")
        );
    }

    #[test]
    fn test_unknown_node() {
        assert_eq!(
            validate(Some(&CalculationNode::Unknown)),
            Validation::invalid(UNKNOWN_NODE)
        );
    }

    #[test]
    fn test_complete_tree_is_valid() {
        let node = CalculationNode::op(
            Operator::Divide,
            CalculationNode::op(
                Operator::Subtract,
                CalculationNode::metric("revenue"),
                CalculationNode::variable("costs"),
            ),
            CalculationNode::custom_field("7"),
        );
        assert_eq!(validate(Some(&node)), Validation::ok());
    }
}
