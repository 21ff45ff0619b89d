use crate::error::{CalcError, CalcResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

//==============================================================================
// Formula Tree
//==============================================================================

/// Arithmetic operator of an `operation` node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl Operator {
    /// Display symbol used in human-readable formulas
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "×",
            Operator::Divide => "÷",
        }
    }

    pub fn is_additive(self) -> bool {
        matches!(self, Operator::Add | Operator::Subtract)
    }

    pub fn is_multiplicative(self) -> bool {
        matches!(self, Operator::Multiply | Operator::Divide)
    }

    /// Combine two operands. Division by zero yields 0, never NaN or infinity.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
            Operator::Divide => {
                if right == 0.0 {
                    0.0
                } else {
                    left / right
                }
            }
        }
    }
}

/// One node of a calculated-metric formula.
///
/// Every payload field is optional: the formula builder saves trees while
/// they are still being edited, so a half-built tree is a valid value even
/// though it is not a valid formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CalculationNode {
    Constant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
    },
    Metric {
        #[serde(
            rename = "metricKey",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        metric_key: Option<String>,
    },
    CustomField {
        #[serde(
            rename = "customFieldId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        custom_field_id: Option<String>,
    },
    Variable {
        #[serde(
            rename = "variableId",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        variable_id: Option<String>,
    },
    Operation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operator: Option<Operator>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        left: Option<Box<CalculationNode>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        right: Option<Box<CalculationNode>>,
    },
    /// Any tag this version does not recognize
    #[serde(other)]
    Unknown,
}

impl CalculationNode {
    pub fn constant(value: f64) -> Self {
        CalculationNode::Constant { value: Some(value) }
    }

    pub fn metric(key: impl Into<String>) -> Self {
        CalculationNode::Metric {
            metric_key: Some(key.into()),
        }
    }

    pub fn custom_field(id: impl Into<String>) -> Self {
        CalculationNode::CustomField {
            custom_field_id: Some(id.into()),
        }
    }

    pub fn variable(id: impl Into<String>) -> Self {
        CalculationNode::Variable {
            variable_id: Some(id.into()),
        }
    }

    /// Fully populated operation node
    pub fn op(operator: Operator, left: CalculationNode, right: CalculationNode) -> Self {
        CalculationNode::Operation {
            operator: Some(operator),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    /// Operator of this node if it is an operation with one set
    pub fn operator(&self) -> Option<Operator> {
        match self {
            CalculationNode::Operation { operator, .. } => *operator,
            _ => None,
        }
    }
}

//==============================================================================
// Dashboard Configuration Records
//==============================================================================

/// Display format declared on a calculation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    #[default]
    Number,
    Currency,
    Percentage,
}

/// Display format declared on a variable. Same cases as [`ResultFormat`],
/// but percentages follow a different convention (see `display::formatter`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableFormat {
    #[default]
    Number,
    Currency,
    Percentage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Fixed,
    Periodic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardCalculation {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub formula: CalculationNode,
    #[serde(default)]
    pub result_format: ResultFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardVariable {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub format: VariableFormat,
    #[serde(default)]
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Value of a periodic variable over an inclusive date interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariablePeriod {
    pub id: String,
    pub variable_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub value: f64,
}

impl VariablePeriod {
    pub fn overlaps(&self, range: &DateRange) -> bool {
        let own = DateRange {
            start: self.start_date,
            end: self.end_date,
        };
        own.overlaps(range)
    }
}

//==============================================================================
// Date Ranges and Series
//==============================================================================

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(s: &str) -> CalcResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| CalcError::InvalidDate(s.to_string()))
}

/// Inclusive calendar-date window, `start <= end`.
///
/// Every value is built through [`DateRange::new`], deserialization
/// included, so an inverted window cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = CalcError;

    fn try_from(raw: RawDateRange) -> CalcResult<Self> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> CalcResult<Self> {
        if start > end {
            return Err(CalcError::InvalidRange {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> CalcResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Every calendar day from `start` to `end`, both included
    pub fn days(&self) -> Vec<NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(|d| *d <= end).collect()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// One day of a time-series evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn day(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_node_deserializes_from_builder_json() {
        let json = r#"{
            "type": "operation",
            "operator": "/",
            "left": {"type": "metric", "metricKey": "won_deals"},
            "right": {"type": "customField", "customFieldId": "42"}
        }"#;
        let node: CalculationNode = serde_json::from_str(json).unwrap();
        assert_eq!(
            node,
            CalculationNode::op(
                Operator::Divide,
                CalculationNode::metric("won_deals"),
                CalculationNode::custom_field("42"),
            )
        );
    }

    #[test]
    fn test_half_built_operation_deserializes() {
        let node: CalculationNode =
            serde_json::from_str(r#"{"type": "operation", "operator": "+"}"#).unwrap();
        assert_eq!(
            node,
            CalculationNode::Operation {
                operator: Some(Operator::Add),
                left: None,
                right: None,
            }
        );
    }

    #[test]
    fn test_unknown_tag_deserializes_to_unknown() {
        let node: CalculationNode = serde_json::from_str(r#"{"type": "sparkline"}"#).unwrap();
        assert_eq!(node, CalculationNode::Unknown);
    }

    #[test]
    fn test_variable_serializes_camel_case() {
        let json = serde_json::to_string(&CalculationNode::variable("v1")).unwrap();
        assert_eq!(json, r#"{"type":"variable","variableId":"v1"}"#);
    }

    #[test]
    fn test_divide_by_zero_is_zero() {
        assert_eq!(Operator::Divide.apply(5.0, 0.0), 0.0);
        assert_eq!(Operator::Divide.apply(10.0, 2.0), 5.0);
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        let err = DateRange::parse("2024-03-02", "2024-03-01").unwrap_err();
        assert!(matches!(err, CalcError::InvalidRange { .. }));
    }

    #[test]
    fn test_inverted_range_does_not_deserialize() {
        let err = serde_json::from_str::<DateRange>(r#"{"start":"2024-02-01","end":"2024-01-01"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("2024-02-01 is after 2024-01-01"));

        let range: DateRange =
            serde_json::from_str(r#"{"start":"2024-01-01","end":"2024-01-31"}"#).unwrap();
        assert_eq!(range.days().len(), 31);
    }

    #[test]
    fn test_date_range_days_inclusive_across_month_end() {
        let range = DateRange::parse("2024-02-27", "2024-03-02").unwrap();
        let days: Vec<String> = range
            .days()
            .iter()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .collect();
        assert_eq!(
            days,
            vec![
                "2024-02-27",
                "2024-02-28",
                "2024-02-29",
                "2024-03-01",
                "2024-03-02"
            ]
        );
    }

    #[test]
    fn test_period_overlap_is_inclusive() {
        let period = VariablePeriod {
            id: "p1".to_string(),
            variable_id: "v".to_string(),
            start_date: day("2024-01-01"),
            end_date: day("2024-01-31"),
            value: 100.0,
        };
        assert!(period.overlaps(&DateRange::single_day(day("2024-01-31"))));
        assert!(!period.overlaps(&DateRange::single_day(day("2024-02-01"))));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert!(matches!(
            parse_date("01/02/2024"),
            Err(CalcError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_series_point_serializes_iso_date() {
        let point = SeriesPoint {
            date: day("2024-05-01"),
            value: 3.5,
        };
        assert_eq!(
            serde_json::to_string(&point).unwrap(),
            r#"{"date":"2024-05-01","value":3.5}"#
        );
    }
}
