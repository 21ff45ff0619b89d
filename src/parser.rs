//! Dashboard file loading
//!
//! A dashboard file is YAML holding the calculations to evaluate, the
//! variables and periods they reference, and a snapshot of metric values:
//!
//! ```yaml
//! settings:
//!   batch_size: 7
//!   locale: en-US
//! labels:
//!   won_deals: Won Deals
//! calculations:
//!   - id: win_rate
//!     name: Win rate
//!     result_format: percentage
//!     formula:
//!       type: operation
//!       operator: "*"
//!       left: { type: metric, metricKey: won_deals }
//!       right: { type: constant, value: 100 }
//! variables:
//!   - { id: quota, name: Quota, value: 0, value_type: periodic }
//! periods:
//!   - { id: q1, variable_id: quota, start_date: 2024-01-01, end_date: 2024-03-31, value: 50 }
//! metrics:
//!   won_deals: 40
//! daily_metrics:
//!   won_deals:
//!     2024-01-01: 3
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::config::{EngineConfig, Locale, Settings};
use crate::display::LabelCatalog;
use crate::error::{CalcError, CalcResult};
use crate::source::{InMemoryVariables, SnapshotMetrics};
use crate::types::{DashboardCalculation, DashboardVariable, VariablePeriod};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dashboard {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub calculations: Vec<DashboardCalculation>,
    #[serde(default)]
    pub variables: Vec<DashboardVariable>,
    #[serde(default)]
    pub periods: Vec<VariablePeriod>,
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
    #[serde(default)]
    pub daily_metrics: HashMap<String, BTreeMap<NaiveDate, f64>>,
}

/// Read and check a dashboard file
pub fn parse_dashboard(path: &Path) -> CalcResult<Dashboard> {
    let content = std::fs::read_to_string(path)?;
    let dashboard = parse_dashboard_str(&content)?;
    debug!(
        path = %path.display(),
        calculations = dashboard.calculations.len(),
        variables = dashboard.variables.len(),
        "loaded dashboard"
    );
    Ok(dashboard)
}

pub fn parse_dashboard_str(content: &str) -> CalcResult<Dashboard> {
    let dashboard: Dashboard = serde_yaml::from_str(content)?;
    dashboard.check()?;
    Ok(dashboard)
}

impl Dashboard {
    /// Reject files the configuration store would never have produced
    fn check(&self) -> CalcResult<()> {
        let mut ids = HashSet::new();
        for calc in &self.calculations {
            if !ids.insert(calc.id.as_str()) {
                return Err(CalcError::Validation(format!(
                    "Duplicate calculation id '{}'",
                    calc.id
                )));
            }
        }

        let variable_ids: HashSet<&str> = self.variables.iter().map(|v| v.id.as_str()).collect();
        if variable_ids.len() != self.variables.len() {
            return Err(CalcError::Validation(
                "Duplicate variable ids".to_string(),
            ));
        }

        for period in &self.periods {
            if !variable_ids.contains(period.variable_id.as_str()) {
                return Err(CalcError::Validation(format!(
                    "Period '{}' references unknown variable '{}'",
                    period.id, period.variable_id
                )));
            }
            if period.start_date > period.end_date {
                return Err(CalcError::Validation(format!(
                    "Period '{}' ends before it starts",
                    period.id
                )));
            }
        }

        if let Some(key) = self
            .daily_metrics
            .keys()
            .find(|key| self.metrics.contains_key(key.as_str()))
        {
            return Err(CalcError::Validation(format!(
                "Metric '{key}' has both a total and daily values"
            )));
        }

        if let Some(tag) = &self.settings.locale {
            if Locale::from_tag(tag).is_none() {
                return Err(CalcError::Validation(format!("Unknown locale '{tag}'")));
            }
        }
        Ok(())
    }

    /// Look up a calculation by id, then by name
    pub fn find_calculation(&self, id_or_name: &str) -> CalcResult<&DashboardCalculation> {
        self.calculations
            .iter()
            .find(|c| c.id == id_or_name)
            .or_else(|| self.calculations.iter().find(|c| c.name == id_or_name))
            .ok_or_else(|| CalcError::NotFound(format!("calculation '{id_or_name}'")))
    }

    pub fn variable_store(&self) -> InMemoryVariables {
        let mut store = InMemoryVariables::new();
        for variable in &self.variables {
            store.add_variable(variable.clone());
        }
        for period in &self.periods {
            store.add_period(period.clone());
        }
        store
    }

    pub fn metric_snapshot(&self) -> SnapshotMetrics {
        let mut snapshot = SnapshotMetrics::new();
        for (key, value) in &self.metrics {
            snapshot.set_total(key.clone(), *value);
        }
        for (key, days) in &self.daily_metrics {
            for (day, value) in days {
                snapshot.set_daily(key.clone(), *day, *value);
            }
        }
        snapshot
    }

    pub fn label_catalog(&self) -> LabelCatalog {
        let mut labels = LabelCatalog::new();
        for (key, label) in &self.labels {
            labels.add_metric(key.clone(), label.clone());
        }
        for variable in &self.variables {
            labels.add_variable(variable.id.clone(), variable.name.clone());
        }
        labels
    }

    pub fn engine_config(&self) -> EngineConfig {
        self.settings
            .batch_size
            .map_or_else(EngineConfig::default, EngineConfig::with_batch_size)
    }

    pub fn locale(&self) -> Locale {
        self.settings
            .locale
            .as_deref()
            .and_then(Locale::from_tag)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::LabelLookup;
    use crate::source::{MetricSource, VariableStore};
    use crate::types::{CalculationNode, Operator, ResultFormat, ValueType};

    const DASHBOARD: &str = r#"
settings:
  batch_size: 3
  locale: eu
labels:
  won_deals: Won Deals
calculations:
  - id: win_rate
    name: Win rate
    result_format: percentage
    formula:
      type: operation
      operator: "*"
      left: { type: metric, metricKey: won_deals }
      right: { type: constant, value: 100 }
variables:
  - { id: quota, name: Quota, value: 0, value_type: periodic }
periods:
  - { id: q1, variable_id: quota, start_date: 2024-01-01, end_date: 2024-03-31, value: 50 }
metrics:
  won_deals: 40
daily_metrics:
  calls:
    2024-01-01: 3
    2024-01-02: 4
"#;

    #[test]
    fn test_parse_full_dashboard() {
        let dashboard = parse_dashboard_str(DASHBOARD).unwrap();
        let calc = dashboard.find_calculation("win_rate").unwrap();
        assert_eq!(calc.result_format, ResultFormat::Percentage);
        assert_eq!(
            calc.formula,
            CalculationNode::op(
                Operator::Multiply,
                CalculationNode::metric("won_deals"),
                CalculationNode::constant(100.0),
            )
        );
        assert_eq!(dashboard.variables[0].value_type, ValueType::Periodic);
        assert_eq!(dashboard.engine_config().batch_size, 3);
        assert_eq!(dashboard.locale(), Locale::european());
    }

    #[test]
    fn test_find_calculation_by_name() {
        let dashboard = parse_dashboard_str(DASHBOARD).unwrap();
        assert_eq!(dashboard.find_calculation("Win rate").unwrap().id, "win_rate");
        assert!(matches!(
            dashboard.find_calculation("nope"),
            Err(CalcError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_collaborators_from_dashboard() {
        let dashboard = parse_dashboard_str(DASHBOARD).unwrap();

        let store = dashboard.variable_store();
        assert!(store.get_variable("quota").await.unwrap().is_some());
        assert_eq!(store.get_periods("quota").await.unwrap().len(), 1);

        let metrics = dashboard.metric_snapshot();
        assert_eq!(metrics.fetch_metric("won_deals").await.unwrap(), 40.0);
        assert_eq!(metrics.fetch_metric("calls").await.unwrap(), 7.0);

        let labels = dashboard.label_catalog();
        assert_eq!(labels.metric_label("won_deals"), Some("Won Deals"));
        assert_eq!(labels.variable_name("quota"), Some("Quota"));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let dashboard = parse_dashboard_str("{}").unwrap();
        assert!(dashboard.calculations.is_empty());
        assert_eq!(dashboard.engine_config(), EngineConfig::default());
        assert_eq!(dashboard.locale(), Locale::en_us());
    }

    #[test]
    fn test_period_for_unknown_variable_rejected() {
        let yaml = r#"
periods:
  - { id: p, variable_id: ghost, start_date: 2024-01-01, end_date: 2024-01-31, value: 1 }
"#;
        let err = parse_dashboard_str(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown variable 'ghost'"));
    }

    #[test]
    fn test_inverted_period_rejected() {
        let yaml = r#"
variables:
  - { id: v, name: V, value_type: periodic }
periods:
  - { id: p, variable_id: v, start_date: 2024-02-01, end_date: 2024-01-01, value: 1 }
"#;
        assert!(matches!(
            parse_dashboard_str(yaml),
            Err(CalcError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_calculation_ids_rejected() {
        let yaml = r#"
calculations:
  - { id: a, name: One, formula: { type: constant, value: 1 } }
  - { id: a, name: Two, formula: { type: constant, value: 2 } }
"#;
        assert!(matches!(
            parse_dashboard_str(yaml),
            Err(CalcError::Validation(_))
        ));
    }

    #[test]
    fn test_metric_with_total_and_daily_values_rejected() {
        let yaml = r#"
metrics:
  calls: 10
daily_metrics:
  calls:
    2024-01-01: 3
"#;
        let err = parse_dashboard_str(yaml).unwrap_err();
        assert!(err.to_string().contains("'calls' has both a total and daily values"));
    }

    #[test]
    fn test_unknown_locale_rejected() {
        let yaml = "settings:\n  locale: tlh\n";
        assert!(matches!(
            parse_dashboard_str(yaml),
            Err(CalcError::Validation(_))
        ));
    }
}
