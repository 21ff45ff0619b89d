//! Variable resolution for a reporting window

use tracing::debug;

use crate::error::CalcResult;
use crate::source::VariableStore;
use crate::types::{DashboardVariable, DateRange, ValueType};

/// Numeric value of a variable for an optional date window.
///
/// Fixed variables ignore the window. Periodic variables need one: without
/// it they are 0. With it, every period that overlaps the window contributes
/// its full value (no pro-rating), summed across all overlapping periods.
pub async fn resolve_variable_value(
    variable: &DashboardVariable,
    range: Option<&DateRange>,
    store: &dyn VariableStore,
) -> CalcResult<f64> {
    if variable.value_type != ValueType::Periodic {
        return Ok(variable.value);
    }

    let Some(range) = range else {
        return Ok(0.0);
    };

    let periods = store.get_periods(&variable.id).await?;
    let total: f64 = periods
        .iter()
        .filter(|p| p.overlaps(range))
        .map(|p| p.value)
        .sum();

    debug!(
        variable = %variable.id,
        range = %range,
        periods = periods.len(),
        total,
        "resolved periodic variable"
    );
    Ok(total)
}
