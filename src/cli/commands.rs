use crate::config::EngineConfig;
use crate::core::Engine;
use crate::display::{format_result, format_variable, to_text};
use crate::error::{CalcError, CalcResult};
use crate::parser::{self, Dashboard};
use crate::source::{DailyMetricSource, MetricSource, ScopedMetrics, ZeroOnError};
use crate::types::{DateRange, DATE_FORMAT};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Both bounds or neither
fn parse_range(start: Option<String>, end: Option<String>) -> CalcResult<Option<DateRange>> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(DateRange::parse(&start, &end)?)),
        (None, None) => Ok(None),
        _ => Err(CalcError::Validation(
            "--start and --end must be given together".to_string(),
        )),
    }
}

fn engine_for(dashboard: &Dashboard, batch_size: Option<usize>) -> Engine {
    let config = batch_size.map_or_else(
        || dashboard.engine_config(),
        EngineConfig::with_batch_size,
    );
    Engine::new(Arc::new(dashboard.variable_store()), config)
}

/// Metric sources over the dashboard snapshot. Unless `strict`, failed
/// fetches count as 0 the way a live dashboard renders them.
fn sources(
    dashboard: &Dashboard,
    strict: bool,
) -> (Box<dyn MetricSource>, Arc<dyn DailyMetricSource>) {
    let snapshot = dashboard.metric_snapshot();
    if strict {
        let metrics: Box<dyn MetricSource> = Box::new(snapshot.clone());
        let daily: Arc<dyn DailyMetricSource> = Arc::new(snapshot);
        (metrics, daily)
    } else {
        let metrics: Box<dyn MetricSource> = Box::new(ZeroOnError(snapshot.clone()));
        let daily: Arc<dyn DailyMetricSource> = Arc::new(ZeroOnError(snapshot));
        (metrics, daily)
    }
}

/// Execute the validate command
pub fn validate(files: Vec<PathBuf>) -> CalcResult<()> {
    println!("{}", "🔍 KPI Forge - Validating formulas".bold().green());
    let mut invalid = 0usize;

    for file in &files {
        println!("\n   File: {}", file.display());
        let dashboard = parser::parse_dashboard(file)?;

        if dashboard.calculations.is_empty() {
            println!("   {}", "No calculations found".yellow());
            continue;
        }

        for calc in &dashboard.calculations {
            let verdict = crate::core::validate(Some(&calc.formula));
            if verdict.valid {
                println!("   ✅ {}", calc.name.bright_blue());
            } else {
                invalid += 1;
                println!(
                    "   ❌ {}: {}",
                    calc.name.bright_blue(),
                    verdict.error.unwrap_or_default().red()
                );
            }
        }
    }
    println!();

    info!(files = files.len(), invalid, "validation finished");
    if invalid > 0 {
        return Err(CalcError::Validation(format!(
            "{invalid} invalid formula(s)"
        )));
    }
    println!("{}", "✅ All formulas are valid".bold().green());
    Ok(())
}

/// Execute the calculate command - one value per calculation
pub async fn calculate(
    file: PathBuf,
    calculation: Option<String>,
    start: Option<String>,
    end: Option<String>,
    strict: bool,
) -> CalcResult<()> {
    let range = parse_range(start, end)?;
    println!("{}", "🧮 KPI Forge - Calculating".bold().green());
    println!("   File: {}", file.display());
    if let Some(range) = &range {
        println!("   Period: {}", range.to_string().bright_yellow());
    }
    println!();

    let dashboard = parser::parse_dashboard(&file)?;
    let engine = engine_for(&dashboard, None);
    let locale = dashboard.locale();
    let (metrics, daily) = sources(&dashboard, strict);

    let selected = match &calculation {
        Some(id) => vec![dashboard.find_calculation(id)?],
        None => dashboard.calculations.iter().collect(),
    };

    for calc in selected {
        let verdict = engine.validate(Some(&calc.formula));
        if !verdict.valid {
            println!(
                "   ⚠️  {}: skipped ({})",
                calc.name.bright_blue(),
                verdict.error.unwrap_or_default().yellow()
            );
            continue;
        }

        let value = match &range {
            Some(range) => {
                let scoped = ScopedMetrics::new(daily.as_ref(), *range);
                engine
                    .resolve_in_period(&calc.formula, &scoped, range)
                    .await?
            }
            None => engine.resolve(&calc.formula, metrics.as_ref()).await?,
        };
        println!(
            "   {} = {}",
            calc.name.bright_blue(),
            format_result(value, calc.result_format, &locale).bold()
        );
    }
    println!();
    Ok(())
}

/// Execute the series command - one value per day
pub async fn series(
    file: PathBuf,
    calculation: String,
    start: String,
    end: String,
    batch_size: Option<usize>,
    json: bool,
    strict: bool,
) -> CalcResult<()> {
    let range = DateRange::parse(&start, &end)?;
    let dashboard = parser::parse_dashboard(&file)?;
    let calc = dashboard.find_calculation(&calculation)?;
    let engine = engine_for(&dashboard, batch_size);

    let verdict = engine.validate(Some(&calc.formula));
    if !verdict.valid {
        return Err(CalcError::Validation(format!(
            "'{}': {}",
            calc.name,
            verdict.error.unwrap_or_default()
        )));
    }

    let (_, daily) = sources(&dashboard, strict);
    info!(calculation = %calc.id, period = %range, "computing series");
    let points = engine.resolve_over_time(&calc.formula, &range, daily).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    let locale = dashboard.locale();
    println!("{}", "📈 KPI Forge - Time series".bold().green());
    println!("   Calculation: {}", calc.name.bright_blue().bold());
    println!("   Period: {}", range.to_string().bright_yellow());
    println!();
    for point in &points {
        println!(
            "   {}  {}",
            point.date.format(DATE_FORMAT).to_string().cyan(),
            format_result(point.value, calc.result_format, &locale)
        );
    }
    println!();
    Ok(())
}

/// Execute the print command - formulas as readable text
pub fn print(file: PathBuf) -> CalcResult<()> {
    let dashboard = parser::parse_dashboard(&file)?;
    let labels = dashboard.label_catalog();

    println!("{}", "📋 KPI Forge - Formulas".bold().green());
    println!("   File: {}\n", file.display());
    for calc in &dashboard.calculations {
        println!(
            "   {} = {}",
            calc.name.bright_blue(),
            to_text(&calc.formula, &labels).bright_yellow()
        );
        if let Some(description) = &calc.description {
            println!("      {}", description.dimmed());
        }
    }
    println!();
    Ok(())
}

/// Execute the variables command - resolved value of every variable
pub async fn variables(
    file: PathBuf,
    start: Option<String>,
    end: Option<String>,
) -> CalcResult<()> {
    let range = parse_range(start, end)?;
    let dashboard = parser::parse_dashboard(&file)?;
    let engine = engine_for(&dashboard, None);
    let locale = dashboard.locale();

    println!("{}", "📐 KPI Forge - Variables".bold().green());
    if let Some(range) = &range {
        println!("   Period: {}", range.to_string().bright_yellow());
    }
    println!();

    for variable in &dashboard.variables {
        let value = engine
            .resolve_variable_value(variable, range.as_ref())
            .await?;
        println!(
            "   {} = {}",
            variable.name.bright_blue(),
            format_variable(value, variable.format, &locale).bold()
        );
    }
    println!();
    Ok(())
}
