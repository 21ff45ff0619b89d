use clap::{Parser, Subcommand};
use kpiforge::cli;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kpiforge")]
#[command(about = "Validate, evaluate and chart calculated dashboard metrics.")]
#[command(long_about = "KPI Forge - calculated metrics for CRM dashboards

A calculated metric is a formula over system metrics, custom fields,
named variables and constants. KPI Forge validates those formulas,
evaluates them against a dashboard snapshot, charts them day by day
and prints them as readable text.

COMMANDS:
  validate   - Check every formula is complete
  calculate  - One value per calculation (optionally for a period)
  series     - One value per day for a calculation
  print      - Show formulas as readable text
  variables  - Show each variable's value (optionally for a period)

EXAMPLES:
  kpiforge validate dashboard.yaml
  kpiforge calculate dashboard.yaml --start 2024-01-01 --end 2024-01-31
  kpiforge series dashboard.yaml win_rate --start 2024-01-01 --end 2024-01-14
  kpiforge print dashboard.yaml

LOGGING:
  Set RUST_LOG (e.g. RUST_LOG=kpiforge=debug) for engine diagnostics on stderr.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that every formula is complete
    Validate {
        /// Dashboard YAML file(s)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    #[command(long_about = "Evaluate calculations to a single value each.

Without a period, periodic variables count as 0 and metrics use their
snapshot totals. With --start/--end, metrics and periodic variables are
scoped to that window.

Failed metric fetches count as 0 unless --strict is given.")]
    /// Evaluate each calculation to a single value
    Calculate {
        /// Dashboard YAML file
        file: PathBuf,

        /// Only this calculation (id or name)
        #[arg(short, long)]
        calculation: Option<String>,

        /// Period start (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Period end (YYYY-MM-DD), inclusive
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Fail on the first metric fetch error
        #[arg(long)]
        strict: bool,
    },

    #[command(long_about = "Evaluate a calculation once per day.

Every calendar day from --start to --end (inclusive) is evaluated as if
the report covered only that day. Days are evaluated in concurrent
batches; --batch-size sets how many days are in flight at once
(default 7, or settings.batch_size from the dashboard file).

Failed metric fetches count as 0 for that day unless --strict is given.")]
    /// Evaluate a calculation once per day
    Series {
        /// Dashboard YAML file
        file: PathBuf,

        /// Calculation id or name
        calculation: String,

        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day (YYYY-MM-DD), inclusive
        #[arg(long)]
        end: String,

        /// Days evaluated concurrently
        #[arg(short, long, env = "KPIFORGE_BATCH_SIZE")]
        batch_size: Option<usize>,

        /// Print the series as JSON
        #[arg(long)]
        json: bool,

        /// Fail on the first metric fetch error
        #[arg(long)]
        strict: bool,
    },

    /// Show formulas as readable text
    Print {
        /// Dashboard YAML file
        file: PathBuf,
    },

    /// Show the resolved value of every variable
    Variables {
        /// Dashboard YAML file
        file: PathBuf,

        /// Period start (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Period end (YYYY-MM-DD), inclusive
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "kpiforge=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { files } => cli::validate(files)?,

        Commands::Calculate {
            file,
            calculation,
            start,
            end,
            strict,
        } => cli::calculate(file, calculation, start, end, strict).await?,

        Commands::Series {
            file,
            calculation,
            start,
            end,
            batch_size,
            json,
            strict,
        } => cli::series(file, calculation, start, end, batch_size, json, strict).await?,

        Commands::Print { file } => cli::print(file)?,

        Commands::Variables { file, start, end } => cli::variables(file, start, end).await?,
    }
    Ok(())
}
