//! KPI Forge - calculation engine for dashboard metrics
//!
//! Users build calculated metrics as formula trees over system metrics,
//! custom fields, named variables and constants. This library validates
//! those trees, evaluates them to a single value or to a per-day series,
//! resolves date-dependent variables, and renders formulas and results
//! as text.
//!
//! # Features
//!
//! - Structural validation safe for half-built formulas
//! - Concurrent evaluation against injected async metric sources
//! - Periodic variables resolved by overlapping date periods
//! - Per-day time series with bounded concurrency
//! - Precedence-aware formula printing and locale-aware formatting
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use kpiforge::config::EngineConfig;
//! use kpiforge::core::Engine;
//! use kpiforge::source::{InMemoryVariables, SnapshotMetrics};
//! use kpiforge::types::{CalculationNode, Operator};
//!
//! # async fn run() -> kpiforge::CalcResult<()> {
//! let engine = Engine::new(Arc::new(InMemoryVariables::new()), EngineConfig::default());
//! let metrics = SnapshotMetrics::new()
//!     .with_total("won_deals", 12.0)
//!     .with_total("total_deals", 48.0);
//!
//! let win_rate = CalculationNode::op(
//!     Operator::Multiply,
//!     CalculationNode::op(
//!         Operator::Divide,
//!         CalculationNode::metric("won_deals"),
//!         CalculationNode::metric("total_deals"),
//!     ),
//!     CalculationNode::constant(100.0),
//! );
//!
//! assert!(engine.validate(Some(&win_rate)).valid);
//! let value = engine.resolve(&win_rate, &metrics).await?;
//! println!("Win rate: {value}%");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod display;
pub mod error;
pub mod parser;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use error::{CalcError, CalcResult};
pub use types::{
    CalculationNode, DashboardCalculation, DashboardVariable, DateRange, Operator, ResultFormat,
    SeriesPoint, VariablePeriod,
};
