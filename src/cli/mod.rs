//! CLI command handlers

pub mod commands;

pub use commands::{calculate, print, series, validate, variables};
