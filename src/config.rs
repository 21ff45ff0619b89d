//! Engine and display settings
//!
//! Both can come from the `settings:` block of a dashboard file; CLI flags
//! override them.

use serde::{Deserialize, Serialize};

/// Days evaluated concurrently by the time-series evaluator
pub const DEFAULT_BATCH_SIZE: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl EngineConfig {
    /// A width of 0 would never make progress, so it is raised to 1
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }
}

/// Number conventions used when rendering values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    pub thousands_separator: char,
    pub decimal_separator: char,
    pub currency_symbol: String,
    /// `$1,234.50` when true, `1.234,50 €` when false
    pub symbol_first: bool,
}

impl Default for Locale {
    fn default() -> Self {
        Self::en_us()
    }
}

impl Locale {
    pub fn en_us() -> Self {
        Self {
            thousands_separator: ',',
            decimal_separator: '.',
            currency_symbol: "$".to_string(),
            symbol_first: true,
        }
    }

    pub fn european() -> Self {
        Self {
            thousands_separator: '.',
            decimal_separator: ',',
            currency_symbol: "€".to_string(),
            symbol_first: false,
        }
    }

    /// Look up a locale by tag; unknown tags get `None`
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "en-us" | "en" | "us" => Some(Self::en_us()),
            "eu" | "de-de" | "fr-fr" | "es-es" | "pt-br" => Some(Self::european()),
            _ => None,
        }
    }
}

/// The `settings:` block of a dashboard file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}
