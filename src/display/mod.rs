//! Presentation: formula text and formatted values

pub mod formatter;
pub mod printer;

pub use formatter::{format_result, format_variable};
pub use printer::{to_text, LabelCatalog, LabelLookup};
