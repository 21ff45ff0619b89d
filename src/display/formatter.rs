//! Number formatting for calculation results and variables
//!
//! Calculations and variables use different percentage conventions:
//! a calculation result is already a percentage (`12.5` renders `12.5%`),
//! a variable stores a ratio (`0.125` renders `12.5%`). Keep the two
//! entry points separate so neither display changes silently.

use crate::config::Locale;
use crate::types::{ResultFormat, VariableFormat};

/// Render a calculation result in its declared display format
pub fn format_result(value: f64, format: ResultFormat, locale: &Locale) -> String {
    match format {
        ResultFormat::Currency => currency(value, locale),
        ResultFormat::Percentage => {
            format!("{}%", render(value, 1, 1, None, locale.decimal_separator))
        }
        ResultFormat::Number => number(value, locale),
    }
}

/// Render a variable's value in its declared display format
pub fn format_variable(value: f64, format: VariableFormat, locale: &Locale) -> String {
    match format {
        VariableFormat::Currency => currency(value, locale),
        VariableFormat::Percentage => format!(
            "{}%",
            render(
                value * 100.0,
                0,
                1,
                Some(locale.thousands_separator),
                locale.decimal_separator
            )
        ),
        VariableFormat::Number => number(value, locale),
    }
}

fn number(value: f64, locale: &Locale) -> String {
    render(
        value,
        0,
        2,
        Some(locale.thousands_separator),
        locale.decimal_separator,
    )
}

fn currency(value: f64, locale: &Locale) -> String {
    let digits = render(
        value.abs(),
        2,
        2,
        Some(locale.thousands_separator),
        locale.decimal_separator,
    );
    let sign = if is_negative(value, 2) { "-" } else { "" };
    if locale.symbol_first {
        format!("{sign}{}{digits}", locale.currency_symbol)
    } else {
        format!("{sign}{digits} {}", locale.currency_symbol)
    }
}

/// True when `value` is still negative after rounding to `decimals`
fn is_negative(value: f64, decimals: usize) -> bool {
    value.is_finite()
        && value < 0.0
        && format!("{:.*}", decimals, value.abs())
            .bytes()
            .any(|b| b.is_ascii_digit() && b != b'0')
}

/// Round to `max_decimals`, drop trailing zeros down to `min_decimals`,
/// group the integer part. Non-finite values render as zero.
fn render(
    value: f64,
    min_decimals: usize,
    max_decimals: usize,
    grouping: Option<char>,
    decimal_separator: char,
) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let fixed = format!("{:.*}", max_decimals, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut frac = frac_part.to_string();
    while frac.len() > min_decimals && frac.ends_with('0') {
        frac.pop();
    }

    let int_part = match grouping {
        Some(sep) => group_thousands(int_part, sep),
        None => int_part.to_string(),
    };

    let sign = if is_negative(value, max_decimals) { "-" } else { "" };
    if frac.is_empty() {
        format!("{sign}{int_part}")
    } else {
        format!("{sign}{int_part}{decimal_separator}{frac}")
    }
}

fn group_thousands(digits: &str, sep: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}
