//! Formatting utilities for the Graphite plaintext protocol
//!
//! Value formatting, option list splitting and batch serialization shared by
//! the naming engine and the transports.

use crate::types::GraphiteRecord;

/// Number of digits written after the decimal point of a point value
pub const VALUE_PRECISION: usize = 6;

/// Format a point value as a fixed-point decimal with six fractional digits
///
/// Non-finite values use the spelling Carbon understands (`NaN`, `+Inf`, `-Inf`).
///
/// # Examples
/// ```rust
/// use tyl_graphite_handler::format_point_value;
///
/// assert_eq!(format_point_value(87.5), "87.500000");
/// assert_eq!(format_point_value(-3.0), "-3.000000");
/// ```
pub fn format_point_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        let spelling = if value.is_sign_positive() { "+Inf" } else { "-Inf" };
        spelling.to_string()
    } else {
        format!("{:.*}", VALUE_PRECISION, value)
    }
}

/// Format a record count as a plain integer string
pub fn format_count(count: usize) -> String {
    count.to_string()
}

/// Split a comma-separated option value into its keys
///
/// Keys are kept verbatim (no trimming); empty entries are dropped since no
/// label or annotation can be looked up under an empty key.
///
/// # Examples
/// ```rust
/// use tyl_graphite_handler::split_keys;
///
/// assert_eq!(split_keys("region,team"), vec!["region", "team"]);
/// assert!(split_keys("").is_empty());
/// ```
pub fn split_keys(list: &str) -> Vec<String> {
    list.split(',')
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serialize a batch into newline-terminated protocol lines
pub fn format_lines(records: &[GraphiteRecord]) -> String {
    records.iter().map(GraphiteRecord::to_line).collect()
}
