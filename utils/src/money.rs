//! Money formatting helpers.

/// Format minor units as a major-unit decimal with two fraction digits.
pub fn format_cents(cents: u64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}
