//! Text formatting used on the printed invoice.
//!
//! Money goes through [`round_cents`] before printing, the same rounding the
//! store applies before binding, so 9.005 prints `$9.01` and 1.005 prints `$1.00`.

use chrono::NaiveDate;

use crate::models::round_cents;

/// `March 4, 2025`, independent of locale
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Currency prefix, exactly two decimals, no thousands separators
pub fn format_money(amount: f64) -> String {
    format!("${:.2}", round_cents(amount))
}

pub fn format_quantity(quantity: i32) -> String {
    quantity.to_string()
}
