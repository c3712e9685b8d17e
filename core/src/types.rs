//! Shared primitive types and calendar helpers used across the engines.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// The stable identity of a person across orders (Olist `customer_unique_id`).
pub type CustomerId = String;

pub type OrderId = String;

/// Purchase and delivery instants. The dataset carries no timezone.
pub type Timestamp = NaiveDateTime;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// First day of the month containing `ts`.
pub fn month_start(ts: &Timestamp) -> NaiveDate {
    first_of_month(ts.date())
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month.
    date.with_day(1).unwrap_or(date)
}

/// Calendar months elapsed from `from` to `to`, ignoring the day of month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() * 12 + to.month() as i32) - (from.year() * 12 + from.month() as i32)
}

/// Fractional days between two instants (negative when `to` precedes `from`).
pub fn days_between(from: &Timestamp, to: &Timestamp) -> f64 {
    (*to - *from).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Round half away from zero to two decimals.
pub fn round2(value: f64) -> f64 {
    round_to(value, 2)
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
