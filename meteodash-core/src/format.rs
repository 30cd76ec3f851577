//! Display helpers shared by dashboard front ends.

use chrono::{DateTime, NaiveDate, TimeZone};

use crate::UnitSystem;

const PLACEHOLDER: &str = "-";

/// `21.5°C`, or `-` when the value is unknown.
pub fn format_temperature(value: Option<f64>, units: UnitSystem) -> String {
    match value {
        Some(v) => format!("{v:.1}{}", units.temperature_label()),
        None => PLACEHOLDER.to_string(),
    }
}

/// `3.2 m/s` / `7.0 mph`, or `-` when the value is unknown.
pub fn format_wind(value: Option<f64>, units: UnitSystem) -> String {
    match value {
        Some(v) => format!("{v:.1} {}", units.wind_speed_label()),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    dt.format("%d %b %Y, %H:%M").to_string()
}

/// Abbreviated weekday of a calendar date, e.g. `Mon`.
pub fn day_name(date: NaiveDate) -> String {
    date.format("%a").to_string()
}
