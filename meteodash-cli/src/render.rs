//! Plain-text rendering of core results.

use std::fmt::Write;

use meteodash_core::{
    AirQualityStatus, Dashboard, WeatherSnapshot,
    format::{day_name, format_datetime, format_temperature, format_wind},
};

pub fn snapshot(s: &WeatherSnapshot) -> String {
    let mut out = String::new();
    let place = match &s.country {
        Some(country) => format!("{}, {country}", s.location_name),
        None => s.location_name.clone(),
    };

    let local = s.local_observed_at();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{place}  ({} {})", format_datetime(&local), local.format("%:z"));
    if let Some(desc) = &s.description {
        let _ = writeln!(out, "  {desc}");
    }
    let _ = writeln!(
        out,
        "  Temperature: {} (feels like {}, min {}, max {})",
        format_temperature(Some(s.temperature), s.units),
        format_temperature(Some(s.feels_like), s.units),
        format_temperature(Some(s.temp_min), s.units),
        format_temperature(Some(s.temp_max), s.units),
    );
    let _ = writeln!(out, "  Humidity:    {}%", s.humidity_pct);

    let direction = s.wind_direction_deg.map(|d| format!(" from {d}°")).unwrap_or_default();
    let _ = writeln!(out, "  Wind:        {}{direction}", format_wind(Some(s.wind_speed), s.units));

    match s.precipitation_mm {
        Some(mm) => {
            let _ = writeln!(out, "  Rain (1h):   {mm:.1} mm");
        }
        None => {
            let _ = writeln!(out, "  Rain (1h):   none");
        }
    }
    if let Some(mm) = s.precipitation_3h_mm {
        let _ = writeln!(out, "  Rain (3h):   {mm:.1} mm");
    }
    if let Some(pct) = s.precipitation_probability_pct {
        let _ = writeln!(out, "  Rain chance: {pct}%");
    }
    if let Some(level) = s.air_quality {
        let _ = writeln!(out, "  Air quality: {level}");
    }
    if let Some(p) = s.pressure_hpa {
        let _ = writeln!(out, "  Pressure:    {p:.0} hPa");
    }
    if let Some(v) = s.visibility_m {
        let _ = writeln!(out, "  Visibility:  {:.1} km", f64::from(v) / 1000.0);
    }
    if let (Some(rise), Some(set)) = (s.sunrise, s.sunset) {
        let _ = writeln!(
            out,
            "  Sun:         {} - {}",
            s.to_local(rise).format("%H:%M"),
            s.to_local(set).format("%H:%M"),
        );
    }
    out
}

pub fn dashboard(d: &Dashboard) -> String {
    let mut out = snapshot(&d.current);
    let units = d.current.units;

    let _ = writeln!(out, "\nForecast");
    for (day, rain) in d.daily.iter().zip(&d.rain_probability) {
        let weekday = day_name(day.date);
        let desc = day.entry.description.as_deref().unwrap_or("-");
        let _ = writeln!(
            out,
            "  {weekday} {}  {:>8}  rain {:>3}%  {desc}",
            day.date.format("%d %b"),
            format_temperature(Some(day.entry.temperature), units),
            rain.percent,
        );
    }

    let _ = writeln!(out, "\nAir quality: {}", d.air_quality.label());
    if let AirQualityStatus::Reported(aq) = &d.air_quality {
        let _ = writeln!(out, "  AQI {} of 5 (µg/m³)", aq.level.index());
        for key in ["pm10", "pm2_5", "o3", "co", "so2", "no2"] {
            let value = aq.components.get(key).map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
            let _ = writeln!(out, "  {:<6} {value}", key.to_uppercase());
        }
    }
    out
}
