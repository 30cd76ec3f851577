//! Core library for the `meteodash` weather dashboard.
//!
//! This crate defines:
//! - The OpenWeatherMap client and its error classification
//! - Normalized domain models (snapshots, forecasts, air quality)
//! - Dashboard composition and display formatting
//! - Configuration & credentials handling
//!
//! It is used by `meteodash-cli`, but any front end can consume it: the
//! [`WeatherClient`] trait and [`fetch_dashboard`] are the entry points.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod model;
pub mod provider;

pub use config::Config;
pub use dashboard::{AirQualityStatus, Dashboard, fetch_dashboard};
pub use error::WeatherError;
pub use model::{
    AirQuality, ApiCredential, AqiLevel, ChartPoint, Coordinates, DailyForecast, Forecast,
    ForecastEntry, LocationQuery, RainProbability, UnitSystem, WeatherSnapshot,
};
pub use provider::{
    WeatherClient, client_from_config,
    openweather::{OpenWeatherClient, OpenWeatherConfig},
};
