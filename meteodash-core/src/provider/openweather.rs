//! OpenWeatherMap client for the current weather, 5 day / 3 hour forecast and
//! air pollution endpoints.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::{
    error::WeatherError,
    model::{
        AirQuality, ApiCredential, AqiLevel, Coordinates, Forecast, ForecastEntry, LocationQuery,
        UnitSystem, WeatherSnapshot,
    },
};

use super::WeatherClient;

/// Connection settings for [`OpenWeatherClient`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    /// API base URL (default: <https://api.openweathermap.org/data/2.5>)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Transport timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Language for condition descriptions (default: "en")
    #[serde(default = "default_lang")]
    pub lang: String,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org/data/2.5".to_string()
}

const fn default_timeout() -> u64 {
    10
}

fn default_lang() -> String {
    "en".to_string()
}

impl Default for OpenWeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            lang: default_lang(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    credential: ApiCredential,
    config: OpenWeatherConfig,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(credential: ApiCredential, config: OpenWeatherConfig) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(WeatherError::from)?;

        Ok(Self { credential, config, http })
    }

    pub fn config(&self) -> &OpenWeatherConfig {
        &self.config
    }

    /// Single GET against `endpoint`, classified and decoded into `T`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, WeatherError> {
        if self.credential.is_blank() {
            return Err(WeatherError::Auth("no API key configured".to_string()));
        }

        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        debug!(url = %url, ?params, "Requesting OpenWeatherMap");

        let res = self
            .http
            .get(&url)
            .query(params)
            .query(&[("appid", self.credential.expose())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        debug!(%status, bytes = body.len(), "OpenWeatherMap responded");

        if !status.is_success() {
            let message = provider_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            return Err(WeatherError::from_status(status, message));
        }

        serde_json::from_str(&body).map_err(|e| WeatherError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    #[instrument(skip_all, fields(query = %query, units = %units))]
    async fn fetch_current_weather(
        &self,
        query: &LocationQuery,
        units: UnitSystem,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let parsed: OwCurrentResponse = self
            .get_json(
                "weather",
                &[
                    ("q", query.as_str()),
                    ("units", units.as_str()),
                    ("lang", self.config.lang.as_str()),
                ],
            )
            .await?;

        parsed.into_snapshot(units)
    }

    #[instrument(skip_all, fields(query = %query, units = %units))]
    async fn fetch_forecast(
        &self,
        query: &LocationQuery,
        units: UnitSystem,
    ) -> Result<Forecast, WeatherError> {
        let parsed: OwForecastResponse = self
            .get_json(
                "forecast",
                &[
                    ("q", query.as_str()),
                    ("units", units.as_str()),
                    ("lang", self.config.lang.as_str()),
                ],
            )
            .await?;

        parsed.into_forecast(units)
    }

    #[instrument(skip_all, fields(lat = %at.lat, lon = %at.lon))]
    async fn fetch_air_quality(&self, at: Coordinates) -> Result<AirQuality, WeatherError> {
        let lat = at.lat.to_string();
        let lon = at.lon.to_string();
        let parsed: OwAirResponse = self
            .get_json("air_pollution", &[("lat", lat.as_str()), ("lon", lon.as_str())])
            .await?;

        parsed.into_air_quality()
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    pressure: Option<f64>,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    deg: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct OwPrecip {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: i64,
    coord: OwCoord,
    main: OwMain,
    wind: OwWind,
    #[serde(default)]
    weather: Vec<OwWeather>,
    visibility: Option<u32>,
    rain: Option<OwPrecip>,
    snow: Option<OwPrecip>,
    sys: Option<OwSys>,
    #[serde(default)]
    timezone: i32,
}

impl OwCurrentResponse {
    fn into_snapshot(self, units: UnitSystem) -> Result<WeatherSnapshot, WeatherError> {
        if self.main.humidity > 100 {
            return Err(WeatherError::MalformedResponse(format!(
                "humidity {} is outside 0-100",
                self.main.humidity
            )));
        }

        let observed_at = unix_to_utc(self.dt)?;
        let sys = self.sys.unwrap_or(OwSys { country: None, sunrise: None, sunset: None });
        let sunrise = sys.sunrise.map(unix_to_utc).transpose()?;
        let sunset = sys.sunset.map(unix_to_utc).transpose()?;

        let (rain_1h, rain_3h) = self.rain.map_or((None, None), |p| (p.one_hour, p.three_hours));
        let (snow_1h, snow_3h) = self.snow.map_or((None, None), |p| (p.one_hour, p.three_hours));

        let condition = self.weather.into_iter().next();

        Ok(WeatherSnapshot {
            location_name: self.name,
            country: sys.country.filter(|c| !c.is_empty()),
            coordinates: Coordinates { lat: self.coord.lat, lon: self.coord.lon },
            units,
            observed_at,
            utc_offset_secs: self.timezone,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            temp_min: self.main.temp_min,
            temp_max: self.main.temp_max,
            humidity_pct: self.main.humidity,
            pressure_hpa: self.main.pressure,
            visibility_m: self.visibility,
            wind_speed: self.wind.speed,
            wind_direction_deg: self.wind.deg,
            precipitation_mm: sum_precip(rain_1h, snow_1h),
            precipitation_3h_mm: sum_precip(rain_3h, snow_3h),
            precipitation_probability_pct: None,
            air_quality: None,
            description: condition.as_ref().map(|w| capitalize(&w.description)),
            icon_url: condition.and_then(|w| w.icon).as_deref().and_then(icon_url),
            sunrise,
            sunset,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwForecastMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    pop: f64,
    rain: Option<OwPrecip>,
    snow: Option<OwPrecip>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    country: Option<String>,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

impl OwForecastResponse {
    fn into_forecast(self, units: UnitSystem) -> Result<Forecast, WeatherError> {
        let entries = self
            .list
            .into_iter()
            .map(|entry| {
                if !(0.0..=1.0).contains(&entry.pop) {
                    return Err(WeatherError::MalformedResponse(format!(
                        "precipitation probability {} is outside 0-1",
                        entry.pop
                    )));
                }
                let condition = entry.weather.into_iter().next();
                Ok(ForecastEntry {
                    at: unix_to_utc(entry.dt)?,
                    temperature: entry.main.temp,
                    description: condition.as_ref().map(|w| capitalize(&w.description)),
                    icon_url: condition.and_then(|w| w.icon).as_deref().and_then(icon_url),
                    pop: entry.pop,
                    precipitation_mm: sum_precip(
                        entry.rain.and_then(|p| p.three_hours),
                        entry.snow.and_then(|p| p.three_hours),
                    ),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Forecast {
            location_name: self.city.name,
            country: self.city.country.filter(|c| !c.is_empty()),
            utc_offset_secs: self.city.timezone,
            units,
            entries,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OwAirMain {
    aqi: u8,
}

#[derive(Debug, Deserialize)]
struct OwAirEntry {
    dt: i64,
    main: OwAirMain,
    #[serde(default)]
    components: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct OwAirResponse {
    list: Vec<OwAirEntry>,
}

impl OwAirResponse {
    fn into_air_quality(self) -> Result<AirQuality, WeatherError> {
        let entry = self.list.into_iter().next().ok_or_else(|| {
            WeatherError::MalformedResponse("air pollution response contained no data".to_string())
        })?;

        let level = AqiLevel::from_index(entry.main.aqi).ok_or_else(|| {
            WeatherError::MalformedResponse(format!("AQI {} is outside 1-5", entry.main.aqi))
        })?;

        Ok(AirQuality {
            level,
            measured_at: unix_to_utc(entry.dt)?,
            components: entry.components,
        })
    }
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| WeatherError::MalformedResponse(format!("invalid unix timestamp {ts}")))
}

fn sum_precip(rain: Option<f64>, snow: Option<f64>) -> Option<f64> {
    match (rain, snow) {
        (None, None) => None,
        (r, s) => Some(r.unwrap_or(0.0) + s.unwrap_or(0.0)),
    }
}

fn icon_url(code: &str) -> Option<String> {
    if code.is_empty() {
        return None;
    }
    Some(format!("https://openweathermap.org/img/wn/{code}@4x.png"))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Error text from a provider error body: its JSON `message`, else the raw body.
fn provider_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct OwErrorBody {
        message: Option<String>,
    }

    if let Ok(OwErrorBody { message: Some(message) }) = serde_json::from_str::<OwErrorBody>(body) {
        return Some(message);
    }

    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| truncate_body(trimmed))
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
