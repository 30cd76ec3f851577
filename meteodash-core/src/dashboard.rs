//! Composition of everything the dashboard renders: current conditions, a
//! daily forecast summary, chart series and the air-quality card.

use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::{
    AirQuality, ChartPoint, DailyForecast, ForecastEntry, LocationQuery, RainProbability,
    UnitSystem, WeatherClient, WeatherError, WeatherSnapshot,
};

/// Outcome of the air-quality lookup. Never fails the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AirQualityStatus {
    Reported(AirQuality),
    /// The request failed at the transport level.
    Unreachable,
    /// The provider answered but the data could not be used.
    Unavailable,
}

impl AirQualityStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AirQualityStatus::Reported(aq) => aq.level.label(),
            AirQualityStatus::Unreachable => "No connection",
            AirQualityStatus::Unavailable => "Not available",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub current: WeatherSnapshot,
    pub daily: Vec<DailyForecast>,
    pub chart: Vec<ChartPoint>,
    pub rain_probability: Vec<RainProbability>,
    pub air_quality: AirQualityStatus,
}

/// Fetch current weather, forecast and air quality for `query`.
///
/// Current weather and forecast errors propagate; air quality degrades to
/// [`AirQualityStatus::Unreachable`] or [`AirQualityStatus::Unavailable`].
#[instrument(skip_all, fields(query = %query, units = %units))]
pub async fn fetch_dashboard(
    client: &dyn WeatherClient,
    query: &LocationQuery,
    units: UnitSystem,
) -> Result<Dashboard, WeatherError> {
    let mut current = client.fetch_current_weather(query, units).await?;
    let forecast = client.fetch_forecast(query, units).await?;

    let air_quality = match client.fetch_air_quality(current.coordinates).await {
        Ok(aq) => AirQualityStatus::Reported(aq),
        Err(err) if err.is_network() => {
            warn!(error = %err, "Air quality unreachable");
            AirQualityStatus::Unreachable
        }
        Err(err) => {
            warn!(error = %err, "Air quality unavailable");
            AirQualityStatus::Unavailable
        }
    };

    if let Some(nearest) = nearest_entry(&forecast.entries, &current) {
        current = current.with_precipitation_probability(pop_percent(nearest.pop));
    }
    if let AirQualityStatus::Reported(aq) = &air_quality {
        current = current.with_air_quality(aq.level);
    }

    let daily = aggregate_daily(&forecast.entries, forecast.utc_offset_secs);
    let chart = chart_points(&daily);
    let rain_probability = rain_probabilities(&daily);

    Ok(Dashboard { current, daily, chart, rain_probability, air_quality })
}

/// One entry per local calendar day: the 12:00 slot if present, otherwise the
/// middle slot of that day. Sorted by date.
pub fn aggregate_daily(entries: &[ForecastEntry], utc_offset_secs: i32) -> Vec<DailyForecast> {
    let offset = FixedOffset::east_opt(utc_offset_secs).unwrap_or_else(|| Utc.fix());

    let mut by_day: BTreeMap<NaiveDate, Vec<&ForecastEntry>> = BTreeMap::new();
    for entry in entries {
        let local = entry.at.with_timezone(&offset);
        by_day.entry(local.date_naive()).or_default().push(entry);
    }

    by_day
        .into_iter()
        .map(|(date, day)| {
            let noon = day.iter().find(|e| e.at.with_timezone(&offset).hour() == 12);
            let chosen = noon.copied().unwrap_or(day[day.len() / 2]);
            DailyForecast { date, entry: chosen.clone() }
        })
        .collect()
}

pub fn chart_points(daily: &[DailyForecast]) -> Vec<ChartPoint> {
    daily
        .iter()
        .map(|d| ChartPoint { date: d.date, temperature: d.entry.temperature })
        .collect()
}

pub fn rain_probabilities(daily: &[DailyForecast]) -> Vec<RainProbability> {
    daily
        .iter()
        .map(|d| RainProbability { date: d.date, percent: pop_percent(d.entry.pop) })
        .collect()
}

/// `floor(pop * 100)`, clamped to 0-100.
fn pop_percent(pop: f64) -> u8 {
    (pop * 100.0).floor().clamp(0.0, 100.0) as u8
}

fn nearest_entry<'a>(
    entries: &'a [ForecastEntry],
    current: &WeatherSnapshot,
) -> Option<&'a ForecastEntry> {
    entries
        .iter()
        .min_by_key(|e| (e.at - current.observed_at).num_seconds().abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AqiLevel, Coordinates, Forecast};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone};
    use std::sync::Mutex;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn entry(day: u32, hour: u32, temp: f64, pop: f64) -> ForecastEntry {
        ForecastEntry {
            at: at(day, hour),
            temperature: temp,
            description: Some("Clear sky".into()),
            icon_url: None,
            pop,
            precipitation_mm: None,
        }
    }

    fn snapshot() -> WeatherSnapshot {
        WeatherSnapshot {
            location_name: "Madrid".into(),
            country: Some("ES".into()),
            coordinates: Coordinates { lat: 40.4, lon: -3.7 },
            units: UnitSystem::Metric,
            observed_at: at(1, 10),
            utc_offset_secs: 0,
            temperature: 21.0,
            feels_like: 20.5,
            temp_min: 18.0,
            temp_max: 24.0,
            humidity_pct: 40,
            pressure_hpa: Some(1015.0),
            visibility_m: Some(10000),
            wind_speed: 2.0,
            wind_direction_deg: Some(90),
            precipitation_mm: None,
            precipitation_3h_mm: None,
            precipitation_probability_pct: None,
            air_quality: None,
            description: Some("Clear sky".into()),
            icon_url: None,
            sunrise: None,
            sunset: None,
        }
    }

    #[derive(Debug)]
    struct FakeClient {
        forecast: Vec<ForecastEntry>,
        air: Mutex<Option<Result<AirQuality, WeatherError>>>,
    }

    impl FakeClient {
        fn new(air: Result<AirQuality, WeatherError>) -> Self {
            Self {
                forecast: vec![
                    entry(1, 9, 19.0, 0.25),
                    entry(1, 12, 23.0, 0.5),
                    entry(2, 12, 25.0, 0.0),
                ],
                air: Mutex::new(Some(air)),
            }
        }
    }

    #[async_trait]
    impl WeatherClient for FakeClient {
        async fn fetch_current_weather(
            &self,
            _query: &LocationQuery,
            _units: UnitSystem,
        ) -> Result<WeatherSnapshot, WeatherError> {
            Ok(snapshot())
        }

        async fn fetch_forecast(
            &self,
            _query: &LocationQuery,
            units: UnitSystem,
        ) -> Result<Forecast, WeatherError> {
            Ok(Forecast {
                location_name: "Madrid".into(),
                country: Some("ES".into()),
                utc_offset_secs: 0,
                units,
                entries: self.forecast.clone(),
            })
        }

        async fn fetch_air_quality(&self, _at: Coordinates) -> Result<AirQuality, WeatherError> {
            self.air.lock().unwrap().take().expect("air quality fetched once")
        }
    }

    fn good_air() -> AirQuality {
        AirQuality {
            level: AqiLevel::Fair,
            measured_at: at(1, 10),
            components: BTreeMap::from([("pm2_5".to_string(), 7.5)]),
        }
    }

    #[test]
    fn aggregate_prefers_noon_entry() {
        let entries = vec![entry(1, 6, 10.0, 0.0), entry(1, 12, 20.0, 0.0), entry(1, 18, 15.0, 0.0)];
        let daily = aggregate_daily(&entries, 0);

        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].entry.temperature, 20.0);
    }

    #[test]
    fn aggregate_falls_back_to_middle_entry() {
        let entries = vec![entry(3, 15, 1.0, 0.0), entry(3, 18, 2.0, 0.0), entry(3, 21, 3.0, 0.0)];
        let daily = aggregate_daily(&entries, 0);

        assert_eq!(daily[0].entry.temperature, 2.0);
    }

    #[test]
    fn aggregate_sorts_days_and_uses_local_offset() {
        // 23:00 UTC on the 1st is 01:00 on the 2nd at UTC+2.
        let entries = vec![entry(2, 10, 5.0, 0.0), entry(1, 23, 4.0, 0.0), entry(1, 10, 3.0, 0.0)];
        let daily = aggregate_daily(&entries, 2 * 3600);

        let dates: Vec<_> = daily.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, ["2024-05-01", "2024-05-02"]);
        // 10:00 UTC on the 2nd is 12:00 local.
        assert_eq!(daily[1].entry.temperature, 5.0);
    }

    #[test]
    fn rain_probability_floors_percent() {
        let daily = aggregate_daily(&[entry(1, 12, 1.0, 0.289), entry(2, 12, 1.0, 1.0)], 0);
        let rain = rain_probabilities(&daily);

        assert_eq!(rain[0].percent, 28);
        assert_eq!(rain[1].percent, 100);
    }

    #[test]
    fn chart_follows_daily_temperatures() {
        let daily = aggregate_daily(&[entry(1, 12, 11.5, 0.0), entry(2, 12, 13.0, 0.0)], 0);
        let chart = chart_points(&daily);

        assert_eq!(chart.len(), 2);
        assert_eq!(chart[0].temperature, 11.5);
        assert_eq!(chart[1].date, daily[1].date);
    }

    #[test]
    fn empty_forecast_yields_empty_series() {
        assert!(aggregate_daily(&[], 0).is_empty());
    }

    #[tokio::test]
    async fn dashboard_enriches_current_conditions() {
        let client = FakeClient::new(Ok(good_air()));
        let query = LocationQuery::new("Madrid,ES").unwrap();

        let dash = fetch_dashboard(&client, &query, UnitSystem::Metric).await.unwrap();

        // Nearest slot to 10:00 is 09:00 with pop 0.25.
        assert_eq!(dash.current.precipitation_probability_pct, Some(25));
        assert_eq!(dash.current.air_quality, Some(AqiLevel::Fair));
        assert_eq!(dash.daily.len(), 2);
        assert_eq!(dash.rain_probability[0].percent, 50);
        assert!(matches!(dash.air_quality, AirQualityStatus::Reported(_)));
    }

    #[tokio::test]
    async fn air_quality_network_failure_degrades() {
        let client = FakeClient::new(Err(WeatherError::Network("connection refused".into())));
        let query = LocationQuery::new("Madrid").unwrap();

        let dash = fetch_dashboard(&client, &query, UnitSystem::Metric).await.unwrap();

        assert_eq!(dash.air_quality, AirQualityStatus::Unreachable);
        assert_eq!(dash.air_quality.label(), "No connection");
        assert_eq!(dash.current.air_quality, None);
    }

    #[tokio::test]
    async fn air_quality_provider_failure_degrades() {
        let client = FakeClient::new(Err(WeatherError::ProviderUnavailable("HTTP 503".into())));
        let query = LocationQuery::new("Madrid").unwrap();

        let dash = fetch_dashboard(&client, &query, UnitSystem::Metric).await.unwrap();

        assert_eq!(dash.air_quality, AirQualityStatus::Unavailable);
    }
}
