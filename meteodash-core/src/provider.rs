use crate::{
    AirQuality, Config, Coordinates, Forecast, LocationQuery, UnitSystem, WeatherError,
    WeatherSnapshot, provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Entry point consumed by the presentation layer.
///
/// Each method performs exactly one provider request and returns either a fully
/// validated value or a classified [`WeatherError`].
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_current_weather(
        &self,
        query: &LocationQuery,
        units: UnitSystem,
    ) -> Result<WeatherSnapshot, WeatherError>;

    async fn fetch_forecast(
        &self,
        query: &LocationQuery,
        units: UnitSystem,
    ) -> Result<Forecast, WeatherError>;

    async fn fetch_air_quality(&self, at: Coordinates) -> Result<AirQuality, WeatherError>;
}

/// Construct the OpenWeatherMap client from config, resolving the credential
/// from `OPENWEATHER_API_KEY` first and the config file second.
pub fn client_from_config(config: &Config) -> anyhow::Result<OpenWeatherClient> {
    let credential = config.resolve_credential()?;
    let client = OpenWeatherClient::new(credential, config.client.clone())?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_config_uses_configured_key() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());

        // Env may or may not be set on the test host; either way a key resolves.
        assert!(client_from_config(&cfg).is_ok());
    }

    #[test]
    fn client_from_config_keeps_client_settings() {
        let mut cfg = Config::default();
        cfg.set_api_key("KEY".to_string());
        cfg.client.lang = "es".to_string();

        let client = client_from_config(&cfg).expect("client should build");
        assert_eq!(client.config().lang, "es");
    }
}
