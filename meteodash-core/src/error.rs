use reqwest::StatusCode;
use thiserror::Error;

/// Classified failure of a provider request.
///
/// Every variant reaches the immediate caller; nothing is retried or swallowed
/// inside the client.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// DNS, connect, timeout or body read failure.
    #[error("Network error: {0}")]
    Network(String),

    /// Missing credential, or the provider rejected it (401/403).
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The provider knows no place matching the query (404).
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// Provider-side failure (5xx).
    #[error("Weather provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Success status but the body does not match the expected schema.
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// The location query was blank.
    #[error("Invalid location query: {0}")]
    InvalidQuery(String),

    /// Any other non-success status, e.g. 400 or 429.
    #[error("Provider returned {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },
}

impl WeatherError {
    /// Map a non-success HTTP status to its error kind.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth(message),
            StatusCode::NOT_FOUND => Self::LocationNotFound(message),
            s if s.is_server_error() => Self::ProviderUnavailable(message),
            s => Self::UnexpectedStatus { status: s.as_u16(), message },
        }
    }

    /// Short user-facing suggestion for the presentation layer.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Network(_) => "Check your internet connection and try again.",
            Self::Auth(_) => {
                "Set OPENWEATHER_API_KEY or run `meteodash configure` to store a valid API key."
            }
            Self::LocationNotFound(_) => {
                "Try another location, optionally with a country code (e.g. \"Madrid,ES\")."
            }
            Self::ProviderUnavailable(_) => "The weather service is having trouble; try again later.",
            Self::MalformedResponse(_) => "The weather service returned unexpected data.",
            Self::InvalidQuery(_) => "Enter a city name to look up.",
            Self::UnexpectedStatus { .. } => "The weather service rejected the request.",
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL so the appid query parameter never ends up in messages.
        Self::Network(err.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_class_statuses() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = WeatherError::from_status(status, "Invalid API key".into());
            assert!(matches!(err, WeatherError::Auth(ref m) if m == "Invalid API key"));
        }
    }

    #[test]
    fn not_found_maps_to_location() {
        let err = WeatherError::from_status(StatusCode::NOT_FOUND, "city not found".into());
        assert!(matches!(err, WeatherError::LocationNotFound(_)));
    }

    #[test]
    fn every_server_error_is_provider_unavailable() {
        for code in 500..=599u16 {
            let status = StatusCode::from_u16(code).unwrap();
            let err = WeatherError::from_status(status, String::new());
            assert!(matches!(err, WeatherError::ProviderUnavailable(_)), "{code}");
        }
    }

    #[test]
    fn other_client_errors_keep_status() {
        let err = WeatherError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow down".into());
        match err {
            WeatherError::UnexpectedStatus { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "slow down");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn display_includes_detail() {
        let err = WeatherError::LocationNotFound("city not found".into());
        assert_eq!(err.to_string(), "Location not found: city not found");
        assert!(err.hint().contains("country code"));
    }
}
