use thiserror::Error;

/// Failures surfaced by the weather core.
///
/// The type is `Clone` so one failure can be published on the
/// [`ViewStateBus`](crate::ViewStateBus) and still be returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("No results for '{0}'")]
    NoResults(String),

    #[error("Recent searches storage failed: {0}")]
    Store(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            WeatherError::Decode(err.to_string())
        } else {
            WeatherError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for WeatherError {
    fn from(err: std::io::Error) -> Self {
        WeatherError::Store(err.to_string())
    }
}

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;
