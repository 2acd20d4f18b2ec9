use thiserror::Error;

/// Terminal failure of a single route assessment.
///
/// Every variant ends the request; partial results are never returned.
#[derive(Debug, Error)]
pub enum AssessError {
    #[error("{0}")]
    Validation(String),

    #[error("Could not geocode one or both cities.")]
    GeocodeNotFound,

    #[error("Failed to fetch weather. Check API key or network.")]
    WeatherUnavailable,

    #[error("Model not loaded.")]
    ClassifierUnavailable,

    #[error("Model prediction failed: {0}")]
    PredictionFailed(String),
}

impl AssessError {
    pub fn missing_fields() -> Self {
        Self::Validation("Please provide from_city, to_city, and travel_date.".to_string())
    }

    pub fn invalid_timestamp() -> Self {
        Self::Validation("travel_date or travel_time format invalid.".to_string())
    }

    /// HTTP status code the error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            AssessError::Validation(_) | AssessError::GeocodeNotFound => 400,
            AssessError::WeatherUnavailable
            | AssessError::ClassifierUnavailable
            | AssessError::PredictionFailed(_) => 500,
        }
    }
}
