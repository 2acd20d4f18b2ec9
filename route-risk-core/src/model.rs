use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::{error::AssessError, features::FeatureVector};

pub const DEFAULT_TRAVEL_TIME: &str = "12:00";

/// A geocoded location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
}

/// Current weather at one endpoint, in imperial units.
///
/// `None` means the provider did not report the field; it is never coerced to zero here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    #[serde(rename = "temp_F")]
    pub temp_f: Option<f64>,
    #[serde(rename = "humidity")]
    pub humidity_pct: Option<f64>,
    pub pressure_in: Option<f64>,
    pub wind_mph: Option<f64>,
    pub visibility_mi: Option<f64>,
    pub precip_in: Option<f64>,
    #[serde(rename = "weather_main")]
    pub condition_main: String,
    #[serde(rename = "weather_desc")]
    pub condition_desc: String,
}

/// A validated trip request.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteQuery {
    pub from_city: String,
    pub to_city: String,
    pub travel_at: NaiveDateTime,
}

impl RouteQuery {
    /// Validate raw request fields. Empty strings count as missing.
    pub fn parse(
        from_city: Option<&str>,
        to_city: Option<&str>,
        travel_date: Option<&str>,
        travel_time: Option<&str>,
    ) -> Result<Self, AssessError> {
        let (Some(from_city), Some(to_city), Some(travel_date)) =
            (present(from_city), present(to_city), present(travel_date))
        else {
            return Err(AssessError::missing_fields());
        };

        let travel_time = travel_time.unwrap_or(DEFAULT_TRAVEL_TIME).trim();
        let travel_at = parse_timestamp(travel_date, travel_time)?;

        Ok(Self {
            from_city: from_city.to_string(),
            to_city: to_city.to_string(),
            travel_at,
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_timestamp(date: &str, time: &str) -> Result<NaiveDateTime, AssessError> {
    let joined = format!("{date}T{time}");

    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&joined, fmt).ok())
        .ok_or_else(AssessError::invalid_timestamp)
}

/// Successful outcome of the pipeline, serialized as the `/predict_route` body.
#[derive(Debug, Clone, Serialize)]
pub struct RouteAssessment {
    pub route: String,
    pub distance_miles: f64,
    pub estimated_duration_min: f64,
    pub severity: i64,
    pub message: String,
    pub weather_from: WeatherObservation,
    pub weather_to: WeatherObservation,
    pub feature_input: FeatureVector,
}
