use crate::{
    distance::RouteEstimate,
    features::FeatureVector,
    model::{Place, RouteAssessment, WeatherObservation},
};

pub const UNKNOWN_SEVERITY: &str = "Unknown";

/// Human-readable message for a severity class. Out-of-range classes are not an error.
pub fn severity_message(severity: i64) -> &'static str {
    match severity {
        1 => "🟢 Low Risk – Conditions are safe.",
        2 => "🟠 Moderate Risk – Mild hazard due to weather/visibility.",
        3 => "🔴 High Risk – Strong influence of weather or congestion.",
        4 => "⚫ Severe Risk – Very high chance of accident under given conditions.",
        _ => UNKNOWN_SEVERITY,
    }
}

/// Everything the pipeline gathered for one request.
#[derive(Debug)]
pub struct AssessmentParts<'a> {
    pub from: &'a Place,
    pub to: &'a Place,
    pub route: RouteEstimate,
    pub weather_from: WeatherObservation,
    pub weather_to: WeatherObservation,
    pub features: FeatureVector,
    pub severity: i64,
}

pub fn assemble(parts: AssessmentParts<'_>) -> RouteAssessment {
    RouteAssessment {
        route: format!("{} → {}", parts.from.display_name, parts.to.display_name),
        distance_miles: round_to(parts.route.distance_miles, 2),
        estimated_duration_min: round_to(parts.route.duration_min, 1),
        severity: parts.severity,
        message: severity_message(parts.severity).to_string(),
        weather_from: parts.weather_from,
        weather_to: parts.weather_to,
        feature_input: parts.features,
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
