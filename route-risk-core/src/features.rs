//! Feature derivation for the severity classifier.
//!
//! Two endpoint observations and a route estimate are merged into the fixed, ordered
//! feature vector the classifier was trained on. Absent weather readings are replaced by
//! [`SAFE_DEFAULTS`] before averaging, so the classifier never sees a missing value.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use std::{fs, path::Path};

use crate::{distance::RouteEstimate, model::WeatherObservation};

pub const TEMPERATURE: &str = "Temperature(F)";
pub const HUMIDITY: &str = "Humidity(%)";
pub const PRESSURE: &str = "Pressure(in)";
pub const VISIBILITY: &str = "Visibility(mi)";
pub const WIND_SPEED: &str = "Wind_Speed(mph)";
pub const PRECIPITATION: &str = "Precipitation(in)";
pub const WEATHER_CONDITION: &str = "Weather_Condition";
pub const DURATION: &str = "Duration(min)";

/// Fallbacks for weather readings the provider did not report.
pub const SAFE_DEFAULTS: [(&str, f64); 6] = [
    (VISIBILITY, 10.0),
    (TEMPERATURE, 70.0),
    (HUMIDITY, 70.0),
    (PRESSURE, 29.92),
    (WIND_SPEED, 8.0),
    (PRECIPITATION, 0.0),
];

/// Substrings that mark a weather condition as hazardous.
pub const HAZARD_KEYWORDS: [&str; 7] = ["rain", "snow", "thunder", "storm", "fog", "drizzle", "sleet"];

pub const CLEAR_CONDITION: &str = "Clear";

pub fn safe_default(name: &str) -> f64 {
    SAFE_DEFAULTS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Category(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(v) => Some(*v),
            FeatureValue::Category(_) => None,
        }
    }
}

/// Ordered name → value mapping. Serializes as a JSON object preserving order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(String, FeatureValue)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a feature, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: FeatureValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.entries.iter().find(|(key, _)| key == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Column order the classifier was trained with.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    pub columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Load the schema from a JSON array of column names.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read feature schema: {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse feature schema: {}", path.display()))
    }

    /// Reorder `features` to the schema. Columns the builder did not produce are
    /// zero-filled; columns the schema does not know are dropped.
    pub fn align(&self, features: &FeatureVector) -> FeatureVector {
        let mut aligned = FeatureVector::new();
        for column in &self.columns {
            let value = features.get(column).cloned().unwrap_or(FeatureValue::Number(0.0));
            aligned.insert(column.clone(), value);
        }
        aligned
    }
}

/// Merge both endpoint observations and the route estimate into builder-order features.
pub fn build_features(
    from: &WeatherObservation,
    to: &WeatherObservation,
    route: &RouteEstimate,
) -> FeatureVector {
    let numeric: [(&str, fn(&WeatherObservation) -> Option<f64>); 6] = [
        (TEMPERATURE, |o| o.temp_f),
        (HUMIDITY, |o| o.humidity_pct),
        (PRESSURE, |o| o.pressure_in),
        (VISIBILITY, |o| o.visibility_mi),
        (WIND_SPEED, |o| o.wind_mph),
        (PRECIPITATION, |o| o.precip_in),
    ];

    let mut features = FeatureVector::new();
    for (name, field) in numeric {
        let a = resolve(field(from), name);
        let b = resolve(field(to), name);
        features.insert(name, FeatureValue::Number((a + b) / 2.0));
    }

    features.insert(WEATHER_CONDITION, FeatureValue::Category(select_condition(from, to)));
    features.insert(DURATION, FeatureValue::Number(route.duration_min));

    features
}

fn resolve(value: Option<f64>, name: &str) -> f64 {
    match value {
        Some(v) if !v.is_nan() => v,
        _ => safe_default(name),
    }
}

/// First of `[from.main, from.desc, to.main, to.desc]` (lower-cased) containing a hazard
/// keyword, or `"Clear"`. Scan order is significant.
pub fn select_condition(from: &WeatherObservation, to: &WeatherObservation) -> String {
    [
        &from.condition_main,
        &from.condition_desc,
        &to.condition_main,
        &to.condition_desc,
    ]
    .into_iter()
    .map(|s| s.to_lowercase())
    .find(|s| HAZARD_KEYWORDS.iter().any(|k| s.contains(k)))
    .unwrap_or_else(|| CLEAR_CONDITION.to_string())
}
