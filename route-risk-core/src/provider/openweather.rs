use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;

use crate::{
    config::ProviderConfig,
    model::{Place, WeatherObservation},
};

use super::{Geocoder, WeatherSource};

const HPA_TO_INHG: f64 = 0.02953;
const METERS_PER_MILE: f64 = 1609.344;
const MM_TO_IN: f64 = 0.0393701;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    geocode_url: String,
    weather_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
            geocode_url: cfg.geocode_url.clone(),
            weather_url: cfg.weather_url.clone(),
            http,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("OPENWEATHER_API_KEY is not configured"))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to OpenWeather ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read OpenWeather {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather {} request failed with status {}: {}",
                what,
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).with_context(|| format!("Failed to parse OpenWeather {what} JSON"))
    }
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    lat: f64,
    lon: f64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl OwGeoEntry {
    fn into_place(self) -> Place {
        let display_name = [self.name, self.state, self.country]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Place { lat: self.lat, lon: self.lon, display_name }
    }
}

#[derive(Debug, Default, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwPrecip {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OwWeather {
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    main: OwMain,
    #[serde(default)]
    wind: OwWind,
    visibility: Option<f64>,
    rain: Option<OwPrecip>,
    snow: Option<OwPrecip>,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

impl OwCurrentResponse {
    /// Convert provider units (hPa, meters, mm) to inches and miles.
    fn normalize(self) -> WeatherObservation {
        let precip_mm = match (&self.rain, &self.snow) {
            (Some(rain), _) => rain.one_hour.unwrap_or(0.0),
            (None, Some(snow)) => snow.one_hour.unwrap_or(0.0),
            (None, None) => 0.0,
        };

        let weather = self.weather.into_iter().next().unwrap_or_default();

        WeatherObservation {
            temp_f: self.main.temp,
            humidity_pct: self.main.humidity,
            // A zero reading is a provider placeholder, not a real pressure.
            pressure_in: self.main.pressure.filter(|hpa| *hpa != 0.0).map(|hpa| hpa * HPA_TO_INHG),
            wind_mph: self.wind.speed,
            visibility_mi: self.visibility.map(|m| m / METERS_PER_MILE),
            precip_in: Some(precip_mm * MM_TO_IN),
            condition_main: weather.main,
            condition_desc: weather.description,
        }
    }
}

#[async_trait]
impl Geocoder for OpenWeatherProvider {
    async fn geocode(&self, query: &str) -> Result<Option<Place>> {
        let params = [
            ("q", query.to_string()),
            ("limit", "1".to_string()),
            ("appid", self.api_key()?.to_string()),
        ];

        let entries: Vec<OwGeoEntry> = self.get_json(&self.geocode_url, &params, "geocoding").await?;

        Ok(entries.into_iter().next().map(OwGeoEntry::into_place))
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherProvider {
    async fn current_weather(&self, lat: f64, lon: f64) -> Result<WeatherObservation> {
        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("appid", self.api_key()?.to_string()),
            ("units", "imperial".to_string()),
        ];

        let parsed: OwCurrentResponse =
            self.get_json(&self.weather_url, &params, "current weather").await?;

        Ok(parsed.normalize())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
