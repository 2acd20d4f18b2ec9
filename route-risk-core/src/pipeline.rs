//! Route risk assessment: geocode → weather → distance → features → classify → assemble.
//!
//! Each stage short-circuits on failure. Nothing is retried and no state survives a request
//! apart from the read-only [`AssessContext`].

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::{
    classifier::Classifier,
    distance::RouteEstimate,
    error::AssessError,
    features::{FeatureSchema, build_features},
    model::{Place, RouteAssessment, RouteQuery, WeatherObservation},
    provider::{Geocoder, WeatherSource},
    severity::{AssessmentParts, assemble},
};

/// Process-wide collaborators, built once at startup and shared across requests.
#[derive(Debug, Clone)]
pub struct AssessContext {
    pub geocoder: Arc<dyn Geocoder>,
    pub weather: Arc<dyn WeatherSource>,
    /// `None` when the model artifact failed to load.
    pub classifier: Option<Arc<dyn Classifier>>,
    pub schema: FeatureSchema,
}

impl AssessContext {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        weather: Arc<dyn WeatherSource>,
        classifier: Option<Arc<dyn Classifier>>,
        schema: FeatureSchema,
    ) -> Self {
        Self { geocoder, weather, classifier, schema }
    }
}

pub async fn assess_route(
    ctx: &AssessContext,
    query: &RouteQuery,
) -> Result<RouteAssessment, AssessError> {
    let classifier = ctx.classifier.as_ref().ok_or(AssessError::ClassifierUnavailable)?;

    let (from, to) = tokio::join!(
        locate(ctx.geocoder.as_ref(), &query.from_city),
        locate(ctx.geocoder.as_ref(), &query.to_city),
    );
    let (from, to) = (from?, to?);

    let (weather_from, weather_to) = tokio::join!(
        observe(ctx.weather.as_ref(), &from),
        observe(ctx.weather.as_ref(), &to),
    );
    let (weather_from, weather_to) = (weather_from?, weather_to?);

    let route = RouteEstimate::between(&from, &to);
    let features = ctx.schema.align(&build_features(&weather_from, &weather_to, &route));
    debug!(?features, "classifier input");

    let severity = classifier.predict(&features).map_err(|e| {
        error!(error = %format!("{e:#}"), "prediction failed");
        AssessError::PredictionFailed(e.to_string())
    })?;

    info!(
        from = %from.display_name,
        to = %to.display_name,
        travel_at = %query.travel_at,
        distance_miles = route.distance_miles,
        severity,
        "route assessed"
    );

    Ok(assemble(AssessmentParts {
        from: &from,
        to: &to,
        route,
        weather_from,
        weather_to,
        features,
        severity,
    }))
}

async fn locate(geocoder: &dyn Geocoder, city: &str) -> Result<Place, AssessError> {
    match geocoder.geocode(city).await {
        Ok(Some(place)) => Ok(place),
        Ok(None) => {
            warn!(city, "no geocoding match");
            Err(AssessError::GeocodeNotFound)
        }
        Err(e) => {
            warn!(city, error = %format!("{e:#}"), "geocoding failed");
            Err(AssessError::GeocodeNotFound)
        }
    }
}

async fn observe(source: &dyn WeatherSource, place: &Place) -> Result<WeatherObservation, AssessError> {
    source.current_weather(place.lat, place.lon).await.map_err(|e| {
        warn!(place = %place.display_name, error = %format!("{e:#}"), "weather fetch failed");
        AssessError::WeatherUnavailable
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{DURATION, FeatureValue, FeatureVector, TEMPERATURE, WEATHER_CONDITION};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::{
        collections::HashMap,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };

    #[derive(Debug, Default)]
    struct FakeGeocoder {
        places: HashMap<String, Place>,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeGeocoder {
        fn with(places: &[(&str, f64, f64, &str)]) -> Self {
            let places = places
                .iter()
                .map(|(q, lat, lon, name)| {
                    (q.to_string(), Place { lat: *lat, lon: *lon, display_name: name.to_string() })
                })
                .collect();
            Self { places, ..Default::default() }
        }
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn geocode(&self, query: &str) -> anyhow::Result<Option<Place>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("connection timed out"));
            }
            Ok(self.places.get(query).cloned())
        }
    }

    #[derive(Debug, Default)]
    struct FakeWeather {
        by_lat: HashMap<i64, WeatherObservation>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherSource for FakeWeather {
        async fn current_weather(&self, lat: f64, _lon: f64) -> anyhow::Result<WeatherObservation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("OpenWeather current weather request failed with status 401"));
            }
            Ok(self.by_lat.get(&(lat as i64)).cloned().unwrap_or_default())
        }
    }

    #[derive(Debug)]
    struct RecordingClassifier {
        result: anyhow::Result<i64>,
        seen: Mutex<Option<FeatureVector>>,
    }

    impl RecordingClassifier {
        fn returning(severity: i64) -> Self {
            Self { result: Ok(severity), seen: Mutex::new(None) }
        }

        fn failing() -> Self {
            Self { result: Err(anyhow!("shape mismatch")), seen: Mutex::new(None) }
        }
    }

    impl Classifier for RecordingClassifier {
        fn predict(&self, features: &FeatureVector) -> anyhow::Result<i64> {
            *self.seen.lock().unwrap() = Some(features.clone());
            match &self.result {
                Ok(v) => Ok(*v),
                Err(e) => Err(anyhow!("{e}")),
            }
        }
    }

    fn cities() -> FakeGeocoder {
        FakeGeocoder::with(&[
            ("Austin", 30.2672, -97.7431, "Austin, Texas, US"),
            ("Dallas", 32.7767, -96.7970, "Dallas, Texas, US"),
        ])
    }

    fn weather() -> FakeWeather {
        let mut by_lat = HashMap::new();
        by_lat.insert(
            30,
            WeatherObservation {
                temp_f: Some(80.0),
                condition_main: "Clouds".into(),
                condition_desc: "light rain".into(),
                ..Default::default()
            },
        );
        by_lat.insert(
            32,
            WeatherObservation {
                temp_f: Some(60.0),
                condition_main: "Clear".into(),
                condition_desc: "clear sky".into(),
                ..Default::default()
            },
        );
        FakeWeather { by_lat, ..Default::default() }
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            [TEMPERATURE, WEATHER_CONDITION, DURATION, "Start_Lng"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    fn query(from: &str, to: &str) -> RouteQuery {
        RouteQuery::parse(Some(from), Some(to), Some("2024-05-01"), None).unwrap()
    }

    fn context(
        geocoder: Arc<FakeGeocoder>,
        weather: Arc<FakeWeather>,
        classifier: Option<Arc<RecordingClassifier>>,
    ) -> AssessContext {
        AssessContext::new(
            geocoder,
            weather,
            classifier.map(|c| c as Arc<dyn Classifier>),
            schema(),
        )
    }

    #[tokio::test]
    async fn assesses_route_end_to_end() {
        let classifier = Arc::new(RecordingClassifier::returning(3));
        let ctx = context(Arc::new(cities()), Arc::new(weather()), Some(classifier.clone()));

        let result = assess_route(&ctx, &query("Austin", "Dallas")).await.expect("assessed");

        assert_eq!(result.route, "Austin, Texas, US → Dallas, Texas, US");
        assert_eq!(result.severity, 3);
        assert!(result.message.contains("High Risk"));
        assert!(result.distance_miles > 170.0 && result.distance_miles < 190.0);
        assert_eq!(
            result.estimated_duration_min,
            (result.distance_miles / 50.0 * 60.0 * 10.0).round() / 10.0
        );
        assert_eq!(result.weather_from.condition_desc, "light rain");

        let seen = classifier.seen.lock().unwrap().clone().expect("classifier called");
        assert_eq!(seen, result.feature_input);
        let names: Vec<_> = seen.names().collect();
        assert_eq!(names, [TEMPERATURE, WEATHER_CONDITION, DURATION, "Start_Lng"]);
        assert_eq!(seen.get(TEMPERATURE), Some(&FeatureValue::Number(70.0)));
        assert_eq!(
            seen.get(WEATHER_CONDITION),
            Some(&FeatureValue::Category("light rain".into()))
        );
        assert_eq!(seen.get("Start_Lng"), Some(&FeatureValue::Number(0.0)));
    }

    #[tokio::test]
    async fn out_of_range_severity_is_reported_as_unknown() {
        let classifier = Arc::new(RecordingClassifier::returning(9));
        let ctx = context(Arc::new(cities()), Arc::new(weather()), Some(classifier));

        let result = assess_route(&ctx, &query("Austin", "Dallas")).await.unwrap();
        assert_eq!(result.severity, 9);
        assert_eq!(result.message, "Unknown");
    }

    #[tokio::test]
    async fn missing_classifier_fails_before_any_outbound_call() {
        let geocoder = Arc::new(cities());
        let ctx = context(geocoder.clone(), Arc::new(weather()), None);

        let err = assess_route(&ctx, &query("Austin", "Dallas")).await.unwrap_err();
        assert!(matches!(err, AssessError::ClassifierUnavailable));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_city_is_geocode_not_found() {
        let weather = Arc::new(weather());
        let ctx = context(
            Arc::new(cities()),
            weather.clone(),
            Some(Arc::new(RecordingClassifier::returning(1))),
        );

        let err = assess_route(&ctx, &query("Austin", "Atlantis")).await.unwrap_err();
        assert!(matches!(err, AssessError::GeocodeNotFound));
        assert_eq!(err.status_code(), 400);
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn geocoder_error_is_indistinguishable_from_no_match() {
        let geocoder = FakeGeocoder { fail: true, ..cities() };
        let ctx = context(
            Arc::new(geocoder),
            Arc::new(weather()),
            Some(Arc::new(RecordingClassifier::returning(1))),
        );

        let err = assess_route(&ctx, &query("Austin", "Dallas")).await.unwrap_err();
        assert!(matches!(err, AssessError::GeocodeNotFound));
    }

    #[tokio::test]
    async fn weather_failure_is_unavailable() {
        let weather = FakeWeather { fail: true, ..weather() };
        let classifier = Arc::new(RecordingClassifier::returning(1));
        let ctx = context(Arc::new(cities()), Arc::new(weather), Some(classifier.clone()));

        let err = assess_route(&ctx, &query("Austin", "Dallas")).await.unwrap_err();
        assert!(matches!(err, AssessError::WeatherUnavailable));
        assert_eq!(err.status_code(), 500);
        assert!(classifier.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn classifier_error_is_prediction_failed() {
        let ctx = context(
            Arc::new(cities()),
            Arc::new(weather()),
            Some(Arc::new(RecordingClassifier::failing())),
        );

        let err = assess_route(&ctx, &query("Austin", "Dallas")).await.unwrap_err();
        assert!(matches!(err, AssessError::PredictionFailed(_)));
        assert!(err.to_string().contains("shape mismatch"));
    }
}
