//! Core library for the `route-risk` service.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Abstractions over the geocoding/weather provider and the severity classifier
//! - The route risk assessment pipeline and its domain models
//!
//! It is used by `route-risk-server`, but can also be reused by other binaries or services.

pub mod classifier;
pub mod config;
pub mod distance;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod severity;

pub use classifier::{Classifier, TreeEnsemble, load_classifier};
pub use config::{Config, ModelConfig, ProviderConfig, ServerConfig};
pub use error::AssessError;
pub use features::{FeatureSchema, FeatureValue, FeatureVector};
pub use model::{Place, RouteAssessment, RouteQuery, WeatherObservation};
pub use pipeline::{AssessContext, assess_route};
pub use provider::{Geocoder, WeatherSource, openweather_from_config};
