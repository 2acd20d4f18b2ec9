use anyhow::Context;
use clap::{Parser, Subcommand};
use route_risk_core::{
    AssessContext, Classifier, Config, FeatureSchema, load_classifier, openweather_from_config,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{error, info, warn};

use crate::http;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "route-risk", version, about = "Road trip accident-risk assistant")]
pub struct Cli {
    /// Path to the config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service.
    Serve {
        /// Listen address, e.g. "0.0.0.0:5000". Overrides config and ROUTE_RISK_BIND.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Interactively set the provider API key and model artifact paths.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let path = match self.config {
            Some(path) => path,
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Serve { bind } => {
                let mut config = Config::load_from(&path)?;
                config.apply_env();
                if let Some(bind) = bind {
                    config.server.bind = bind;
                }
                serve(config).await
            }
            Command::Configure => configure(&path),
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let ctx = Arc::new(build_context(&config)?);
    let app = http::router(ctx);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Wire the provider, schema and classifier. A model that fails to load is logged and the
/// service starts anyway; prediction requests then fail with "Model not loaded.".
fn build_context(config: &Config) -> anyhow::Result<AssessContext> {
    if config.has_api_key() {
        info!("OpenWeather API key loaded");
    } else {
        warn!("OPENWEATHER_API_KEY not set; geocoding and weather requests will fail");
    }

    let provider = openweather_from_config(config)?;

    let (classifier, schema) = match load_model(config) {
        Ok((classifier, schema)) => {
            info!(columns = schema.columns.len(), "loaded model and feature columns");
            (Some(classifier), schema)
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "failed to load model or feature columns");
            (None, FeatureSchema::default())
        }
    };

    Ok(AssessContext::new(provider.clone(), provider, classifier, schema))
}

fn load_model(config: &Config) -> anyhow::Result<(Arc<dyn Classifier>, FeatureSchema)> {
    let classifier = load_classifier(&config.model.model_path)?;
    let schema = FeatureSchema::load(&config.model.features_path)?;
    Ok((classifier, schema))
}

fn configure(path: &Path) -> anyhow::Result<()> {
    // File values only; env overrides stay out of the saved config.
    let mut config = Config::load_from(path)?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_help_message("Leave empty to keep the current key")
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.set_api_key(api_key.trim().to_string());
    }

    let model_path = inquire::Text::new("Model artifact path:")
        .with_default(&config.model.model_path.to_string_lossy())
        .prompt()?;
    config.model.model_path = PathBuf::from(model_path);

    let features_path = inquire::Text::new("Feature columns path:")
        .with_default(&config.model.features_path.to_string_lossy())
        .prompt()?;
    config.model.features_path = PathBuf::from(features_path);

    config.save_to(path)?;
    println!("Configuration saved to {}", path.display());

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
