use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use route_risk_core::{AssessContext, AssessError, RouteAssessment, RouteQuery, assess_route};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub type SharedContext = Arc<AssessContext>;

/// Body of `POST /predict_route`. Every field is optional so that missing ones surface as
/// a validation error rather than a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PredictRouteRequest {
    pub from_city: Option<String>,
    pub to_city: Option<String>,
    pub travel_date: Option<String>,
    pub travel_time: Option<String>,
}

/// An assessment failure rendered as `{"error": ...}` with its status code.
#[derive(Debug)]
pub struct ApiError(AssessError);

impl From<AssessError> for ApiError {
    fn from(err: AssessError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/predict_route", post(predict_route))
        .with_state(ctx)
        .layer(CorsLayer::permissive())
}

async fn home() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "Citizen Safety Assistant running." }))
}

// The body is parsed by hand so a missing or wrong Content-Type is still accepted.
async fn predict_route(
    State(ctx): State<SharedContext>,
    body: Bytes,
) -> Result<Json<RouteAssessment>, ApiError> {
    if ctx.classifier.is_none() {
        return Err(AssessError::ClassifierUnavailable.into());
    }

    let req: PredictRouteRequest = serde_json::from_slice(&body)
        .map_err(|e| AssessError::Validation(format!("Invalid JSON body: {e}")))?;

    let query = RouteQuery::parse(
        req.from_city.as_deref(),
        req.to_city.as_deref(),
        req.travel_date.as_deref(),
        req.travel_time.as_deref(),
    )?;

    let assessment = assess_route(&ctx, &query).await?;
    Ok(Json(assessment))
}
