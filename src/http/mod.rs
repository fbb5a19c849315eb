//! HTTP surface: axum router, handlers and error mapping.
//!
//! Routes:
//! - `GET /` welcome message
//! - `GET /health` per-disease load state
//! - `POST /predict/:disease` for `diabetes`, `heart` and `parkinsons`

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::application::{PredictionResponse, PredictionService};
use crate::domain::{Disease, FieldError, ValidationError};
use crate::MediPredictError;

/// Error returned to HTTP clients. Internal detail stays in the logs.
#[derive(Debug)]
pub enum ApiError {
    UnknownDisease(String),
    MalformedBody(ValidationError),
    Invalid(ValidationError),
    ModelUnavailable(Disease),
    Internal,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    detail: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

impl From<MediPredictError> for ApiError {
    fn from(err: MediPredictError) -> Self {
        match err {
            MediPredictError::Validation(e) => Self::Invalid(e),
            MediPredictError::ModelUnavailable(d) => Self::ModelUnavailable(d),
            other => {
                tracing::error!("Prediction failed: {}", other);
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail, errors) = match &self {
            Self::UnknownDisease(_) => (StatusCode::NOT_FOUND, "unknown disease", None),
            Self::MalformedBody(e) => {
                (StatusCode::BAD_REQUEST, "invalid request body", Some(&e.errors[..]))
            }
            Self::Invalid(e) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation failed",
                Some(&e.errors[..]),
            ),
            Self::ModelUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "model not available", None)
            }
            Self::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error", None),
        };
        (status, Json(ErrorBody { detail, errors })).into_response()
    }
}

/// Build the router over a shared prediction service.
pub fn router(service: Arc<PredictionService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict/:disease", post(predict))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "MediPredict multi-disease prediction API" }))
}

async fn health(State(service): State<Arc<PredictionService>>) -> Response {
    let registry = service.registry();
    let models: serde_json::Map<String, Value> = registry
        .status()
        .into_iter()
        .map(|(d, loaded)| (d.slug().to_string(), Value::Bool(loaded)))
        .collect();

    let (status, label) = if registry.loaded_count() > 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };
    (status, Json(json!({ "status": label, "models": models }))).into_response()
}

async fn predict(
    Path(slug): Path<String>,
    State(service): State<Arc<PredictionService>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let disease: Disease = slug.parse().map_err(|_| ApiError::UnknownDisease(slug))?;

    let Json(raw) = body.map_err(|rejection| {
        tracing::debug!("Rejected {} body: {}", disease, rejection.body_text());
        ApiError::MalformedBody(ValidationError::body("request body must be valid JSON"))
    })?;

    // Classification and the narrative call are blocking.
    let response = tokio::task::spawn_blocking(move || service.predict(disease, &raw))
        .await
        .map_err(|e| {
            tracing::error!("Prediction worker for {} failed: {}", disease, e);
            ApiError::Internal
        })??;

    tracing::info!(
        "Served {} prediction (risk_level={})",
        disease,
        response.risk_level
    );
    Ok(Json(response))
}
