//! HTTP API for airports, predictions, health checks and Prometheus metrics

use crate::config::AppConfig;
use crate::error::{outcome_to_result, AppError};
use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use delay_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{ServiceMetrics, StructuredLogger},
    AirportDisplay, AirportView, ModelMetadata, PredictionOutcome, PredictionReport,
    PredictionRequest, PredictionService, ServiceStatus, ValidationKind,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

const API_VERSION: &str = env!("CARGO_PKG_VERSION");

const ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /health",
    "GET /readyz",
    "GET /metrics",
    "GET /airports",
    "GET /airports/{airport_id}",
    "POST /predict",
    "GET /predict/status",
];

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub health_registry: HealthRegistry,
    pub metrics: ServiceMetrics,
    pub logger: StructuredLogger,
    pub lazy_init: bool,
}

impl AppState {
    pub fn new(
        service: Arc<PredictionService>,
        health_registry: HealthRegistry,
        metrics: ServiceMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            service,
            health_registry,
            metrics,
            logger,
            lazy_init: true,
        }
    }

    pub fn with_lazy_init(mut self, lazy_init: bool) -> Self {
        self.lazy_init = lazy_init;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiInfo {
    pub message: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AirportsResponse {
    pub airports: Vec<AirportView>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionInput {
    pub day_of_week: u8,
    pub airport_id: i64,
    pub airport: AirportDisplay,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionDetails {
    pub delay_probability: f64,
    pub is_delayed: bool,
    pub no_delay_probability: f64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub status: String,
    pub input: PredictionInput,
    pub prediction: PredictionDetails,
    pub confidence: f64,
    pub model_info: ModelMetadata,
}

impl From<PredictionReport> for PredictionResponse {
    fn from(report: PredictionReport) -> Self {
        Self {
            status: "success".to_string(),
            input: PredictionInput {
                day_of_week: report.query.day_of_week,
                airport_id: report.query.airport_id,
                airport: report.airport.display(),
            },
            prediction: PredictionDetails {
                delay_probability: report.prediction.delay_probability,
                is_delayed: report.prediction.is_delayed,
                no_delay_probability: report.prediction.no_delay_probability,
            },
            confidence: report.prediction.confidence,
            model_info: report.model,
        }
    }
}

/// Run a service call on the blocking pool.
///
/// The service lock is held for the whole of a model load, so async workers
/// never touch it directly.
async fn with_service<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&PredictionService) -> T + Send + 'static,
    T: Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| {
            error!(error = %e, "Service task failed");
            AppError::Internal("Service task failed".to_string())
        })
}

/// Run initialization and publish the result to health, metrics and logs.
pub async fn initialize_service(state: &AppState) -> bool {
    let Ok((result, status)) =
        with_service(state, |service| (service.initialize(), service.status())).await
    else {
        return false;
    };

    if let Err(e) = &result {
        warn!(error = %e, "Prediction service not initialized");
    }

    if let Some(total) = status.airports.total_airports {
        state.metrics.set_airports_loaded(total);
    }

    if status.initialized {
        let (airport_source, model_source) = state.service.sources();
        if let Some(details) = &status.model.metadata {
            state.logger.log_model_loaded(&model_source, &details.metadata);
            state.metrics.set_model_info(&details.metadata);
        }
        state.logger.log_airports_loaded(
            &airport_source,
            status.airports.total_airports.unwrap_or(0),
            status.airports.mapped_airports.unwrap_or(0),
        );
    }

    sync_health(state, &status).await;
    status.initialized
}

/// Mirror a status snapshot into the health registry
async fn sync_health(state: &AppState, status: &ServiceStatus) {
    state
        .health_registry
        .set_loaded(
            components::AIRPORT_DIRECTORY,
            status.airports.total_airports.is_some(),
            status.airports_failure.as_deref(),
        )
        .await;
    state
        .health_registry
        .set_loaded(
            components::DELAY_PREDICTOR,
            status.model.is_loaded(),
            status.model_failure.as_deref(),
        )
        .await;
    state.health_registry.set_ready(status.initialized).await;
}

/// Retry initialization when enabled and the service is not ready
async fn ensure_initialized(state: &AppState) {
    if !state.lazy_init {
        return;
    }
    if let Ok(false) = with_service(state, |service| service.is_ready()).await {
        info!("Service not ready, retrying initialization");
        initialize_service(state).await;
    }
}

async fn root() -> Json<ApiInfo> {
    Json(ApiInfo {
        message: "Flight Delay Prediction API".to_string(),
        version: API_VERSION.to_string(),
        endpoints: ENDPOINTS.iter().map(|e| e.to_string()).collect(),
    })
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let buffer = state
        .metrics
        .encode()
        .map_err(|e| AppError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        buffer,
    )
        .into_response())
}

async fn list_airports(State(state): State<Arc<AppState>>) -> Result<Json<AirportsResponse>, AppError> {
    ensure_initialized(&state).await;

    let airports = with_service(&state, |service| service.list_airports())
        .await?
        .map_err(|e| {
            error!(error = %e, "Failed to list airports");
            AppError::Internal("Failed to load airport data".to_string())
        })?;

    info!(count = airports.len(), "Returning airports");
    Ok(Json(AirportsResponse {
        total: airports.len(),
        airports,
    }))
}

async fn get_airport(
    State(state): State<Arc<AppState>>,
    airport_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<AirportView>, AppError> {
    let Path(airport_id) = airport_id.map_err(|e| AppError::BadRequest(e.body_text()))?;
    ensure_initialized(&state).await;

    let airport = with_service(&state, move |service| service.airport(airport_id))
        .await?
        .map_err(|e| {
            error!(airport_id = airport_id, error = %e, "Failed to look up airport");
            AppError::Internal("Failed to load airport data".to_string())
        })?;

    airport
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Airport with ID {} not found", airport_id)))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictionRequest>, JsonRejection>,
) -> Result<Json<PredictionResponse>, AppError> {
    let start = Instant::now();

    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            let message = rejection.body_text();
            let outcome = PredictionOutcome::ValidationError {
                kind: ValidationKind::BadRequest,
                message: message.clone(),
            };
            record(&state, &outcome, start);
            return Err(AppError::Prediction {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                message,
                input: Value::Null,
            });
        }
    };

    // Shape errors are reported before any initialization attempt
    if request.validate().is_ok() {
        ensure_initialized(&state).await;
    }

    let input = request.echo();
    let outcome = with_service(&state, move |service| service.predict(&request))
        .await
        .unwrap_or_else(|_| PredictionOutcome::InternalError {
            message: "prediction task failed".to_string(),
        });
    record(&state, &outcome, start);

    let report = outcome_to_result(outcome, input)?;
    Ok(Json(PredictionResponse::from(report)))
}

fn record(state: &AppState, outcome: &PredictionOutcome, start: Instant) {
    let elapsed = start.elapsed().as_secs_f64();
    state.metrics.observe_prediction_latency(elapsed);
    state.metrics.record_outcome(outcome);
    state.logger.log_prediction(outcome, elapsed);
}

async fn predict_status(State(state): State<Arc<AppState>>) -> Result<Json<ServiceStatus>, AppError> {
    ensure_initialized(&state).await;
    Ok(Json(with_service(&state, |service| service.status()).await?))
}

fn cors_layer(origins: Option<Vec<String>>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match origins {
        None => layer.allow_origin(Any),
        Some(origins) => {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(values))
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>, cors_origins: Option<Vec<String>>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/airports", get(list_airports))
        .route("/airports/:airport_id", get(get_airport))
        .route("/predict", post(predict))
        .route("/predict/status", get(predict_status))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve(
    config: &AppConfig,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state, config.allowed_origins());

    let addr = config.bind_addr();
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
