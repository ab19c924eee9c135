//! Prediction orchestration
//!
//! [`PredictionService`] owns the airport directory and the delay predictor,
//! drives their lifecycle and turns public prediction requests into
//! [`PredictionOutcome`]s. The predictor is only ever called with an encoded
//! airport ID obtained from the directory in the same request.

use crate::directory::{AirportDirectory, AirportSource, DirectorySummary};
use crate::error::ServiceError;
use crate::models::{
    AirportRecord, AirportView, ModelMetadata, PredictionQuery, PredictionResult,
    MAX_DAY_OF_WEEK, MIN_DAY_OF_WEEK,
};
use crate::predictor::{DelayPredictor, ModelInfo, ModelSource};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, error, info, warn};

pub const INVALID_DAY_OF_WEEK: &str =
    "dayOfWeek must be an integer between 1 and 7 (1=Monday, 7=Sunday)";
pub const INVALID_AIRPORT_ID: &str = "airportId must be an integer";

/// Lifecycle state of the prediction service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

/// Raw prediction request as received from callers.
///
/// Fields are kept as JSON values so that type errors are reported by the
/// orchestrator rather than by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "dayOfWeek", default)]
    pub day_of_week: Value,
    #[serde(rename = "airportId", default)]
    pub airport_id: Value,
}

impl PredictionRequest {
    pub fn new(day_of_week: impl Into<Value>, airport_id: impl Into<Value>) -> Self {
        Self {
            day_of_week: day_of_week.into(),
            airport_id: airport_id.into(),
        }
    }

    /// Input echo included in error payloads
    pub fn echo(&self) -> Value {
        json!({
            "dayOfWeek": self.day_of_week,
            "airportId": self.airport_id,
        })
    }

    /// Validate field shapes and ranges
    pub fn validate(&self) -> Result<PredictionQuery, &'static str> {
        let day_of_week = integer_value(&self.day_of_week)
            .filter(|d| (MIN_DAY_OF_WEEK..=MAX_DAY_OF_WEEK).contains(d))
            .and_then(|d| u8::try_from(d).ok())
            .ok_or(INVALID_DAY_OF_WEEK)?;
        let airport_id = integer_value(&self.airport_id).ok_or(INVALID_AIRPORT_ID)?;

        Ok(PredictionQuery {
            day_of_week,
            airport_id,
        })
    }
}

/// Accepts JSON integers and integral floats
fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
                .map(|v| v as i64)
        }),
        _ => None,
    }
}

/// How a validation failure should be classified for callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    BadRequest,
    NotFound,
}

/// Successful prediction with everything needed for the response
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionReport {
    pub query: PredictionQuery,
    pub airport: AirportRecord,
    pub prediction: PredictionResult,
    pub model: ModelMetadata,
}

/// Result of a prediction request
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Success(PredictionReport),
    ValidationError { kind: ValidationKind, message: String },
    /// Airport exists but has no encoded model ID
    MappingError { message: String },
    /// Carries the internal detail; callers should not echo it
    InternalError { message: String },
}

impl PredictionOutcome {
    /// Label used for metrics and logs
    pub fn label(&self) -> &'static str {
        match self {
            PredictionOutcome::Success(_) => "success",
            PredictionOutcome::ValidationError { .. } => "validation_error",
            PredictionOutcome::MappingError { .. } => "mapping_error",
            PredictionOutcome::InternalError { .. } => "internal_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Success(_))
    }

    fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(error = %message, "Internal prediction error");
        PredictionOutcome::InternalError { message }
    }
}

/// Service status for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub initialized: bool,
    pub state: ServiceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airports_failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_failure: Option<String>,
    pub model: ModelInfo,
    pub airports: DirectorySummary,
}

struct Inner {
    state: ServiceState,
    directory: AirportDirectory,
    directory_failure: Option<String>,
    predictor: DelayPredictor,
    predictor_failure: Option<String>,
}

impl Inner {
    /// Component failures joined for display
    fn failure(&self) -> Option<String> {
        let failures: Vec<&str> = [&self.directory_failure, &self.predictor_failure]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .collect();
        (!failures.is_empty()).then(|| failures.join("; "))
    }
}

/// Caller-owned prediction service combining directory and predictor
pub struct PredictionService {
    airport_source: Box<dyn AirportSource>,
    model_source: Box<dyn ModelSource>,
    inner: RwLock<Inner>,
}

impl PredictionService {
    pub fn new(
        airport_source: impl AirportSource + 'static,
        model_source: impl ModelSource + 'static,
    ) -> Self {
        Self {
            airport_source: Box::new(airport_source),
            model_source: Box::new(model_source),
            inner: RwLock::new(Inner {
                state: ServiceState::Uninitialized,
                directory: AirportDirectory::new(),
                directory_failure: None,
                predictor: DelayPredictor::new(),
                predictor_failure: None,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, ServiceError> {
        self.inner.read().map_err(|_| ServiceError::LockPoisoned)
    }

    /// Load the airport data and the model.
    ///
    /// Both loads are attempted independently, so the directory can serve
    /// lookups while the model is unavailable. Components already loaded are
    /// kept on a retry. A no-op once ready.
    pub fn initialize(&self) -> Result<(), ServiceError> {
        let mut inner = self.inner.write().map_err(|_| ServiceError::LockPoisoned)?;
        if inner.state == ServiceState::Ready {
            return Ok(());
        }

        info!("Initializing prediction service");
        inner.state = ServiceState::Initializing;

        match self.load_components(&mut inner) {
            Ok(()) => {
                inner.state = ServiceState::Ready;
                info!("Prediction service initialized");
                Ok(())
            }
            Err(e) => {
                inner.state = ServiceState::Failed;
                error!(
                    directory_loaded = inner.directory.is_loaded(),
                    predictor_loaded = inner.predictor.is_loaded(),
                    error = %e,
                    "Failed to initialize prediction service"
                );
                Err(e)
            }
        }
    }

    /// Returns the first failure after attempting every unloaded component
    fn load_components(&self, inner: &mut Inner) -> Result<(), ServiceError> {
        let directory = if inner.directory.is_loaded() {
            Ok(())
        } else {
            inner
                .directory
                .load(self.airport_source.as_ref())
                .map(|_| ())
                .map_err(ServiceError::from)
        };
        let predictor = if inner.predictor.is_loaded() {
            Ok(())
        } else {
            inner
                .predictor
                .load(self.model_source.as_ref())
                .map_err(ServiceError::from)
        };

        inner.directory_failure = directory.as_ref().err().map(ToString::to_string);
        inner.predictor_failure = predictor.as_ref().err().map(ToString::to_string);
        directory.and(predictor)
    }

    /// Locations of the airport data and the model artifact, for logs
    pub fn sources(&self) -> (String, String) {
        (self.airport_source.describe(), self.model_source.describe())
    }

    pub fn state(&self) -> ServiceState {
        self.read()
            .map(|inner| inner.state)
            .unwrap_or(ServiceState::Failed)
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ServiceState::Ready
    }

    /// Whether the airport directory and the predictor are loaded
    pub fn components_loaded(&self) -> (bool, bool) {
        self.read()
            .map(|inner| (inner.directory.is_loaded(), inner.predictor.is_loaded()))
            .unwrap_or((false, false))
    }

    /// Predict from integer inputs
    pub fn predict_ids(&self, day_of_week: i64, airport_id: i64) -> PredictionOutcome {
        self.predict(&PredictionRequest::new(day_of_week, airport_id))
    }

    /// Validate, resolve the airport, run the classifier and merge the result
    pub fn predict(&self, request: &PredictionRequest) -> PredictionOutcome {
        let query = match request.validate() {
            Ok(query) => query,
            Err(message) => {
                debug!(reason = message, "Rejected prediction request");
                return PredictionOutcome::ValidationError {
                    kind: ValidationKind::BadRequest,
                    message: message.to_string(),
                };
            }
        };

        let inner = match self.read() {
            Ok(inner) => inner,
            Err(e) => return PredictionOutcome::internal(e.to_string()),
        };
        if inner.state != ServiceState::Ready {
            return PredictionOutcome::internal(format!(
                "prediction service not ready (state: {:?})",
                inner.state
            ));
        }

        let airport_id = query.airport_id;
        if !inner.directory.exists(airport_id) {
            return PredictionOutcome::ValidationError {
                kind: ValidationKind::NotFound,
                message: format!("Airport with ID {} not found in dataset", airport_id),
            };
        }

        let airport = match inner.directory.find_by_id(airport_id) {
            Ok(Some(airport)) => airport.clone(),
            Ok(None) => {
                return PredictionOutcome::internal(format!(
                    "airport {} disappeared during lookup",
                    airport_id
                ))
            }
            Err(e) => return PredictionOutcome::internal(e.to_string()),
        };

        let model_airport_id = match inner.directory.encoded_id_for(airport_id) {
            Ok(Some(id)) => id,
            Ok(None) => {
                warn!(airport_id = airport_id, "Airport has no model mapping");
                return PredictionOutcome::MappingError {
                    message: format!("No model mapping found for airport ID {}", airport_id),
                };
            }
            Err(e) => return PredictionOutcome::internal(e.to_string()),
        };

        let prediction = match inner.predictor.predict(query.day_of_week, model_airport_id) {
            Ok(prediction) => prediction,
            Err(e) => return PredictionOutcome::internal(e.to_string()),
        };

        let Some(model) = inner.predictor.metadata().cloned() else {
            return PredictionOutcome::internal("model metadata unavailable");
        };

        debug!(
            airport = %airport.name,
            day_of_week = query.day_of_week,
            delay_probability = prediction.delay_probability,
            "Prediction completed"
        );

        PredictionOutcome::Success(PredictionReport {
            query,
            airport,
            prediction,
            model,
        })
    }

    /// All airports sorted by name; requires only the directory to be loaded
    pub fn list_airports(&self) -> Result<Vec<AirportView>, ServiceError> {
        let inner = self.read()?;
        let airports = inner
            .directory
            .list_all()?
            .iter()
            .map(AirportRecord::view)
            .collect();
        Ok(airports)
    }

    pub fn airport(&self, airport_id: i64) -> Result<Option<AirportView>, ServiceError> {
        let inner = self.read()?;
        Ok(inner.directory.find_by_id(airport_id)?.map(AirportRecord::view))
    }

    pub fn model_metadata(&self) -> Option<ModelMetadata> {
        self.read()
            .ok()
            .and_then(|inner| inner.predictor.metadata().cloned())
    }

    pub fn status(&self) -> ServiceStatus {
        match self.read() {
            Ok(inner) => ServiceStatus {
                initialized: inner.state == ServiceState::Ready,
                state: inner.state,
                failure: inner.failure(),
                airports_failure: inner.directory_failure.clone(),
                model_failure: inner.predictor_failure.clone(),
                model: inner.predictor.info(),
                airports: inner.directory.summary(),
            },
            Err(e) => ServiceStatus {
                initialized: false,
                state: ServiceState::Failed,
                failure: Some(e.to_string()),
                airports_failure: None,
                model_failure: None,
                model: DelayPredictor::new().info(),
                airports: AirportDirectory::new().summary(),
            },
        }
    }
}
