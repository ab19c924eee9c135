//! HTTP error handling and response types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use delay_lib::{PredictionOutcome, PredictionReport, ValidationKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Public message for internal prediction failures
pub const INTERNAL_PREDICTION_ERROR: &str = "Internal prediction error";

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Always `"error"`
    pub status: String,
    pub error: String,
    /// Request echo; prediction errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

/// Application error type for HTTP handlers
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
    /// Rejected prediction, echoing the request input
    Prediction {
        status: StatusCode,
        message: String,
        input: Value,
    },
}

/// Split a prediction outcome into its report or the error response.
pub fn outcome_to_result(
    outcome: PredictionOutcome,
    input: Value,
) -> Result<PredictionReport, AppError> {
    let (status, message) = match outcome {
        PredictionOutcome::Success(report) => return Ok(report),
        PredictionOutcome::ValidationError { kind, message } => {
            let status = match kind {
                ValidationKind::BadRequest => StatusCode::UNPROCESSABLE_ENTITY,
                ValidationKind::NotFound => StatusCode::NOT_FOUND,
            };
            (status, message)
        }
        PredictionOutcome::MappingError { message } => (StatusCode::NOT_FOUND, message),
        PredictionOutcome::InternalError { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_PREDICTION_ERROR.to_string(),
        ),
    };
    Err(AppError::Prediction {
        status,
        message,
        input,
    })
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Prediction { status, .. } => *status,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error, input) = match self {
            AppError::NotFound(msg) | AppError::BadRequest(msg) | AppError::Internal(msg) => {
                (msg, None)
            }
            AppError::Prediction { message, input, .. } => (message, Some(input)),
        };

        let body = ErrorBody {
            status: "error".to_string(),
            error,
            input,
        };
        (status, Json(body)).into_response()
    }
}
