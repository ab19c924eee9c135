//! Core library for flight delay prediction
//!
//! This crate provides:
//! - The airport directory and public-to-model ID translation
//! - The delay classifier and model bundle loading
//! - The prediction orchestrator and its lifecycle
//! - Health checks and observability

pub mod directory;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod orchestrator;
pub mod predictor;

pub use directory::{AirportDirectory, AirportSource, CsvAirportFile, DirectorySummary};
pub use error::{DirectoryError, PredictorError, ServiceError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use orchestrator::{
    PredictionOutcome, PredictionReport, PredictionRequest, PredictionService, ServiceState,
    ServiceStatus, ValidationKind,
};
pub use predictor::{BundleFile, DelayPredictor, ModelInfo, ModelSource};
