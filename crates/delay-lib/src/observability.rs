//! Observability infrastructure for the prediction service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, loaded airports, model info)
//! - Structured JSON logging with tracing

use crate::models::ModelMetadata;
use crate::orchestrator::PredictionOutcome;
use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

struct ServiceMetricsInner {
    registry: Registry,
    prediction_latency_seconds: Histogram,
    predictions_total: IntCounterVec,
    airports_loaded: IntGauge,
    model_info: GaugeVec,
}

impl ServiceMetricsInner {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let prediction_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "flight_delay_prediction_latency_seconds",
                "Time spent serving a prediction request",
            )
            .buckets(LATENCY_BUCKETS.to_vec()),
        )?;
        let predictions_total = IntCounterVec::new(
            Opts::new(
                "flight_delay_predictions_total",
                "Prediction requests by outcome",
            ),
            &["outcome"],
        )?;
        let airports_loaded = IntGauge::new(
            "flight_delay_airports_loaded",
            "Number of airports in the loaded directory",
        )?;
        let model_info = GaugeVec::new(
            Opts::new(
                "flight_delay_model_info",
                "Information about the currently loaded model",
            ),
            &["version", "model_type"],
        )?;

        registry.register(Box::new(prediction_latency_seconds.clone()))?;
        registry.register(Box::new(predictions_total.clone()))?;
        registry.register(Box::new(airports_loaded.clone()))?;
        registry.register(Box::new(model_info.clone()))?;

        Ok(Self {
            registry,
            prediction_latency_seconds,
            predictions_total,
            airports_loaded,
            model_info,
        })
    }
}

/// Service metrics for Prometheus exposition
///
/// Clones share the same underlying registry.
#[derive(Clone)]
pub struct ServiceMetrics {
    inner: Arc<ServiceMetricsInner>,
}

impl ServiceMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            inner: Arc::new(ServiceMetricsInner::new()?),
        })
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner.prediction_latency_seconds.observe(duration_secs);
    }

    /// Count a prediction by its outcome label
    pub fn record_outcome(&self, outcome: &PredictionOutcome) {
        self.inner
            .predictions_total
            .with_label_values(&[outcome.label()])
            .inc();
    }

    pub fn set_airports_loaded(&self, count: usize) {
        self.inner.airports_loaded.set(count as i64);
    }

    /// Replace the model info series with the given metadata
    pub fn set_model_info(&self, metadata: &ModelMetadata) {
        self.inner.model_info.reset();
        self.inner
            .model_info
            .with_label_values(&[
                metadata.version.as_str(),
                metadata.model_type.as_deref().unwrap_or("unknown"),
            ])
            .set(1.0);
    }

    /// Encode all metrics in the Prometheus text format
    pub fn encode(&self) -> prometheus::Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.inner.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Structured logger for service events
///
/// Every event carries an `event` field and the service instance name.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            addr = %addr,
            "Flight delay prediction service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Flight delay prediction service shutting down"
        );
    }

    pub fn log_model_loaded(&self, source: &str, metadata: &ModelMetadata) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            source = %source,
            model_type = ?metadata.model_type,
            accuracy = ?metadata.accuracy,
            model_version = %metadata.version,
            "Delay model loaded"
        );
    }

    pub fn log_airports_loaded(&self, source: &str, total: usize, mapped: usize) {
        if mapped < total {
            warn!(
                event = "airports_loaded",
                instance = %self.instance,
                source = %source,
                total_airports = total,
                mapped_airports = mapped,
                "Airport data loaded with unmapped airports"
            );
        } else {
            info!(
                event = "airports_loaded",
                instance = %self.instance,
                source = %source,
                total_airports = total,
                mapped_airports = mapped,
                "Airport data loaded"
            );
        }
    }

    /// Log a prediction outcome; successes and rejections use distinct events
    pub fn log_prediction(&self, outcome: &PredictionOutcome, elapsed_secs: f64) {
        match outcome {
            PredictionOutcome::Success(report) => {
                info!(
                    event = "prediction_served",
                    instance = %self.instance,
                    airport_id = report.query.airport_id,
                    day_of_week = report.query.day_of_week,
                    delay_probability = report.prediction.delay_probability,
                    is_delayed = report.prediction.is_delayed,
                    model_version = %report.model.version,
                    elapsed_secs = elapsed_secs,
                    "Prediction served"
                );
            }
            PredictionOutcome::ValidationError { message, .. }
            | PredictionOutcome::MappingError { message } => {
                info!(
                    event = "prediction_rejected",
                    instance = %self.instance,
                    outcome = outcome.label(),
                    reason = %message,
                    "Prediction rejected"
                );
            }
            PredictionOutcome::InternalError { .. } => {
                warn!(
                    event = "prediction_rejected",
                    instance = %self.instance,
                    outcome = outcome.label(),
                    "Prediction failed"
                );
            }
        }
    }
}
