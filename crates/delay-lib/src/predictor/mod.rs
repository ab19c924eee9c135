//! Delay prediction engine
//!
//! Wraps an opaque trained classifier behind the [`Classifier`] trait. The
//! classifier takes `[day_of_week, model_airport_id]` and returns the
//! two-class probability vector `[no_delay, delay]`.

mod bundle;
mod inference;
mod logistic;

pub use bundle::{compute_checksum, BundleFile, LoadedModel, ModelBundle, ModelObject, ModelSource};
pub use inference::OnnxClassifier;
pub use logistic::LogisticClassifier;

use crate::error::PredictorError;
use crate::models::{ModelDetails, ModelMetadata, PredictionResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = 2;

/// Feature names used when the bundle does not list them
pub const DEFAULT_FEATURES: [&str; NUM_FEATURES] = ["DayOfWeek", "OriginAirport_Model"];

/// Trait for classifier implementations
pub trait Classifier: Send + Sync {
    /// Class probabilities `[no_delay, delay]` for one feature row
    fn predict_proba(&self, features: &[f32; NUM_FEATURES]) -> Result<[f64; 2], PredictorError>;

    /// Short name of the model family, for logs
    fn kind(&self) -> &'static str;
}

/// Input ranges accepted by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedValues {
    pub day_of_week: String,
    pub airport_id: String,
}

impl Default for SupportedValues {
    fn default() -> Self {
        Self {
            day_of_week: "1-7 (1=Monday, 7=Sunday)".to_string(),
            airport_id: "1-70 (model encoded airport IDs)".to_string(),
        }
    }
}

/// Model information for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ModelDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_values: Option<SupportedValues>,
}

impl ModelInfo {
    pub fn is_loaded(&self) -> bool {
        self.metadata.is_some()
    }
}

/// Delay predictor holding the loaded classifier and its metadata
#[derive(Default)]
pub struct DelayPredictor {
    model: Option<LoadedModel>,
}

impl DelayPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the classifier from a source, replacing any previous model.
    /// On failure the predictor is left unloaded.
    pub fn load(&mut self, source: &dyn ModelSource) -> Result<(), PredictorError> {
        self.model = None;

        info!(source = %source.describe(), "Loading model");
        let model = source.load()?;
        info!(
            kind = model.classifier.kind(),
            model_type = ?model.details.metadata.model_type,
            accuracy = ?model.details.metadata.accuracy,
            version = %model.details.metadata.version,
            "Model loaded"
        );

        self.model = Some(model);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Predict delay probability for a day of week and an encoded airport ID.
    ///
    /// Range checks are the caller's job; this only fails if no model is
    /// loaded or the classifier itself fails.
    pub fn predict(
        &self,
        day_of_week: u8,
        model_airport_id: u8,
    ) -> Result<PredictionResult, PredictorError> {
        let model = self.model.as_ref().ok_or(PredictorError::NotLoaded)?;

        let features = [f32::from(day_of_week), f32::from(model_airport_id)];
        let probabilities = model.classifier.predict_proba(&features)?;

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(PredictorError::Inference(format!(
                "classifier returned non-finite probabilities {:?}",
                probabilities
            )));
        }

        let result = PredictionResult::from_probabilities(probabilities);
        debug!(
            day_of_week = day_of_week,
            model_airport_id = model_airport_id,
            delay_probability = result.delay_probability,
            "Prediction made"
        );
        Ok(result)
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.model.as_ref().map(|m| &m.details.metadata)
    }

    pub fn info(&self) -> ModelInfo {
        match &self.model {
            Some(model) => ModelInfo {
                status: "loaded".to_string(),
                metadata: Some(model.details.clone()),
                input_features: Some(model.details.features.clone()),
                supported_values: Some(SupportedValues::default()),
            },
            None => ModelInfo {
                status: "Model not loaded".to_string(),
                metadata: None,
                input_features: None,
                supported_values: None,
            },
        }
    }
}
