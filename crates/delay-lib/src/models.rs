//! Core data models for the delay prediction service

use serde::{Deserialize, Serialize};

/// Valid day-of-week range (1=Monday, 7=Sunday)
pub const MIN_DAY_OF_WEEK: i64 = 1;
pub const MAX_DAY_OF_WEEK: i64 = 7;

/// Range of the encoded airport IDs the classifier was trained on
pub const MIN_MODEL_AIRPORT_ID: u8 = 1;
pub const MAX_MODEL_AIRPORT_ID: u8 = 70;

/// Delay probability above which a flight is called delayed
pub const DELAY_THRESHOLD: f64 = 0.5;

/// Airport record loaded from the static dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportRecord {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Encoded airport ID used as model input, absent if unmapped
    pub model_id: Option<u8>,
}

impl AirportRecord {
    /// Public view of the record, without the model mapping
    pub fn view(&self) -> AirportView {
        AirportView {
            id: self.id,
            name: self.name.clone(),
            code: self.code.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
        }
    }

    /// Display fields echoed back in prediction responses
    pub fn display(&self) -> AirportDisplay {
        AirportDisplay {
            name: self.name.clone(),
            code: self.code.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
        }
    }
}

/// Airport as exposed to API callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportView {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Airport display fields without the ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportDisplay {
    pub name: String,
    pub code: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Validated prediction query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionQuery {
    pub day_of_week: u8,
    pub airport_id: i64,
}

/// Classifier output for a single query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub delay_probability: f64,
    pub no_delay_probability: f64,
    pub is_delayed: bool,
    pub confidence: f64,
}

impl PredictionResult {
    /// Build a result from a two-class probability vector
    /// (index 0 = no delay, index 1 = delay)
    pub fn from_probabilities(probabilities: [f64; 2]) -> Self {
        let [no_delay_probability, delay_probability] = probabilities;
        Self {
            delay_probability,
            no_delay_probability,
            is_delayed: delay_probability > DELAY_THRESHOLD,
            confidence: delay_probability.max(no_delay_probability),
        }
    }
}

/// Static model metadata returned with every prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetadata {
    pub model_type: Option<String>,
    pub accuracy: Option<f64>,
    pub version: String,
}

/// Full model description for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDetails {
    #[serde(flatten)]
    pub metadata: ModelMetadata,
    pub export_date: Option<String>,
    pub training_samples: Option<u64>,
    pub features: Vec<String>,
}
