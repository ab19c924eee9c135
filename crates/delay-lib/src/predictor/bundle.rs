//! Model bundle loading
//!
//! A bundle is a JSON document carrying the classifier definition together
//! with its metadata. ONNX graphs are stored next to the bundle and may be
//! pinned with a SHA256 checksum.

use super::{Classifier, LogisticClassifier, OnnxClassifier, DEFAULT_FEATURES, NUM_FEATURES};
use crate::error::PredictorError;
use crate::models::{ModelDetails, ModelMetadata};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Classifier together with its metadata
pub struct LoadedModel {
    pub classifier: Box<dyn Classifier>,
    pub details: ModelDetails,
}

/// Trait for model artifact sources
pub trait ModelSource: Send + Sync {
    /// Deserialize the classifier and its metadata
    fn load(&self) -> Result<LoadedModel, PredictorError>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Classifier definition inside a bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ModelObject {
    Logistic {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    Onnx {
        /// Relative to the bundle file
        path: PathBuf,
        #[serde(default)]
        sha256: Option<String>,
    },
}

/// Serialized model bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    #[serde(default)]
    pub model_object: Option<ModelObject>,
    #[serde(default = "default_features")]
    pub features: Vec<String>,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub accuracy: Option<f64>,
    #[serde(default = "default_version")]
    pub model_version: String,
    #[serde(default)]
    pub export_date: Option<String>,
    #[serde(default)]
    pub training_samples: Option<u64>,
}

fn default_features() -> Vec<String> {
    DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect()
}

fn default_version() -> String {
    "1.0".to_string()
}

impl ModelBundle {
    /// Build the classifier. `base_dir` resolves relative artifact paths.
    pub fn into_model(self, base_dir: &Path) -> Result<LoadedModel, PredictorError> {
        let object = self
            .model_object
            .ok_or_else(|| PredictorError::InvalidBundle("missing model_object".to_string()))?;

        if self.features.len() != NUM_FEATURES {
            return Err(PredictorError::InvalidBundle(format!(
                "expected {} features, bundle lists {:?}",
                NUM_FEATURES, self.features
            )));
        }

        let classifier: Box<dyn Classifier> = match object {
            ModelObject::Logistic {
                intercept,
                coefficients,
            } => Box::new(LogisticClassifier::new(intercept, &coefficients)?),
            ModelObject::Onnx { path, sha256 } => {
                let path = base_dir.join(path);
                let bytes = read_artifact(&path)?;
                if let Some(expected) = sha256 {
                    verify_checksum(&bytes, &expected)?;
                }
                Box::new(OnnxClassifier::from_bytes(&bytes)?)
            }
        };

        Ok(LoadedModel {
            classifier,
            details: ModelDetails {
                metadata: ModelMetadata {
                    model_type: self.model_type,
                    accuracy: self.accuracy,
                    version: self.model_version,
                },
                export_date: self.export_date,
                training_samples: self.training_samples,
                features: self.features,
            },
        })
    }
}

/// Model bundle stored as a JSON file
#[derive(Debug, Clone)]
pub struct BundleFile {
    path: PathBuf,
}

impl BundleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelSource for BundleFile {
    fn load(&self) -> Result<LoadedModel, PredictorError> {
        let bytes = read_artifact(&self.path)?;
        let bundle: ModelBundle = serde_json::from_slice(&bytes)?;
        let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        bundle.into_model(base_dir)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, PredictorError> {
    let bytes = fs::read(path).map_err(|source| PredictorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), size_bytes = bytes.len(), "Read model artifact");
    Ok(bytes)
}

fn verify_checksum(data: &[u8], expected: &str) -> Result<(), PredictorError> {
    let computed = compute_checksum(data);
    if !computed.eq_ignore_ascii_case(expected.trim()) {
        return Err(PredictorError::Corrupt(format!(
            "checksum mismatch: expected {}, got {}",
            expected, computed
        )));
    }
    info!(checksum = %computed, "Model checksum validated");
    Ok(())
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
