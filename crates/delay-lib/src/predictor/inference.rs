//! ONNX inference using tract
//!
//! Runs classifiers exported to ONNX (e.g. from scikit-learn with the
//! probability map disabled). The graph takes a `[1, 2]` f32 input; the first
//! f32 output with two values is read as the probability vector.

use super::{Classifier, NUM_FEATURES};
use crate::error::PredictorError;
use anyhow::{Context, Result};
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based classifier using tract for lightweight inference
pub struct OnnxClassifier {
    model: TractModel,
}

impl OnnxClassifier {
    /// Create a classifier from ONNX model bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self, PredictorError> {
        let model = Self::load_model(model_bytes)
            .map_err(|e| PredictorError::Corrupt(format!("{:#}", e)))?;
        Ok(Self { model })
    }

    /// Load and optimize an ONNX model from bytes
    fn load_model(model_bytes: &[u8]) -> Result<TractModel> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(model)
    }

    fn features_to_tensor(features: &[f32; NUM_FEATURES]) -> Result<Tensor> {
        let array = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), features.to_vec())
            .context("Failed to shape input features")?;
        Ok(array.into())
    }

    /// Find the probability vector among the model outputs
    fn probabilities(outputs: &TVec<TValue>) -> Result<[f64; 2]> {
        for output in outputs.iter() {
            if output.datum_type() != f32::datum_type() || output.len() != 2 {
                continue;
            }
            let view = output.to_array_view::<f32>()?;
            let values: Vec<f32> = view.iter().copied().collect();
            return Ok([f64::from(values[0]), f64::from(values[1])]);
        }
        anyhow::bail!("Model produced no two-class probability output")
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, features: &[f32; NUM_FEATURES]) -> Result<[f64; 2], PredictorError> {
        let start = Instant::now();

        let input = Self::features_to_tensor(features)
            .map_err(|e| PredictorError::Inference(format!("{:#}", e)))?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PredictorError::Inference(format!("{:#}", e)))?;

        let elapsed = start.elapsed();

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros() as u64, "Inference completed");
        }

        Self::probabilities(&outputs).map_err(|e| PredictorError::Inference(format!("{:#}", e)))
    }

    fn kind(&self) -> &'static str {
        "onnx"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_are_corrupt() {
        let result = OnnxClassifier::from_bytes(b"definitely not a protobuf graph");
        assert!(matches!(result, Err(PredictorError::Corrupt(_))));
    }

    #[test]
    fn test_features_to_tensor_shape() {
        let tensor = OnnxClassifier::features_to_tensor(&[3.0, 17.0]).unwrap();
        assert_eq!(tensor.shape(), &[1, NUM_FEATURES]);
        let view = tensor.to_array_view::<f32>().unwrap();
        assert_eq!(view.iter().copied().collect::<Vec<_>>(), vec![3.0, 17.0]);
    }

    #[test]
    fn test_probabilities_skips_label_output() {
        let label: Tensor = tract_ndarray::arr1(&[1i64]).into();
        let probs: Tensor = tract_ndarray::arr2(&[[0.2f32, 0.8]]).into();
        let outputs: TVec<TValue> = tvec!(label.into(), probs.into());

        let [p0, p1] = OnnxClassifier::probabilities(&outputs).unwrap();
        assert!((p0 - 0.2).abs() < 1e-6);
        assert!((p1 - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_probabilities_missing_output() {
        let label: Tensor = tract_ndarray::arr1(&[0i64]).into();
        let outputs: TVec<TValue> = tvec!(label.into());
        assert!(OnnxClassifier::probabilities(&outputs).is_err());
    }
}
