//! Binary logistic regression classifier
//!
//! Evaluates exported logistic regression coefficients directly, without a
//! graph runtime.

use super::{Classifier, NUM_FEATURES};
use crate::error::PredictorError;

/// Logistic regression over the model's input features
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    intercept: f64,
    coefficients: [f64; NUM_FEATURES],
}

impl LogisticClassifier {
    pub fn new(intercept: f64, coefficients: &[f64]) -> Result<Self, PredictorError> {
        let coefficients: [f64; NUM_FEATURES] = coefficients.try_into().map_err(|_| {
            PredictorError::InvalidBundle(format!(
                "logistic model needs {} coefficients, got {}",
                NUM_FEATURES,
                coefficients.len()
            ))
        })?;

        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(PredictorError::InvalidBundle(
                "logistic model has non-finite weights".to_string(),
            ));
        }

        Ok(Self {
            intercept,
            coefficients,
        })
    }
}

impl Classifier for LogisticClassifier {
    fn predict_proba(&self, features: &[f32; NUM_FEATURES]) -> Result<[f64; 2], PredictorError> {
        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * f64::from(*x))
                .sum::<f64>();
        let delay = 1.0 / (1.0 + (-z).exp());
        Ok([1.0 - delay, delay])
    }

    fn kind(&self) -> &'static str {
        "logistic"
    }
}
