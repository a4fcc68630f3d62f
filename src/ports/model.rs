//! Recommendation model port: Trait for the pre-trained classifier.

use crate::domain::ScaledFeatures;

/// A feature vector was malformed before reaching the model.
///
/// These indicate a pipeline bug or mismatched artifacts, not bad user input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelInputError {
    #[error("feature count mismatch: got {got}, expected {expected}")]
    FeatureCount { expected: usize, got: usize },

    #[error("feature `{feature}` is not finite ({value})")]
    NonFinite { feature: String, value: f64 },
}

/// Trait for the fertilizer classifier.
///
/// The model is loaded once and only read during inference, so a single
/// instance can serve concurrent requests.
pub trait RecommendationModel: Send + Sync {
    /// Predict the fertilizer class code for a scaled feature vector.
    ///
    /// # Errors
    /// Returns `ModelInputError::FeatureCount` if the vector length does not
    /// match the model.
    fn predict(&self, features: &ScaledFeatures) -> Result<u32, ModelInputError>;

    /// Number of input features the model expects.
    fn n_features(&self) -> usize;

    /// Number of classes the model can predict.
    fn n_classes(&self) -> usize;
}
