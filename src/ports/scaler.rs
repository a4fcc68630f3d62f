//! Feature scaler port: Trait for training-time feature normalization.

use crate::domain::{EncodedFeatures, Feature, ScaledFeatures};

use super::ModelInputError;

/// Trait for per-feature normalization fitted at training time.
pub trait FeatureScaler: Send + Sync {
    /// Normalize an encoded feature vector.
    ///
    /// Values are read by feature name and laid out in the fitted order.
    ///
    /// # Errors
    /// Returns `ModelInputError::NonFinite` if a value is NaN or infinite.
    fn scale(&self, features: &EncodedFeatures) -> Result<ScaledFeatures, ModelInputError>;

    /// Feature order the scaler was fitted with.
    fn layout(&self) -> &[Feature];
}
