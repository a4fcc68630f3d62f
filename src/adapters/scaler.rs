//! Scaler adapter: Implementation of FeatureScaler.
//!
//! Loads per-feature normalization parameters exported from the training
//! pipeline. Two fitted kinds are supported, matching scikit-learn:
//!
//! - `standard`: `x_scaled = (x - mean) / scale` (a zero scale is treated as 1)
//! - `min_max`: `x_scaled = x * scale + min`
//!
//! The export carries the feature names in fitted order. Names are resolved to
//! [`Feature`]s once at load time and values are always gathered by name.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{EncodedFeatures, Feature, ScaledFeatures};
use crate::ports::{FeatureScaler, ModelInputError};

use super::artifacts::{read_json, ArtifactError};

/// Scaler parameters as written by the training pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportedScaler {
    Standard {
        feature_names: Vec<String>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
    MinMax {
        feature_names: Vec<String>,
        min: Vec<f64>,
        scale: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
enum Transform {
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

/// Validated, fitted feature scaler.
#[derive(Debug, Clone)]
pub struct FittedScaler {
    layout: Vec<Feature>,
    transform: Transform,
}

impl FittedScaler {
    /// Build a scaler from an in-memory export.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` if a feature name is unknown or repeated,
    /// if not every model feature is covered, or if parameter lengths differ.
    pub fn from_export(export: ExportedScaler) -> Result<Self, ArtifactError> {
        let (names, transform) = match export {
            ExportedScaler::Standard {
                feature_names,
                mean,
                scale,
            } => (feature_names, Transform::Standard { mean, scale }),
            ExportedScaler::MinMax {
                feature_names,
                min,
                scale,
            } => (feature_names, Transform::MinMax { min, scale }),
        };

        let mut layout = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();
        for name in &names {
            let feature = Feature::from_name(name).ok_or_else(|| {
                ArtifactError::Invalid(format!("scaler was fitted on unknown feature `{name}`"))
            })?;
            if !seen.insert(feature) {
                return Err(ArtifactError::Invalid(format!(
                    "scaler lists feature `{name}` more than once"
                )));
            }
            layout.push(feature);
        }

        if let Some(missing) = Feature::ALL.iter().find(|f| !seen.contains(*f)) {
            return Err(ArtifactError::Invalid(format!(
                "scaler was not fitted on feature `{missing}`"
            )));
        }

        let n = layout.len();
        let (a, b) = match &transform {
            Transform::Standard { mean, scale } => (mean, scale),
            Transform::MinMax { min, scale } => (min, scale),
        };
        if a.len() != n || b.len() != n {
            return Err(ArtifactError::Invalid(
                "Scaler parameter lengths do not match feature_names length".into(),
            ));
        }
        if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
            return Err(ArtifactError::Invalid(
                "scaler parameters must be finite".into(),
            ));
        }

        Ok(Self { layout, transform })
    }

    /// Load scaler parameters from an exported JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or is invalid.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let export: ExportedScaler = read_json(path)?;
        let scaler = Self::from_export(export)?;

        tracing::info!(
            "Loaded {} scaler from {:?} (n_features={})",
            scaler.kind(),
            path,
            scaler.layout.len()
        );

        Ok(scaler)
    }

    /// Name of the fitted scaling method.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.transform {
            Transform::Standard { .. } => "standard",
            Transform::MinMax { .. } => "min_max",
        }
    }

    /// Apply the fitted transform to a raw positional row.
    ///
    /// The row must already be in the fitted order; nothing can check that, a
    /// row in any other order is scaled with the wrong parameters. Prefer
    /// [`FeatureScaler::scale`], which gathers values by name.
    ///
    /// # Errors
    /// Returns `ModelInputError::FeatureCount` if the row length is wrong.
    pub fn transform_positional(&self, row: &[f64]) -> Result<Vec<f64>, ModelInputError> {
        let n = self.layout.len();
        if row.len() != n {
            return Err(ModelInputError::FeatureCount {
                expected: n,
                got: row.len(),
            });
        }

        let out = match &self.transform {
            Transform::Standard { mean, scale } => row
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| {
                    let s = if *s == 0.0 { 1.0 } else { *s };
                    (x - m) / s
                })
                .collect(),
            Transform::MinMax { min, scale } => row
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        };

        Ok(out)
    }
}

impl FeatureScaler for FittedScaler {
    fn scale(&self, features: &EncodedFeatures) -> Result<ScaledFeatures, ModelInputError> {
        let row = features.ordered(&self.layout);

        if let Some((feature, value)) = self
            .layout
            .iter()
            .zip(&row)
            .find(|(_, v)| !v.is_finite())
        {
            return Err(ModelInputError::NonFinite {
                feature: feature.name().to_string(),
                value: *value,
            });
        }

        let scaled = self.transform_positional(&row)?;
        // Finite parameters can still overflow, e.g. a subnormal scale.
        if let Some((feature, value)) = self
            .layout
            .iter()
            .zip(&scaled)
            .find(|(_, v)| !v.is_finite())
        {
            return Err(ModelInputError::NonFinite {
                feature: feature.name().to_string(),
                value: *value,
            });
        }

        Ok(ScaledFeatures::new(scaled))
    }

    fn layout(&self) -> &[Feature] {
        &self.layout
    }
}
