//! Label encoder adapter: Implementation of CategoryEncoder.
//!
//! Loads the per-field label encoders exported from the training pipeline.
//! The export maps each field name to its class list; a class's code is its
//! position in that list, as with scikit-learn's `LabelEncoder`.
//!
//! ```json
//! {
//!   "Soil": ["Acidic Soil", "Alkaline Soil", "Loamy Soil", "Neutral Soil", "Peaty Soil"],
//!   "Crop": ["Adzuki Beans", "Black gram", "..."],
//!   "Fertilizer": ["Balanced NPK Fertilizer", "Compost", "..."]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::domain::CategoricalField;
use crate::ports::{CategoryEncoder, EncoderError};

use super::artifacts::{read_json, ArtifactError};

/// Encoder export as written by the training pipeline: field name → classes.
pub type ExportedLabelEncoders = BTreeMap<String, Vec<String>>;

/// Vocabulary of a single categorical field.
#[derive(Debug, Clone)]
struct FieldVocabulary {
    classes: Vec<String>,
    codes: HashMap<String, u32>,
}

impl FieldVocabulary {
    fn new(field: CategoricalField, classes: Vec<String>) -> Result<Self, ArtifactError> {
        if classes.is_empty() {
            return Err(ArtifactError::Invalid(format!(
                "{field} encoder has no classes"
            )));
        }

        let mut codes = HashMap::with_capacity(classes.len());
        for (i, class) in classes.iter().enumerate() {
            let code = u32::try_from(i).map_err(|_| {
                ArtifactError::Invalid(format!("{field} encoder has too many classes"))
            })?;
            if codes.insert(class.clone(), code).is_some() {
                return Err(ArtifactError::Invalid(format!(
                    "{field} encoder lists class `{class}` more than once"
                )));
            }
        }

        Ok(Self { classes, codes })
    }
}

/// Label encoders for soil type, crop and fertilizer.
#[derive(Debug, Clone)]
pub struct LabelEncoders {
    soil: FieldVocabulary,
    crop: FieldVocabulary,
    fertilizer: FieldVocabulary,
}

impl LabelEncoders {
    /// Build encoders from an in-memory export.
    ///
    /// Extra fields in the export are ignored.
    ///
    /// # Errors
    /// Returns `ArtifactError::Invalid` if a field is missing, empty, or lists a
    /// class twice.
    pub fn from_export(mut export: ExportedLabelEncoders) -> Result<Self, ArtifactError> {
        let mut take = |field: CategoricalField| -> Result<FieldVocabulary, ArtifactError> {
            let classes = export.remove(field.name()).ok_or_else(|| {
                ArtifactError::Invalid(format!("label encoders have no `{field}` field"))
            })?;
            FieldVocabulary::new(field, classes)
        };

        let encoders = Self {
            soil: take(CategoricalField::Soil)?,
            crop: take(CategoricalField::Crop)?,
            fertilizer: take(CategoricalField::Fertilizer)?,
        };

        if !export.is_empty() {
            tracing::debug!(
                "Ignoring unused encoder fields: {:?}",
                export.keys().collect::<Vec<_>>()
            );
        }

        Ok(encoders)
    }

    /// Load encoders from an exported JSON file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, or is invalid.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let export: ExportedLabelEncoders = read_json(path)?;
        let encoders = Self::from_export(export)?;

        tracing::info!(
            "Loaded label encoders from {:?} (soil={}, crop={}, fertilizer={})",
            path,
            encoders.soil.classes.len(),
            encoders.crop.classes.len(),
            encoders.fertilizer.classes.len()
        );

        Ok(encoders)
    }

    fn vocabulary(&self, field: CategoricalField) -> &FieldVocabulary {
        match field {
            CategoricalField::Soil => &self.soil,
            CategoricalField::Crop => &self.crop,
            CategoricalField::Fertilizer => &self.fertilizer,
        }
    }
}

impl CategoryEncoder for LabelEncoders {
    fn encode(&self, field: CategoricalField, value: &str) -> Result<u32, EncoderError> {
        self.vocabulary(field)
            .codes
            .get(value)
            .copied()
            .ok_or_else(|| EncoderError::UnknownCategory {
                field,
                value: value.to_string(),
            })
    }

    fn decode(&self, field: CategoricalField, code: u32) -> Result<&str, EncoderError> {
        self.vocabulary(field)
            .classes
            .get(code as usize)
            .map(String::as_str)
            .ok_or(EncoderError::UnknownCode { field, code })
    }

    fn classes(&self, field: CategoricalField) -> &[String] {
        &self.vocabulary(field).classes
    }
}
