//! Model feature vectors.
//!
//! Features are addressed by name through [`Feature`]. The order a scaler or
//! model was fitted with comes from the artifact, so no code here depends on a
//! positional layout.

/// The ten model input features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Temperature,
    Moisture,
    Rainfall,
    Ph,
    Nitrogen,
    Phosphorous,
    Potassium,
    Carbon,
    Soil,
    Crop,
}

impl Feature {
    /// All features in the column order of the training frame.
    pub const ALL: [Feature; 10] = [
        Feature::Temperature,
        Feature::Moisture,
        Feature::Rainfall,
        Feature::Ph,
        Feature::Nitrogen,
        Feature::Phosphorous,
        Feature::Potassium,
        Feature::Carbon,
        Feature::Soil,
        Feature::Crop,
    ];

    /// Column name used when the artifacts were fitted.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Moisture => "Moisture",
            Self::Rainfall => "Rainfall",
            Self::Ph => "PH",
            Self::Nitrogen => "Nitrogen",
            Self::Phosphorous => "Phosphorous",
            Self::Potassium => "Potassium",
            Self::Carbon => "Carbon",
            Self::Soil => "Soil",
            Self::Crop => "Crop",
        }
    }

    /// Resolve a fitted column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Categorical fields with a trained label encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoricalField {
    Soil,
    Crop,
    Fertilizer,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 3] = [Self::Soil, Self::Crop, Self::Fertilizer];

    /// Key of this field's encoder in the exported encoder set.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Soil => "Soil",
            Self::Crop => "Crop",
            Self::Fertilizer => "Fertilizer",
        }
    }
}

impl std::fmt::Display for CategoricalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Measurement record with soil and crop replaced by their encoder codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodedFeatures {
    pub temperature: f64,
    pub moisture: f64,
    pub rainfall: f64,
    pub ph: f64,
    pub nitrogen: f64,
    pub phosphorous: f64,
    pub potassium: f64,
    pub carbon: f64,
    pub soil: u32,
    pub crop: u32,
}

impl EncodedFeatures {
    /// Value of a single feature, by name.
    #[must_use]
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Temperature => self.temperature,
            Feature::Moisture => self.moisture,
            Feature::Rainfall => self.rainfall,
            Feature::Ph => self.ph,
            Feature::Nitrogen => self.nitrogen,
            Feature::Phosphorous => self.phosphorous,
            Feature::Potassium => self.potassium,
            Feature::Carbon => self.carbon,
            Feature::Soil => f64::from(self.soil),
            Feature::Crop => f64::from(self.crop),
        }
    }

    /// Values laid out in the given fitted order.
    #[must_use]
    pub fn ordered(&self, layout: &[Feature]) -> Vec<f64> {
        layout.iter().map(|f| self.get(*f)).collect()
    }
}

/// Normalized feature values in the order the scaler was fitted with.
///
/// Only a scaler produces these, so the layout always matches the fitted
/// artifacts.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledFeatures {
    values: Vec<f64>,
}

impl ScaledFeatures {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Scaled values, fitted order.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
