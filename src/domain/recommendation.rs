//! Recommendation result types.

use serde::{Deserialize, Serialize};

use super::remarks::remark_for;

/// Outcome of one successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Predicted fertilizer label
    pub fertilizer: String,

    /// Why this fertilizer was recommended (never empty)
    pub remark: String,

    /// Crop the request was made for
    pub crop: String,

    /// Soil type the request was made for
    pub soil: String,
}

impl RecommendationResult {
    /// Build a result for a decoded fertilizer label, attaching its remark.
    #[must_use]
    pub fn new(fertilizer: impl Into<String>, crop: impl Into<String>, soil: impl Into<String>) -> Self {
        let fertilizer = fertilizer.into();
        let remark = remark_for(&fertilizer).to_string();
        Self {
            fertilizer,
            remark,
            crop: crop.into(),
            soil: soil.into(),
        }
    }
}

impl std::fmt::Display for RecommendationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Recommended Fertilizer: {}", self.fertilizer)?;
        writeln!(f, "Why this recommendation: {}", self.remark)?;
        write!(f, "For: {} in {} soil", self.crop, self.soil)
    }
}
