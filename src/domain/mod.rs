//! Domain layer: Core types for fertilizer recommendation.
//!
//! This module contains plain Rust types with no knowledge of how artifacts
//! are stored or how results are displayed.

mod features;
mod measurement;
mod recommendation;
pub mod remarks;

pub use features::{CategoricalField, EncodedFeatures, Feature, ScaledFeatures};
pub use measurement::{MeasurementInput, MeasurementRecord, MissingField};
pub use recommendation::RecommendationResult;
pub use remarks::{remark_for, FALLBACK_REMARK};
