//! Adapters layer: Concrete implementations of ports.
//!
//! These modules read the JSON exports of the training pipeline:
//! - `label_encoder`: category vocabularies for Soil, Crop and Fertilizer
//! - `scaler`: fitted per-feature normalization
//! - `classifier`: the fertilizer classifier
//! - `artifacts`: loading, manifest verification and cross-checks

pub mod artifacts;
pub mod classifier;
pub mod label_encoder;
pub mod scaler;

pub use artifacts::{ArtifactBundle, ArtifactError, ArtifactManifest};
pub use classifier::Classifier;
pub use label_encoder::LabelEncoders;
pub use scaler::FittedScaler;
