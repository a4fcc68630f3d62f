//! # Afrigrow
//!
//! Fertilizer recommendation from soil and climate measurements.
//!
//! This crate provides:
//! - Loading of the fitted encoders, scaler and classifier exported by training
//! - A fixed inference pipeline: encode, scale, predict, decode, explain
//! - Concurrent batch recommendations over a shared service
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (measurements, feature vectors, recommendations)
//! - `ports`: Trait definitions for the encoder, scaler and model
//! - `adapters`: JSON artifact implementations of the ports
//! - `application`: The recommendation pipeline and batch runner
//! - `config`: Environment settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{DefaultRecommender, RecommendationFailed, RecommendationService};
pub use domain::{MeasurementInput, MeasurementRecord, RecommendationResult};

/// Result type for Afrigrow operations
pub type Result<T> = std::result::Result<T, AfrigrowError>;

/// Main error type for Afrigrow
#[derive(Debug, thiserror::Error)]
pub enum AfrigrowError {
    #[error("Artifacts could not be loaded: {0}")]
    Artifacts(#[from] adapters::ArtifactError),

    #[error("Could not generate recommendation: {0}")]
    Recommendation(#[from] RecommendationFailed),

    #[error("Invalid measurements: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AfrigrowError {
    /// Short name of the step that failed, as reported per batch row.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Artifacts(_) => "load",
            Self::Recommendation(e) => e.stage.name(),
            Self::Validation(_) => "validate",
            Self::Io(_) => "read",
            Self::Serialization(_) => "parse",
        }
    }

    /// Message for the person who submitted the measurements, without the
    /// stage prefix.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Recommendation(e) => e.cause.to_string(),
            Self::Validation(errors) => errors.join("; "),
            other => other.to_string(),
        }
    }
}
