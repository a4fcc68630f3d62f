//! Ports layer: Trait definitions for the pre-trained artifacts.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the recommendation pipeline and the fitted encoder, scaler and model.

mod encoder;
mod model;
mod scaler;

pub use encoder::{CategoryEncoder, EncoderError};
pub use model::{ModelInputError, RecommendationModel};
pub use scaler::FeatureScaler;
