//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! single and batch fertilizer recommendations.

mod batch;
mod recommend;

pub use batch::{BatchOutcome, BatchRow, BatchRunner, RowOutcome};
pub use recommend::{
    checked_record, DefaultRecommender, FailureCause, PipelineStage, RecommendationFailed,
    RecommendationService,
};
