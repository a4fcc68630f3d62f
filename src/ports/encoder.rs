//! Category encoder port: Trait for categorical label encoding.
//!
//! This trait abstracts the exported label encoders from the pipeline.

use crate::domain::CategoricalField;

/// Errors that can occur while encoding or decoding a category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncoderError {
    #[error("unknown {field} category `{value}` (not in the trained vocabulary)")]
    UnknownCategory {
        field: CategoricalField,
        value: String,
    },

    #[error("unknown {field} code {code}")]
    UnknownCode { field: CategoricalField, code: u32 },
}

/// Trait for bidirectional category/code mapping.
///
/// Implementations are fitted at training time and never change at request
/// time. Every code is unique within its field.
pub trait CategoryEncoder: Send + Sync {
    /// Map a category string to its trained integer code.
    ///
    /// # Errors
    /// Returns `EncoderError::UnknownCategory` if `value` is not in the
    /// field's vocabulary.
    fn encode(&self, field: CategoricalField, value: &str) -> Result<u32, EncoderError>;

    /// Map a trained integer code back to its category string.
    ///
    /// # Errors
    /// Returns `EncoderError::UnknownCode` if `code` was never assigned.
    fn decode(&self, field: CategoricalField, code: u32) -> Result<&str, EncoderError>;

    /// The trained vocabulary of a field, in code order.
    fn classes(&self, field: CategoricalField) -> &[String];
}
