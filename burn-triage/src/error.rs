//! Error types for the classification engine.
//!
//! Gate failures are not errors: an image that fails the colour or
//! statistical gates produces an ordinary "Burn not detected" result.

use crate::preprocessing::{NormalizationScheme, View};
use thiserror::Error;

/// Boxed error returned by a forward-pass implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that abort a classification request or engine construction.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Pixel buffer is empty, truncated or could not be decoded.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model collaborator failed or produced unusable logits.
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Label list or thresholds are unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Failures of the injected forward pass.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The forward pass itself returned an error.
    #[error("forward pass failed on {view} view with {scheme} normalization")]
    ForwardPass {
        view: View,
        scheme: NormalizationScheme,
        #[source]
        source: BoxError,
    },

    /// The forward pass returned logits the engine cannot use.
    #[error("malformed logits on {view} view with {scheme} normalization: {detail}")]
    MalformedLogits {
        view: View,
        scheme: NormalizationScheme,
        detail: String,
    },
}

impl EngineError {
    #[must_use]
    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::InvalidInput(details.into())
    }

    #[must_use]
    pub fn configuration(details: impl Into<String>) -> Self {
        Self::Configuration(details.into())
    }

    /// True when the model collaborator, not the input, caused the failure.
    #[must_use]
    pub fn is_inference_failure(&self) -> bool {
        matches!(self, Self::Inference(_))
    }
}
