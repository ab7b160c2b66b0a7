//! Error type definitions for the extraction pipeline.

use thiserror::Error;

/// Enum representing the stages of the extraction pipeline.
///
/// Used to tag [`OCRError::Processing`] so that a caller can tell which
/// part of the pipeline produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Recognizer invocation.
    Recognition,
    /// Batch processing.
    BatchProcessing,
    /// Encoding the processed image.
    Encode,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Recognition => write!(f, "recognition"),
            ProcessingStage::BatchProcessing => write!(f, "batch processing"),
            ProcessingStage::Encode => write!(f, "encode"),
        }
    }
}

/// Enum representing the errors that can occur in the extraction pipeline.
///
/// Only a decode failure is fatal for a single image. Recognizer failures are
/// recovered inside the arbiter and never surface through this type from
/// [`crate::pipeline::MathPipeline::process`].
#[derive(Error, Debug)]
pub enum OCRError {
    /// The input bytes could not be decoded into an image.
    #[error("image decode")]
    ImageDecode(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A recognizer collaborator reported a failure.
    #[error("{engine} recognizer: {message}")]
    Recognition {
        /// Name of the engine that failed.
        engine: String,
        /// A message describing the failure.
        message: String,
    },

    /// The completion collaborator reported a failure.
    #[error("completion")]
    Completion(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization")]
    Serialization(#[from] serde_json::Error),
}

impl From<image::ImageError> for OCRError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageDecode(error)
    }
}

impl From<crate::core::config::ConfigError> for OCRError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

/// A plain message error used as the source of wrapped failures.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct MessageError(pub String);
