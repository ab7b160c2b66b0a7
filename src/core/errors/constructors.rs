//! Error constructor utilities for the extraction pipeline.
//!
//! Helper functions for creating [`OCRError`] instances with context and
//! error chaining, so call sites stay short:
//!
//! ```rust
//! use mathsnap::core::OCRError;
//!
//! let error = OCRError::recognition_error("latex", "model not loaded");
//! assert_eq!(error.to_string(), "latex recognizer: model not loaded");
//! ```

use super::types::{MessageError, OCRError, ProcessingStage};

impl OCRError {
    /// Creates an OCRError for processing operations.
    ///
    /// # Arguments
    ///
    /// * `kind` - The stage of processing where the error occurred.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    pub fn processing_error(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates a processing error from a plain message, for failures that have
    /// no underlying error value (for example a caught panic).
    pub fn processing_message(kind: ProcessingStage, context: &str, message: impl Into<String>) -> Self {
        Self::processing_error(kind, context, MessageError(message.into()))
    }

    /// Creates an OCRError for PNG/JPEG encoding of a processed image.
    pub fn encode_error(context: &str, error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::processing_error(ProcessingStage::Encode, context, error)
    }

    /// Creates an OCRError for a failing recognizer collaborator.
    ///
    /// # Arguments
    ///
    /// * `engine` - Name of the recognizer.
    /// * `message` - A message describing the failure.
    pub fn recognition_error(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Recognition {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Creates an OCRError for a failing completion collaborator.
    pub fn completion_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Completion(Box::new(error))
    }

    /// Creates an OCRError for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an OCRError for configuration errors.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an error for one failing item of a batch.
    ///
    /// The item index in the message is 1-based.
    pub fn batch_item_error(
        index: usize,
        total: usize,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: ProcessingStage::BatchProcessing,
            context: format!("item {}/{}", index + 1, total),
            source: Box::new(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_display() {
        let err = OCRError::processing_message(ProcessingStage::Recognition, "raster", "boom");
        assert_eq!(err.to_string(), "recognition failed: raster");
    }

    #[test]
    fn test_encode_error_display() {
        let err = OCRError::encode_error("png", MessageError("disk full".into()));
        assert_eq!(err.to_string(), "encode failed: png");
    }

    #[test]
    fn test_batch_item_error_is_one_based() {
        let err = OCRError::batch_item_error(2, 5, MessageError("bad".into()));
        assert_eq!(err.to_string(), "batch processing failed: item 3/5");
    }
}
