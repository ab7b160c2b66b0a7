//! Error types for the extraction pipeline.
//!
//! # Usage
//!
//! ```rust
//! use mathsnap::core::errors::{OCRError, ProcessingStage};
//!
//! let error = OCRError::processing_message(
//!     ProcessingStage::Recognition,
//!     "raster engine panicked",
//!     "index out of bounds",
//! );
//! assert!(error.to_string().starts_with("recognition failed"));
//!
//! let config_error = OCRError::config_error("missing thresholds section");
//! assert!(matches!(config_error, OCRError::ConfigError { .. }));
//! ```

pub mod constructors;
pub mod types;

pub use types::{MessageError, OCRError, ProcessingStage};

/// Convenient result alias for pipeline operations.
pub type OcrResult<T> = Result<T, OCRError>;
