//! The core module of the extraction pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Configuration validation
//! - Constants used throughout the pipeline
//! - Error handling

pub mod config;
pub mod constants;
pub mod errors;

pub use config::{ConfigError, ConfigValidator};
pub use constants::*;
pub use errors::{OCRError, OcrResult, ProcessingStage};
