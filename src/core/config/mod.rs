//! Configuration management for the extraction pipeline.
//!
//! This module provides the configuration error type and the validation trait
//! implemented by every configuration section.

pub mod errors;

pub use errors::{ConfigError, ConfigValidator};
