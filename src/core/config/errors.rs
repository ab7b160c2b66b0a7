//! Configuration error types and validation traits.

use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Error indicating that validation failed.
    #[error("validation failed: {message}")]
    ValidationFailed { message: String },

    /// Error indicating that a numeric range has its bounds reversed.
    #[error("empty range for {field}: lower bound {min} is not below upper bound {max}")]
    EmptyRange { field: String, min: f64, max: f64 },
}

/// A trait for validating configuration parameters.
///
/// Every configuration section of the pipeline implements this trait; the
/// pipeline builder calls [`ConfigValidator::validate`] before constructing
/// any stage.
pub trait ConfigValidator {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// A Result indicating success or a ConfigError if validation fails.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Validates that `min < max` for an open interval threshold.
    fn validate_range(&self, field: &str, min: f64, max: f64) -> Result<(), ConfigError> {
        if min.is_nan() || max.is_nan() || min >= max {
            Err(ConfigError::EmptyRange {
                field: field.to_string(),
                min,
                max,
            })
        } else {
            Ok(())
        }
    }

    /// Validates that a fraction lies within `[0, 1]`.
    fn validate_fraction(&self, field: &str, value: f64) -> Result<(), ConfigError> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed {
                message: format!("{} must be within [0, 1], got {}", field, value),
            })
        }
    }

    /// Validates that a value is strictly positive.
    fn validate_positive(&self, field: &str, value: f64) -> Result<(), ConfigError> {
        if value > 0.0 && value.is_finite() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed {
                message: format!("{} must be positive, got {}", field, value),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl ConfigValidator for Dummy {
        fn validate(&self) -> Result<(), ConfigError> {
            Ok(())
        }
    }

    #[test]
    fn test_validate_range() {
        assert!(Dummy.validate_range("contrast", 0.05, 0.25).is_ok());
        assert!(matches!(
            Dummy.validate_range("contrast", 0.25, 0.05),
            Err(ConfigError::EmptyRange { .. })
        ));
        assert!(Dummy.validate_range("contrast", f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_validate_fraction_and_positive() {
        assert!(Dummy.validate_fraction("white", 0.5).is_ok());
        assert!(Dummy.validate_fraction("white", 1.5).is_err());
        assert!(Dummy.validate_positive("gamma", 1.2).is_ok());
        assert!(Dummy.validate_positive("gamma", 0.0).is_err());
    }
}
