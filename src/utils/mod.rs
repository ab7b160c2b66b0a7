//! Utility functions for the extraction pipeline.
//!
//! This module provides image ingestion helpers and logging setup.

pub mod image;

pub use image::{
    RawImage, apply_orientation, downscale_to_max_dimension, dynamic_to_gray, dynamic_to_rgb,
    encode_png, read_exif_orientation, scaled_dimensions,
};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
