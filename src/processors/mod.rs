//! Image processing stages.
//!
//! # Components
//!
//! - [`quality`]: OCR-readiness metrics and classification
//! - [`enhance`]: the denoise/contrast/binarize chain
//! - [`deskew`]: largest-contour cropping and skew correction
//! - [`filters`]: low-level pixel filters used by the stages above
//! - [`geometry`]: polygons, convex hulls and minimum-area rectangles

pub mod deskew;
pub mod enhance;
pub mod filters;
pub mod geometry;
pub mod quality;

pub use deskew::{ContourCropDeskewer, DeskewConfig};
pub use enhance::{AdaptiveEnhancer, EnhancedImage, EnhancerConfig, mean_intensity};
pub use geometry::{MinAreaRect, PixelRect, Point, Polygon, normalize_skew_angle};
pub use quality::{QualityAssessment, QualityClassifier, QualityMetrics, QualityThresholds};
