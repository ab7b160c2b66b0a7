//! OCR-readiness classification.
//!
//! Scores a grayscale image with a handful of global statistics and decides
//! whether it can go straight to recognition. The classifier never modifies
//! its input; oversized images are measured on a downscaled copy.

use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::constants::{BLACK_LEVEL, DEFAULT_MAX_DIMENSION, STROKE_LEVEL, WHITE_LEVEL};
use crate::utils::downscale_to_max_dimension;
use image::GrayImage;
use imageproc::gradients::sobel_gradients;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Global statistics of a grayscale image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Shannon entropy of the intensity histogram, in bits.
    pub entropy: f64,
    /// Standard deviation of the Sobel magnitude map after dividing by its maximum.
    pub contrast: f64,
    /// Mean intensity, 0-255.
    pub brightness: f64,
    /// Fraction of pixels darker than the stroke level.
    pub stroke_density: f64,
    /// Fraction of near-black pixels.
    pub black_fraction: f64,
    /// Fraction of near-white pixels.
    pub white_fraction: f64,
}

impl QualityMetrics {
    /// Computes the metrics over every pixel of `image`.
    ///
    /// An empty image yields all-zero metrics.
    pub fn compute(image: &GrayImage) -> Self {
        let total = (image.width() as u64 * image.height() as u64) as f64;
        if total == 0.0 {
            return Self {
                entropy: 0.0,
                contrast: 0.0,
                brightness: 0.0,
                stroke_density: 0.0,
                black_fraction: 0.0,
                white_fraction: 0.0,
            };
        }

        let mut histogram = [0u64; 256];
        for p in image.pixels() {
            histogram[p[0] as usize] += 1;
        }

        let mut entropy = 0.0;
        let mut sum = 0.0;
        let (mut stroke, mut black, mut white) = (0u64, 0u64, 0u64);
        for (level, &count) in histogram.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let p = count as f64 / total;
            entropy -= p * p.log2();
            sum += level as f64 * count as f64;
            if level < STROKE_LEVEL as usize {
                stroke += count;
            }
            if level < BLACK_LEVEL as usize {
                black += count;
            }
            if level > WHITE_LEVEL as usize {
                white += count;
            }
        }

        Self {
            entropy,
            contrast: edge_contrast(image),
            brightness: sum / total,
            stroke_density: stroke as f64 / total,
            black_fraction: black as f64 / total,
            white_fraction: white as f64 / total,
        }
    }
}

/// Spread of edge strength: std-dev of the gradient magnitude scaled to [0, 1].
fn edge_contrast(image: &GrayImage) -> f64 {
    let gradients = sobel_gradients(image);
    let max = gradients.pixels().map(|p| p[0]).max().unwrap_or(0);
    if max == 0 {
        return 0.0;
    }
    let max = max as f64;
    let n = gradients.pixels().len() as f64;
    let (sum, sum_sq) = gradients.pixels().fold((0.0, 0.0), |(s, sq), p| {
        let v = p[0] as f64 / max;
        (s + v, sq + v * v)
    });
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt()
}

/// Acceptance thresholds for OCR-readiness. Every bound is exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub min_entropy: f64,
    pub min_contrast: f64,
    pub max_contrast: f64,
    pub min_brightness: f64,
    pub max_brightness: f64,
    pub min_stroke_density: f64,
    pub max_stroke_density: f64,
    pub max_black_fraction: f64,
    pub max_white_fraction: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_entropy: 4.5,
            min_contrast: 0.05,
            max_contrast: 0.25,
            min_brightness: 100.0,
            max_brightness: 200.0,
            min_stroke_density: 0.02,
            max_stroke_density: 0.25,
            max_black_fraction: 0.10,
            max_white_fraction: 0.50,
        }
    }
}

impl QualityThresholds {
    /// True when every metric falls inside its bounds.
    pub fn accepts(&self, m: &QualityMetrics) -> bool {
        m.entropy > self.min_entropy
            && m.contrast > self.min_contrast
            && m.contrast < self.max_contrast
            && m.brightness > self.min_brightness
            && m.brightness < self.max_brightness
            && m.stroke_density > self.min_stroke_density
            && m.stroke_density < self.max_stroke_density
            && m.black_fraction < self.max_black_fraction
            && m.white_fraction < self.max_white_fraction
    }
}

impl ConfigValidator for QualityThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_range("contrast", self.min_contrast, self.max_contrast)?;
        self.validate_range("brightness", self.min_brightness, self.max_brightness)?;
        self.validate_range(
            "stroke_density",
            self.min_stroke_density,
            self.max_stroke_density,
        )?;
        self.validate_fraction("max_black_fraction", self.max_black_fraction)?;
        self.validate_fraction("max_white_fraction", self.max_white_fraction)?;
        if self.min_entropy < 0.0 || self.min_entropy > 8.0 {
            return Err(ConfigError::ValidationFailed {
                message: format!("min_entropy must be within [0, 8], got {}", self.min_entropy),
            });
        }
        Ok(())
    }
}

/// Outcome of a readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Whether the image can skip enhancement.
    pub ocr_ready: bool,
    /// The statistics the decision was based on.
    pub metrics: QualityMetrics,
}

/// Decides whether an image needs the enhancement chain.
#[derive(Debug, Clone)]
pub struct QualityClassifier {
    thresholds: QualityThresholds,
    max_dimension: u32,
}

impl Default for QualityClassifier {
    fn default() -> Self {
        Self::new(QualityThresholds::default(), DEFAULT_MAX_DIMENSION)
    }
}

impl QualityClassifier {
    pub fn new(thresholds: QualityThresholds, max_dimension: u32) -> Self {
        Self {
            thresholds,
            max_dimension,
        }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Measures `image`, downscaling first when its long side exceeds the
    /// configured maximum.
    pub fn measure(&self, image: &GrayImage) -> QualityMetrics {
        if image.width().max(image.height()) > self.max_dimension {
            QualityMetrics::compute(&downscale_to_max_dimension(image, self.max_dimension))
        } else {
            QualityMetrics::compute(image)
        }
    }

    /// Measures `image` and applies the acceptance thresholds.
    pub fn classify(&self, image: &GrayImage) -> QualityAssessment {
        let metrics = self.measure(image);
        let ocr_ready = self.thresholds.accepts(&metrics);
        debug!(
            entropy = metrics.entropy,
            contrast = metrics.contrast,
            brightness = metrics.brightness,
            stroke_density = metrics.stroke_density,
            black_fraction = metrics.black_fraction,
            white_fraction = metrics.white_fraction,
            ocr_ready,
            "quality classification"
        );
        QualityAssessment { ocr_ready, metrics }
    }
}
