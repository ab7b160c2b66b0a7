//! The adaptive enhancement chain for images that fail the readiness check.
//!
//! Denoise, boost local contrast, sharpen, then binarize with Otsu's global
//! threshold and clean speckle morphologically. When binarization collapses
//! to a near-uniform image, a Gaussian adaptive threshold over the
//! normalized image is used instead.

use crate::core::config::{ConfigError, ConfigValidator};
use crate::processors::filters::{
    adaptive_threshold_gaussian, apply_lut, clahe, gamma_lut, normalize_min_max,
};
use image::GrayImage;
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::distance_transform::Norm;
use imageproc::filter::{bilateral_filter, gaussian_blur_f32, median_filter, sharpen3x3};
use imageproc::morphology::{close, open};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Parameters of the enhancement chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    /// Sigma of the initial Gaussian blur (1.1 matches a 5x5 kernel).
    pub gaussian_sigma: f32,
    /// Radius of the median filter; 1 gives a 3x3 window.
    pub median_radius: u32,
    /// Side of the square bilateral window.
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    pub clahe_clip_limit: f32,
    pub clahe_grid: (u32, u32),
    pub gamma: f32,
    /// Mean intensity below which the binarized result counts as degenerate.
    pub degenerate_low: f64,
    /// Mean intensity above which the binarized result counts as degenerate.
    pub degenerate_high: f64,
    pub adaptive_block_size: u32,
    pub adaptive_offset: f32,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            gaussian_sigma: 1.1,
            median_radius: 1,
            bilateral_diameter: 9,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_space: 75.0,
            clahe_clip_limit: 2.0,
            clahe_grid: (8, 8),
            gamma: 1.2,
            degenerate_low: 10.0,
            degenerate_high: 245.0,
            adaptive_block_size: 11,
            adaptive_offset: 2.0,
        }
    }
}

impl ConfigValidator for EnhancerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_positive("gaussian_sigma", self.gaussian_sigma as f64)?;
        self.validate_positive("bilateral_diameter", self.bilateral_diameter as f64)?;
        self.validate_positive("bilateral_sigma_color", self.bilateral_sigma_color as f64)?;
        self.validate_positive("bilateral_sigma_space", self.bilateral_sigma_space as f64)?;
        self.validate_positive("gamma", self.gamma as f64)?;
        self.validate_range("degenerate mean", self.degenerate_low, self.degenerate_high)?;
        if self.clahe_grid.0 == 0 || self.clahe_grid.1 == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "clahe_grid must have non-zero dimensions".to_string(),
            });
        }
        if self.adaptive_block_size < 3 || self.adaptive_block_size % 2 == 0 {
            return Err(ConfigError::InvalidConfig {
                message: format!(
                    "adaptive_block_size must be an odd number >= 3, got {}",
                    self.adaptive_block_size
                ),
            });
        }
        Ok(())
    }
}

/// Result of running the enhancement chain.
#[derive(Debug, Clone)]
pub struct EnhancedImage {
    /// Binary image, every pixel 0 or 255.
    pub image: GrayImage,
    /// Otsu level chosen for the global binarization.
    pub otsu_level: u8,
    /// Whether the adaptive-threshold fallback replaced the global result.
    pub used_fallback: bool,
}

/// Runs the fixed denoise/contrast/threshold chain.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveEnhancer {
    config: EnhancerConfig,
}

impl AdaptiveEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Smoothing, contrast and sharpening steps up to (not including)
    /// binarization. The output spans the full 0-255 range unless flat.
    pub fn normalize(&self, image: &GrayImage) -> GrayImage {
        if image.width() == 0 || image.height() == 0 {
            return image.clone();
        }
        let c = &self.config;
        let blurred = gaussian_blur_f32(image, c.gaussian_sigma);
        let median = median_filter(&blurred, c.median_radius, c.median_radius);
        let bilateral = bilateral_filter(
            &median,
            c.bilateral_diameter,
            c.bilateral_sigma_color,
            c.bilateral_sigma_space,
        );
        let equalized = clahe(&bilateral, c.clahe_clip_limit, c.clahe_grid);
        let corrected = apply_lut(&equalized, &gamma_lut(c.gamma));
        normalize_min_max(&sharpen3x3(&corrected))
    }

    /// Enhances `image` into a binary image of the same dimensions.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn enhance(&self, image: &GrayImage) -> EnhancedImage {
        let norm = self.normalize(image);

        let level = otsu_level(&norm);
        let binary = threshold(&norm, level, ThresholdType::Binary);
        let morph = open(&close(&binary, Norm::LInf, 1), Norm::LInf, 1);

        let mean = mean_intensity(&morph);
        if mean > self.config.degenerate_high || mean < self.config.degenerate_low {
            debug!(mean, otsu_level = level, "global binarization degenerate, using adaptive threshold");
            return EnhancedImage {
                image: adaptive_threshold_gaussian(
                    &norm,
                    self.config.adaptive_block_size,
                    self.config.adaptive_offset,
                ),
                otsu_level: level,
                used_fallback: true,
            };
        }

        debug!(mean, otsu_level = level, "global binarization accepted");
        EnhancedImage {
            image: morph,
            otsu_level: level,
            used_fallback: false,
        }
    }
}

/// Mean pixel value; 0 for an empty image.
pub fn mean_intensity(image: &GrayImage) -> f64 {
    let n = image.pixels().len();
    if n == 0 {
        return 0.0;
    }
    image.pixels().map(|p| p[0] as u64).sum::<u64>() as f64 / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn is_binary(img: &GrayImage) -> bool {
        img.pixels().all(|p| p[0] == 0 || p[0] == 255)
    }

    /// Dim, low-contrast photo of a few strokes with mild noise.
    fn dim_photo() -> GrayImage {
        GrayImage::from_fn(160, 90, |x, y| {
            let stroke = (40..50).contains(&y) && (20..140).contains(&x)
                || (20..70).contains(&y) && (75..82).contains(&x);
            let noise = ((x * 7 + y * 13) % 5) as u8;
            if stroke { Luma([70 + noise]) } else { Luma([95 + noise]) }
        })
    }

    #[test]
    fn test_output_is_binary_and_same_size() {
        let img = dim_photo();
        let out = AdaptiveEnhancer::default().enhance(&img);
        assert_eq!(out.image.dimensions(), img.dimensions());
        assert!(is_binary(&out.image));
    }

    #[test]
    fn test_strokes_become_dark() {
        let out = AdaptiveEnhancer::default().enhance(&dim_photo());
        assert!(!out.used_fallback);
        assert_eq!(out.image.get_pixel(60, 45)[0], 0);
        assert_eq!(out.image.get_pixel(10, 10)[0], 255);
    }

    #[test]
    fn test_flat_image_uses_fallback_and_stays_binary() {
        for level in [0u8, 128, 255] {
            let img = GrayImage::from_pixel(40, 30, Luma([level]));
            let out = AdaptiveEnhancer::default().enhance(&img);
            assert!(out.used_fallback);
            assert!(is_binary(&out.image));
            assert_eq!(out.image.dimensions(), (40, 30));
        }
    }

    #[test]
    fn test_normalize_spans_full_range() {
        let norm = AdaptiveEnhancer::default().normalize(&dim_photo());
        let (lo, hi) = norm.pixels().fold((255u8, 0u8), |(l, h), p| (l.min(p[0]), h.max(p[0])));
        assert_eq!((lo, hi), (0, 255));
    }

    #[test]
    fn test_normalize_keeps_step_edge() {
        let step = GrayImage::from_fn(64, 16, |x, _| Luma([if x < 32 { 10 } else { 240 }]));
        let norm = AdaptiveEnhancer::default().normalize(&step);
        assert_eq!(norm.dimensions(), (64, 16));
        assert!(norm.get_pixel(2, 8)[0] < 40);
        assert!(norm.get_pixel(61, 8)[0] > 200);
    }

    #[test]
    fn test_normalize_empty_image() {
        let empty = GrayImage::new(0, 0);
        assert_eq!(AdaptiveEnhancer::default().normalize(&empty).dimensions(), (0, 0));
    }

    #[test]
    fn test_mean_intensity() {
        assert_eq!(mean_intensity(&GrayImage::new(0, 0)), 0.0);
        let img = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 100 }]));
        assert_eq!(mean_intensity(&img), 50.0);
    }

    #[test]
    fn test_config_validation() {
        assert!(EnhancerConfig::default().validate().is_ok());
        let even_block = EnhancerConfig {
            adaptive_block_size: 10,
            ..Default::default()
        };
        assert!(even_block.validate().is_err());
        let json = r#"{"gamma": 1.5, "clahe_grid": [4, 4]}"#;
        let parsed: EnhancerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.clahe_grid, (4, 4));
        assert_eq!(parsed.bilateral_diameter, 9);
    }
}
