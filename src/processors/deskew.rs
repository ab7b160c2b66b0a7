//! Foreground cropping and skew correction.
//!
//! Non-zero pixels are foreground. Cropping keeps the bounding box of the
//! largest external contour; deskewing measures the minimum-area rectangle
//! of all foreground pixels and rotates the image level. Both steps return
//! their input unchanged when there is nothing to act on.

use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::constants::MIN_DESKEW_PIXELS;
use crate::processors::filters::rotate_bicubic;
use crate::processors::geometry::{PixelRect, Point, Polygon, normalize_skew_angle};
use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for cropping and deskewing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskewConfig {
    /// Fewer foreground pixels than this skips deskewing.
    pub min_pixels: usize,
    /// Rotations smaller than this many degrees are not applied.
    pub min_angle_degrees: f32,
}

impl Default for DeskewConfig {
    fn default() -> Self {
        Self {
            min_pixels: MIN_DESKEW_PIXELS,
            min_angle_degrees: 1.0,
        }
    }
}

impl ConfigValidator for DeskewConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..45.0).contains(&self.min_angle_degrees) {
            return Err(ConfigError::ValidationFailed {
                message: format!(
                    "min_angle_degrees must be within [0, 45), got {}",
                    self.min_angle_degrees
                ),
            });
        }
        Ok(())
    }
}

/// Crops to the dominant foreground region and straightens it.
#[derive(Debug, Clone, Default)]
pub struct ContourCropDeskewer {
    config: DeskewConfig,
}

impl ContourCropDeskewer {
    pub fn new(config: DeskewConfig) -> Self {
        Self { config }
    }

    /// Bounding box of the external contour enclosing the largest area.
    ///
    /// Among equal areas the first traced contour wins.
    pub fn largest_region(&self, image: &GrayImage) -> Option<PixelRect> {
        let contours = find_contours::<u32>(image);
        let mut best: Option<(f32, Polygon)> = None;
        for contour in contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        {
            let polygon = Polygon::from_contour(contour);
            let area = polygon.area();
            if best.as_ref().is_none_or(|(a, _)| area > *a) {
                best = Some((area, polygon));
            }
        }
        best.and_then(|(_, polygon)| polygon.pixel_bounds())
    }

    /// Crops to [`Self::largest_region`], or returns a copy when there is no
    /// foreground.
    pub fn crop(&self, image: &GrayImage) -> GrayImage {
        match self.largest_region(image) {
            Some(r) => {
                debug!(x = r.x, y = r.y, width = r.width, height = r.height, "cropping to largest contour");
                image::imageops::crop_imm(image, r.x, r.y, r.width, r.height).to_image()
            }
            None => image.clone(),
        }
    }

    /// Skew of the foreground in degrees, folded into `(-45, 45]`.
    ///
    /// Returns `None` when fewer than the configured number of foreground
    /// pixels exist.
    pub fn skew_angle(&self, image: &GrayImage) -> Option<f32> {
        let (count, extremes) = foreground_row_extremes(image);
        if count < self.config.min_pixels {
            return None;
        }
        let rect = Polygon::new(extremes).min_area_rect();
        Some(normalize_skew_angle(rect.angle))
    }

    /// Rotates `image` level when its skew is at least the configured minimum.
    pub fn deskew(&self, image: &GrayImage) -> GrayImage {
        match self.skew_angle(image) {
            Some(angle) if angle.abs() >= self.config.min_angle_degrees => {
                debug!(angle, "deskewing");
                rotate_bicubic(image, angle)
            }
            Some(angle) => {
                debug!(angle, "skew below threshold, leaving image as is");
                image.clone()
            }
            None => {
                debug!("too few foreground pixels to estimate skew");
                image.clone()
            }
        }
    }

    /// Crops then deskews.
    pub fn crop_and_deskew(&self, image: &GrayImage) -> GrayImage {
        self.deskew(&self.crop(image))
    }
}

/// Counts foreground pixels and collects the leftmost and rightmost one of
/// every row. Those points span the same convex hull as the full set.
fn foreground_row_extremes(image: &GrayImage) -> (usize, Vec<Point>) {
    let mut count = 0usize;
    let mut points = Vec::new();
    let width = image.width() as usize;
    if width == 0 {
        return (0, points);
    }
    for (y, row) in image.as_raw().chunks_exact(width).enumerate() {
        let mut first = None;
        let mut last = 0usize;
        for (x, &v) in row.iter().enumerate() {
            if v > 0 {
                count += 1;
                first.get_or_insert(x);
                last = x;
            }
        }
        if let Some(first) = first {
            points.push(Point::new(first as f32, y as f32));
            if last != first {
                points.push(Point::new(last as f32, y as f32));
            }
        }
    }
    (count, points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn tilted_bar(deg: f32) -> GrayImage {
        let (s, c) = deg.to_radians().sin_cos();
        GrayImage::from_fn(240, 160, |x, y| {
            let dx = x as f32 - 120.0;
            let dy = y as f32 - 80.0;
            let u = dx * c + dy * s;
            let v = -dx * s + dy * c;
            if u.abs() < 80.0 && v.abs() < 8.0 { Luma([255]) } else { Luma([0]) }
        })
    }

    #[test]
    fn test_uniform_inputs_are_unchanged() {
        let d = ContourCropDeskewer::default();
        for level in [0u8, 255] {
            let img = GrayImage::from_pixel(30, 20, Luma([level]));
            assert_eq!(d.crop_and_deskew(&img), img);
        }
    }

    #[test]
    fn test_crop_picks_largest_region() {
        let mut img = GrayImage::new(80, 60);
        for y in 10..25 {
            for x in 20..40 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        for y in 45..50 {
            for x in 60..66 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let d = ContourCropDeskewer::default();
        assert_eq!(
            d.largest_region(&img),
            Some(PixelRect { x: 20, y: 10, width: 20, height: 15 })
        );
        let cropped = d.crop(&img);
        assert_eq!(cropped.dimensions(), (20, 15));
        assert!(cropped.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_too_few_pixels_skips() {
        let mut img = GrayImage::new(50, 50);
        for i in 0..9 {
            img.put_pixel(5 + i * 4, 5 + i * 3, Luma([255]));
        }
        let d = ContourCropDeskewer::default();
        assert_eq!(d.skew_angle(&img), None);
        assert_eq!(d.deskew(&img), img);
    }

    #[test]
    fn test_measures_tilt() {
        let d = ContourCropDeskewer::default();
        for deg in [-20.0f32, -6.0, 10.0, 30.0] {
            let got = d.skew_angle(&tilted_bar(deg)).unwrap();
            assert!((got - deg).abs() < 1.0, "expected {}, got {}", deg, got);
        }
    }

    #[test]
    fn test_deskew_straightens_bar() {
        let d = ContourCropDeskewer::default();
        let out = d.deskew(&tilted_bar(12.0));
        assert_eq!(out.dimensions(), (240, 160));
        let residual = d.skew_angle(&out).unwrap();
        assert!(residual.abs() < 1.0, "residual skew {}", residual);
    }

    #[test]
    fn test_small_skew_is_ignored() {
        let d = ContourCropDeskewer::default();
        let img = tilted_bar(0.0);
        assert_eq!(d.deskew(&img), img);
    }

    #[test]
    fn test_row_extremes() {
        let mut img = GrayImage::new(10, 3);
        img.put_pixel(2, 0, Luma([1]));
        img.put_pixel(7, 0, Luma([9]));
        img.put_pixel(4, 2, Luma([200]));
        let (count, points) = foreground_row_extremes(&img);
        assert_eq!(count, 3);
        assert_eq!(points, vec![Point::new(2.0, 0.0), Point::new(7.0, 0.0), Point::new(4.0, 2.0)]);
    }
}
