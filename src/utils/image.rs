//! Utility functions for image ingestion and conversion.
//!
//! This module turns raw uploaded bytes into pixel buffers: EXIF orientation
//! handling, decoding, color conversion, area-averaged downscaling and PNG
//! encoding of processed images.

use crate::core::{OCRError, OcrResult};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// An undecoded image as received from the caller.
///
/// Holds the encoded bytes together with the EXIF orientation declared in
/// them (1 when absent). Decoding consumes the value.
#[derive(Debug, Clone)]
pub struct RawImage {
    bytes: Vec<u8>,
    orientation: u32,
}

impl RawImage {
    /// Wraps encoded bytes, reading the EXIF orientation tag if present.
    pub fn new(bytes: Vec<u8>) -> Self {
        let orientation = read_exif_orientation(&bytes);
        Self { bytes, orientation }
    }

    /// Wraps encoded bytes with an orientation supplied out of band.
    pub fn with_orientation(bytes: Vec<u8>, orientation: u32) -> Self {
        Self { bytes, orientation }
    }

    /// Reads an image file from disk.
    pub fn from_path(path: &Path) -> OcrResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes))
    }

    /// The declared EXIF orientation (1-8).
    pub fn orientation(&self) -> u32 {
        self.orientation
    }

    /// The encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decodes the bytes and applies the EXIF orientation.
    ///
    /// # Errors
    ///
    /// Returns `OCRError::InvalidInput` for an empty buffer and
    /// `OCRError::ImageDecode` when the bytes are not a supported image.
    pub fn decode(self) -> OcrResult<DynamicImage> {
        if self.bytes.is_empty() {
            return Err(OCRError::invalid_input("image buffer is empty"));
        }
        let img = image::load_from_memory(&self.bytes).map_err(OCRError::ImageDecode)?;
        debug!(
            width = img.width(),
            height = img.height(),
            orientation = self.orientation,
            "decoded input image"
        );
        Ok(apply_orientation(img, self.orientation))
    }
}

/// Reads the EXIF orientation tag from encoded image bytes.
///
/// Returns 1 (identity) when the container has no EXIF block or no
/// orientation field.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Applies an EXIF orientation transform. Unknown values are ignored.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: &DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Converts a DynamicImage to a GrayImage.
pub fn dynamic_to_gray(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Computes the dimensions after fitting the long side into `max_dimension`.
///
/// Returns `None` when the image already fits. Fractional sizes are
/// truncated, and neither side drops below one pixel.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let long_side = width.max(height);
    if long_side <= max_dimension || max_dimension == 0 {
        return None;
    }
    let scale = max_dimension as f64 / long_side as f64;
    let w = ((width as f64 * scale) as u32).max(1);
    let h = ((height as f64 * scale) as u32).max(1);
    Some((w, h))
}

/// Downscales a grayscale image so its long side is at most `max_dimension`,
/// preserving aspect ratio and averaging source pixels over each target cell.
///
/// Images that already fit are returned as an unchanged copy.
pub fn downscale_to_max_dimension(img: &GrayImage, max_dimension: u32) -> GrayImage {
    match scaled_dimensions(img.width(), img.height(), max_dimension) {
        Some((w, h)) => {
            debug!(
                from_width = img.width(),
                from_height = img.height(),
                to_width = w,
                to_height = h,
                "downscaling oversized input"
            );
            image::imageops::thumbnail(img, w, h)
        }
        None => img.clone(),
    }
}

/// Encodes a grayscale image as PNG bytes.
pub fn encode_png(img: &GrayImage) -> OcrResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| OCRError::encode_error("png encoding of processed image", e))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    fn png_bytes(img: &GrayImage) -> Vec<u8> {
        encode_png(img).unwrap()
    }

    #[test]
    fn test_decode_round_trip_png() {
        let img = GrayImage::from_pixel(12, 7, Luma([90]));
        let raw = RawImage::new(png_bytes(&img));
        assert_eq!(raw.orientation(), 1);
        let decoded = raw.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (12, 7));
        assert_eq!(dynamic_to_gray(&decoded).get_pixel(3, 3)[0], 90);
    }

    #[test]
    fn test_decode_rejects_garbage_and_empty() {
        let err = RawImage::new(b"not an image".to_vec()).decode().unwrap_err();
        assert!(matches!(err, OCRError::ImageDecode(_)));

        let err = RawImage::new(Vec::new()).decode().unwrap_err();
        assert!(matches!(err, OCRError::InvalidInput { .. }));
    }

    #[test]
    fn test_declared_orientation_is_applied() {
        let img = GrayImage::from_pixel(10, 20, Luma([100]));
        let raw = RawImage::with_orientation(png_bytes(&img), 6);
        let decoded = raw.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 10));
    }

    #[test]
    fn test_apply_orientation_variants() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([1, 2, 3])));
        assert_eq!(apply_orientation(img.clone(), 1).width(), 10);
        assert_eq!(apply_orientation(img.clone(), 3).width(), 10);
        assert_eq!(apply_orientation(img.clone(), 8).width(), 20);
        assert_eq!(apply_orientation(img, 42).width(), 10);
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(1000, 800, 1500), None);
        assert_eq!(scaled_dimensions(1500, 10, 1500), None);
        assert_eq!(scaled_dimensions(3000, 1000, 1500), Some((1500, 500)));
        assert_eq!(scaled_dimensions(1000, 4500, 1500), Some((333, 1500)));
        assert_eq!(scaled_dimensions(6000, 2, 1500), Some((1500, 1)));
    }

    #[test]
    fn test_downscale_averages_pixels() {
        let img = GrayImage::from_fn(3000, 20, |x, _| if x % 2 == 0 { Luma([0]) } else { Luma([200]) });
        let small = downscale_to_max_dimension(&img, 1500);
        assert_eq!(small.dimensions(), (1500, 10));
        let v = small.get_pixel(700, 5)[0];
        assert!((80..=120).contains(&v), "expected averaged value, got {}", v);
    }
}
