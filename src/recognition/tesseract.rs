//! Raster OCR backed by the system Tesseract installation.

use super::{LayoutMode, RasterOcrEngine};
use crate::core::{OCRError, OcrResult};
use image::{DynamicImage, ImageFormat};
use leptess::{LepTess, Variable};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

const ENGINE: &str = "tesseract";

/// Tesseract settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseractConfig {
    /// Traineddata language code.
    pub language: String,
    /// Source resolution hint in DPI.
    pub dpi: i32,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            dpi: 300,
        }
    }
}

/// Page segmentation mode for a layout assumption.
fn page_segmentation_mode(layout: LayoutMode) -> &'static str {
    match layout {
        LayoutMode::SingleBlock => "6",
        LayoutMode::SparseText => "11",
    }
}

/// Tesseract engine. A fresh `LepTess` handle is created per call, so one
/// engine can be shared across threads.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    config: TesseractConfig,
}

impl TesseractEngine {
    /// Creates the engine, checking once that the language data loads.
    pub fn new(config: TesseractConfig) -> OcrResult<Self> {
        LepTess::new(None, &config.language).map_err(|e| {
            OCRError::recognition_error(
                ENGINE,
                format!(
                    "failed to initialize with language '{}': {}; is the language data installed?",
                    config.language, e
                ),
            )
        })?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TesseractConfig {
        &self.config
    }
}

impl RasterOcrEngine for TesseractEngine {
    fn recognize(&self, image: &DynamicImage, layout: LayoutMode) -> OcrResult<String> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OCRError::invalid_input("image dimensions must be non-zero"));
        }

        let mut lt = LepTess::new(None, &self.config.language)
            .map_err(|e| OCRError::recognition_error(ENGINE, format!("initialization failed: {e}")))?;
        lt.set_variable(Variable::TesseditPagesegMode, page_segmentation_mode(layout))
            .map_err(|e| OCRError::recognition_error(ENGINE, format!("failed to set PSM: {e}")))?;

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| OCRError::encode_error("tesseract input", e))?;
        lt.set_image_from_mem(png.get_ref())
            .map_err(|e| OCRError::recognition_error(ENGINE, format!("failed to load image: {e}")))?;
        lt.set_source_resolution(self.config.dpi);

        let text = lt
            .get_utf8_text()
            .map_err(|e| OCRError::recognition_error(ENGINE, format!("text extraction failed: {e}")))?;
        Ok(text.trim().to_string())
    }

    fn name(&self) -> &str {
        ENGINE
    }
}
