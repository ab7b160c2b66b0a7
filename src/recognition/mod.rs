//! Recognizer collaborators and the arbitration between them.
//!
//! Recognizers are opaque: they accept an image and return best-effort text.
//! They are injected as `Arc<dyn ...>` trait objects, loaded once by the
//! caller and shared read-only across pipeline invocations, so every
//! implementation must be safe for concurrent calls.

pub mod arbiter;
#[cfg(feature = "tesseract")]
pub mod tesseract;

use crate::core::OcrResult;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

pub use arbiter::{
    ArbiterConfig, GibberishPolicy, OcrArbiter, choose_better, is_valid_math, operator_score,
};
#[cfg(feature = "tesseract")]
pub use tesseract::{TesseractConfig, TesseractEngine};

/// Page layout assumption passed to the raster engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutMode {
    /// A single uniform block of text.
    SingleBlock,
    /// Sparse text in no particular order.
    SparseText,
}

/// Which recognizer pass produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineTag {
    Latex,
    RasterPrimary,
    RasterAlternate,
}

impl std::fmt::Display for EngineTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineTag::Latex => write!(f, "latex"),
            EngineTag::RasterPrimary => write!(f, "raster-primary"),
            EngineTag::RasterAlternate => write!(f, "raster-alternate"),
        }
    }
}

/// Text produced by one recognizer pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub text: String,
    pub engine: EngineTag,
    /// Whether the text contains at least one math operator.
    pub valid_math: bool,
}

impl RecognitionResult {
    pub fn new(text: String, engine: EngineTag) -> Self {
        let valid_math = is_valid_math(&text);
        Self {
            text,
            engine,
            valid_math,
        }
    }
}

/// Maps an image of typeset or handwritten math to LaTeX-like text.
pub trait LatexRecognizer: Send + Sync + std::fmt::Debug {
    /// Recognizes the expression in `image`. An empty string means nothing
    /// was recognized.
    fn recognize(&self, image: &RgbImage) -> OcrResult<String>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "latex"
    }
}

/// General-purpose text recognizer with configurable layout assumptions.
pub trait RasterOcrEngine: Send + Sync + std::fmt::Debug {
    /// Recognizes text in `image` under the given layout assumption.
    fn recognize(&self, image: &DynamicImage, layout: LayoutMode) -> OcrResult<String>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "raster"
    }
}

/// A LaTeX recognizer that never recognizes anything, forcing every image
/// through the raster engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLatexRecognizer;

impl LatexRecognizer for DisabledLatexRecognizer {
    fn recognize(&self, _image: &RgbImage) -> OcrResult<String> {
        Ok(String::new())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}
