//! Arbitration between the LaTeX recognizer and the raster OCR engine.
//!
//! The LaTeX recognizer runs first. Its output is kept unless it is empty or
//! gibberish, in which case the raster engine runs with a single-block
//! layout, and again with a sparse layout when the first pass contains no
//! math operator. Raster output is noise-corrected before it is scored.

use super::{EngineTag, LatexRecognizer, LayoutMode, RasterOcrEngine, RecognitionResult};
use crate::core::config::{ConfigError, ConfigValidator};
use crate::core::constants::MATH_OPERATORS;
use crate::core::{OCRError, OcrResult, ProcessingStage};
use crate::text::NoiseCorrector;
use crate::utils::dynamic_to_rgb;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, warn};

/// True when `text` contains any of `= ^ + - * /`.
pub fn is_valid_math(text: &str) -> bool {
    text.chars().any(|c| MATH_OPERATORS.contains(&c))
}

/// Number of math operator occurrences in `text`.
pub fn operator_score(text: &str) -> usize {
    text.chars().filter(|c| MATH_OPERATORS.contains(c)).count()
}

/// Picks the candidate with more operator occurrences; ties keep `first`.
pub fn choose_better(first: RecognitionResult, second: RecognitionResult) -> RecognitionResult {
    if operator_score(&first.text) >= operator_score(&second.text) {
        first
    } else {
        second
    }
}

/// Rule for rejecting recognizer output as noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GibberishPolicy {
    /// Too short, or without a single alphanumeric character.
    Basic { min_length: usize },
    /// As `Basic`, and additionally rejects text where fewer than
    /// `min_ratio` of the characters are alphanumerics, math operators,
    /// brackets or whitespace.
    AllowedRatio { min_length: usize, min_ratio: f64 },
}

impl Default for GibberishPolicy {
    fn default() -> Self {
        GibberishPolicy::Basic { min_length: 3 }
    }
}

fn is_allowed_math_char(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || "+-*/=^()[]{}<>.,:;!|_'\\%".contains(c)
}

impl GibberishPolicy {
    /// The stricter rule with its customary 60% ratio.
    pub fn allowed_ratio() -> Self {
        GibberishPolicy::AllowedRatio {
            min_length: 3,
            min_ratio: 0.6,
        }
    }

    pub fn is_gibberish(&self, text: &str) -> bool {
        let min_length = match self {
            GibberishPolicy::Basic { min_length } => *min_length,
            GibberishPolicy::AllowedRatio { min_length, .. } => *min_length,
        };
        let total = text.chars().count();
        if total < min_length || !text.chars().any(char::is_alphanumeric) {
            return true;
        }
        match self {
            GibberishPolicy::Basic { .. } => false,
            GibberishPolicy::AllowedRatio { min_ratio, .. } => {
                let allowed = text.chars().filter(|&c| is_allowed_math_char(c)).count();
                (allowed as f64 / total as f64) < *min_ratio
            }
        }
    }
}

/// Arbitration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub gibberish: GibberishPolicy,
    /// Whether to retry the raster engine with a sparse layout when the
    /// single-block pass contains no operator.
    pub sparse_retry: bool,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            gibberish: GibberishPolicy::default(),
            sparse_retry: true,
        }
    }
}

impl ConfigValidator for ArbiterConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let GibberishPolicy::AllowedRatio { min_ratio, .. } = self.gibberish {
            self.validate_fraction("gibberish.min_ratio", min_ratio)?;
        }
        Ok(())
    }
}

/// Runs the recognizers and picks the best text.
#[derive(Debug, Clone)]
pub struct OcrArbiter {
    latex: Arc<dyn LatexRecognizer>,
    raster: Arc<dyn RasterOcrEngine>,
    corrector: NoiseCorrector,
    config: ArbiterConfig,
}

impl OcrArbiter {
    pub fn new(
        latex: Arc<dyn LatexRecognizer>,
        raster: Arc<dyn RasterOcrEngine>,
        config: ArbiterConfig,
    ) -> Self {
        Self {
            latex,
            raster,
            corrector: NoiseCorrector::new(),
            config,
        }
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    /// Recognizes `image`, never failing: recognizer errors and panics count
    /// as empty output.
    pub fn recognize(&self, image: &DynamicImage) -> RecognitionResult {
        let rgb = dynamic_to_rgb(image);
        let latex = guarded(self.latex.name(), || self.latex.recognize(&rgb));
        let latex = latex.trim();

        if !latex.is_empty() && !self.config.gibberish.is_gibberish(latex) {
            let text: String = latex.chars().filter(|c| !c.is_whitespace()).collect();
            debug!(text = %text, "accepted latex recognizer output");
            return RecognitionResult::new(text, EngineTag::Latex);
        }
        debug!(latex, "latex output empty or gibberish, falling back to raster engine");

        let primary = self.raster_pass(image, LayoutMode::SingleBlock, EngineTag::RasterPrimary);
        if primary.valid_math || !self.config.sparse_retry {
            return primary;
        }

        debug!(text = %primary.text, "single-block output has no operator, retrying sparse layout");
        let alternate = self.raster_pass(image, LayoutMode::SparseText, EngineTag::RasterAlternate);
        choose_better(primary, alternate)
    }

    fn raster_pass(&self, image: &DynamicImage, layout: LayoutMode, tag: EngineTag) -> RecognitionResult {
        let raw = guarded(self.raster.name(), || self.raster.recognize(image, layout));
        let text = self.corrector.correct(raw.trim());
        debug!(engine = %tag, raw = raw.trim(), corrected = %text, "raster pass");
        RecognitionResult::new(text, tag)
    }
}

/// Invokes a recognizer, turning errors and panics into an empty string.
fn guarded<F>(engine: &str, call: F) -> String
where
    F: FnOnce() -> OcrResult<String>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(engine, error = %e, "recognizer failed, treating output as empty");
            String::new()
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            let e = OCRError::processing_message(ProcessingStage::Recognition, engine, message);
            warn!(engine, error = %e, "recognizer panicked, treating output as empty");
            String::new()
        }
    }
}
