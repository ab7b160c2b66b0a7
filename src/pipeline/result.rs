//! Output of one pipeline invocation.

use crate::core::OcrResult;
use crate::processors::QualityMetrics;
use crate::recognition::EngineTag;
use crate::text::EquationQuestionPair;
use crate::utils::encode_png;
use image::GrayImage;
use serde::Serialize;
use std::fmt;

/// The recognized equation and question, with the evidence behind them.
#[derive(Debug, Clone, Serialize)]
pub struct EquationExtraction {
    /// The math expression, possibly empty.
    pub equation: String,
    /// The lower-cased question, or empty.
    pub question: String,
    /// Recognizer output before glyph stripping and splitting.
    pub raw_text: String,
    /// Which recognizer pass produced `raw_text`.
    pub engine: EngineTag,
    /// Whether `raw_text` contains a math operator.
    pub valid_math: bool,
    pub quality: QualityMetrics,
    /// Whether the enhancement path ran.
    pub enhanced: bool,
    /// The processed image handed to the recognizers.
    #[serde(skip)]
    pub image: GrayImage,
}

impl EquationExtraction {
    pub fn pair(&self) -> EquationQuestionPair {
        EquationQuestionPair::new(self.equation.clone(), self.question.clone())
    }

    /// See [`EquationQuestionPair::query`].
    pub fn query(&self) -> String {
        self.pair().query()
    }

    /// True when nothing usable was recognized.
    pub fn is_empty(&self) -> bool {
        self.equation.is_empty() && self.question.is_empty()
    }

    /// PNG encoding of the processed image.
    pub fn preprocessed_png(&self) -> OcrResult<Vec<u8>> {
        encode_png(&self.image)
    }
}

impl fmt::Display for EquationExtraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Equation: {}", self.equation)?;
        if !self.question.is_empty() {
            writeln!(f, "Question: {}", self.question)?;
        }
        writeln!(f, "Raw text: {}", self.raw_text)?;
        writeln!(
            f,
            "Engine: {} ({})",
            self.engine,
            if self.enhanced { "enhanced" } else { "clean" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction(question: &str) -> EquationExtraction {
        EquationExtraction {
            equation: "x^2=4".to_string(),
            question: question.to_string(),
            raw_text: "x^2=4 what is x".to_string(),
            engine: EngineTag::RasterPrimary,
            valid_math: true,
            quality: QualityMetrics::compute(&GrayImage::new(4, 4)),
            enhanced: true,
            image: GrayImage::from_pixel(4, 4, image::Luma([255])),
        }
    }

    #[test]
    fn test_query_and_display() {
        let e = extraction("what is x");
        assert_eq!(e.query(), "what is x: x^2=4");
        let shown = e.to_string();
        assert!(shown.contains("Question: what is x"));
        assert!(shown.contains("raster-primary (enhanced)"));

        let bare = extraction("");
        assert_eq!(bare.query(), "x^2=4");
        assert!(!bare.to_string().contains("Question"));
    }

    #[test]
    fn test_serializes_without_pixels() {
        let json = serde_json::to_value(extraction("")).unwrap();
        assert_eq!(json["engine"], "raster-primary");
        assert!(json.get("image").is_none());
        assert!(json["quality"]["entropy"].is_number());
    }

    #[test]
    fn test_png_encoding() {
        let png = extraction("").preprocessed_png().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }
}
