//! # mathsnap
//!
//! Turns a photograph of a math problem into a clean equation string and an
//! optional natural-language question.
//!
//! ## Features
//!
//! - Quality classification that skips enhancement for clean scans
//! - Denoise, contrast and binarization chain with an adaptive-threshold fallback
//! - Cropping to the dominant foreground region and skew correction
//! - Arbitration between a LaTeX recognizer and a raster OCR engine
//! - Glyph normalization and equation/question splitting
//! - Optional correction and solving through a text-completion service
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration validation and constants
//! * [`processors`] - Image metrics, filters, enhancement and deskewing
//! * [`recognition`] - Recognizer traits and the arbiter
//! * [`text`] - Noise correction and splitting
//! * [`pipeline`] - The end-to-end pipeline and its configuration
//! * [`completion`] - Prompt templates and the equation solver
//! * [`utils`] - Image ingestion and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mathsnap::prelude::*;
//! use std::sync::Arc;
//!
//! # #[derive(Debug)]
//! # struct MyOcr;
//! # impl RasterOcrEngine for MyOcr {
//! #     fn recognize(&self, _: &image::DynamicImage, _: LayoutMode) -> OcrResult<String> {
//! #         Ok(String::new())
//! #     }
//! # }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = MathPipelineBuilder::new(Arc::new(MyOcr)).build()?;
//! let bytes = std::fs::read("homework.jpg")?;
//! let extraction = pipeline.process_bytes(&bytes)?;
//! println!("equation: {}", extraction.equation);
//! println!("question: {}", extraction.question);
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod core;
pub mod pipeline;
pub mod processors;
pub mod recognition;
pub mod text;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use mathsnap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::completion::{EquationSolver, MathCompletion, PromptTemplate};
    pub use crate::core::{OCRError, OcrResult};
    pub use crate::pipeline::{EquationExtraction, MathPipeline, MathPipelineBuilder, PipelineConfig};
    pub use crate::recognition::{EngineTag, LatexRecognizer, LayoutMode, RasterOcrEngine};
    pub use crate::text::EquationQuestionPair;
    pub use crate::utils::RawImage;
}
