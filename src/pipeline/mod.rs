//! The extraction pipeline.
//!
//! Raw image bytes go through decoding, grayscale conversion, downscaling,
//! quality classification, optional enhancement, cropping and deskewing,
//! recognizer arbitration, glyph stripping and equation/question splitting.

mod config;
mod orchestration;
mod result;
mod stats;

pub use config::PipelineConfig;
pub use orchestration::{
    MathPipeline, MathPipelineBuilder, PreprocessedImage, Preprocessor, ProcessingStrategy,
};
pub use result::EquationExtraction;
pub use stats::{PipelineStats, StatsManager};
