//! Text normalization for recognizer output.
//!
//! - [`noise`]: glyph substitution and letter-digit disambiguation
//! - [`split`]: equation / question boundary detection

pub mod noise;
pub mod split;

pub use noise::NoiseCorrector;
pub use split::{
    DEFAULT_TRIGGERS, EquationQuestionPair, EquationQuestionSplitter, SplitterConfig,
};
