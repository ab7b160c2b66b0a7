//! Constants shared across the pipeline stages.

/// Long-side limit in pixels above which inputs are downscaled before any
/// other stage runs.
pub const DEFAULT_MAX_DIMENSION: u32 = 1500;

/// Batches larger than this are processed in parallel with rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// Pixels darker than this count towards stroke density.
pub const STROKE_LEVEL: u8 = 128;

/// Pixels darker than this count as black.
pub const BLACK_LEVEL: u8 = 50;

/// Pixels brighter than this count as white.
pub const WHITE_LEVEL: u8 = 200;

/// Operators whose presence marks text as mathematical.
pub const MATH_OPERATORS: [char; 6] = ['=', '^', '+', '-', '*', '/'];

/// Minimum number of foreground pixels needed to estimate skew.
pub const MIN_DESKEW_PIXELS: usize = 10;
