//! Running statistics over pipeline invocations.

use super::EquationExtraction;
use crate::recognition::EngineTag;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Counters for processed images.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineStats {
    /// Images that reached the recognizers.
    pub total_processed: usize,
    /// Images that failed to decode.
    pub failed: usize,
    /// Images routed through the enhancement path.
    pub enhanced: usize,
    /// Extractions accepted from the LaTeX recognizer.
    pub latex_accepted: usize,
    /// Extractions that fell back to the raster engine.
    pub raster_fallbacks: usize,
    /// Extractions with an empty equation.
    pub empty_results: usize,
    /// Average processing time in milliseconds.
    pub average_time_ms: f64,
}

impl PipelineStats {
    fn ratio(&self, count: usize) -> f64 {
        if self.total_processed == 0 {
            0.0
        } else {
            (count as f64 / self.total_processed as f64) * 100.0
        }
    }

    /// Percentage of images that needed enhancement.
    pub fn enhancement_rate(&self) -> f64 {
        self.ratio(self.enhanced)
    }

    /// Percentage of images answered by the LaTeX recognizer.
    pub fn latex_rate(&self) -> f64 {
        self.ratio(self.latex_accepted)
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Statistics:")?;
        writeln!(f, "  Total processed: {}", self.total_processed)?;
        writeln!(f, "  Failed: {}", self.failed)?;
        writeln!(
            f,
            "  Enhanced: {} ({:.1}%)",
            self.enhanced,
            self.enhancement_rate()
        )?;
        writeln!(
            f,
            "  LaTeX accepted: {} ({:.1}%)",
            self.latex_accepted,
            self.latex_rate()
        )?;
        writeln!(f, "  Raster fallbacks: {}", self.raster_fallbacks)?;
        writeln!(f, "  Empty results: {}", self.empty_results)?;
        writeln!(f, "  Average time: {:.2} ms", self.average_time_ms)
    }
}

/// Thread-safe accumulator shared by concurrent invocations.
#[derive(Debug, Default)]
pub struct StatsManager {
    stats: Mutex<PipelineStats>,
}

impl StatsManager {
    pub fn new() -> Self {
        Self::default()
    }

    // Counters stay usable after a panic elsewhere poisoned the lock.
    fn lock(&self) -> MutexGuard<'_, PipelineStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a snapshot of the current statistics.
    pub fn get_stats(&self) -> PipelineStats {
        self.lock().clone()
    }

    /// Records one completed extraction.
    pub fn record(&self, extraction: &EquationExtraction, elapsed_ms: f64) {
        let mut stats = self.lock();
        let previous_total = stats.total_processed;
        stats.total_processed += 1;
        stats.average_time_ms = (stats.average_time_ms * previous_total as f64 + elapsed_ms)
            / stats.total_processed as f64;

        if extraction.enhanced {
            stats.enhanced += 1;
        }
        match extraction.engine {
            EngineTag::Latex => stats.latex_accepted += 1,
            EngineTag::RasterPrimary | EngineTag::RasterAlternate => stats.raster_fallbacks += 1,
        }
        if extraction.equation.is_empty() {
            stats.empty_results += 1;
        }
    }

    /// Records an image that could not be processed.
    pub fn record_failure(&self) {
        self.lock().failed += 1;
    }

    pub fn reset_stats(&self) {
        *self.lock() = PipelineStats::default();
    }
}
