//! Orchestration of the extraction stages.
//!
//! [`Preprocessor`] covers the image half of the pipeline and needs no
//! recognizers; [`MathPipeline`] adds arbitration, glyph stripping and
//! splitting on top of it. Batches go through a threshold-based choice between
//! sequential iteration and rayon.

use super::{EquationExtraction, PipelineConfig, PipelineStats, StatsManager};
use crate::core::config::ConfigValidator;
use crate::core::{OCRError, OcrResult};
use crate::processors::{
    AdaptiveEnhancer, ContourCropDeskewer, QualityAssessment, QualityClassifier,
};
use crate::recognition::{
    DisabledLatexRecognizer, LatexRecognizer, OcrArbiter, RasterOcrEngine,
};
use crate::text::{EquationQuestionSplitter, NoiseCorrector};
use crate::utils::{RawImage, downscale_to_max_dimension, dynamic_to_gray};
use image::{DynamicImage, GrayImage};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Strategy for processing several images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStrategy {
    /// Always process sequentially
    Sequential,
    /// Always process in parallel
    Parallel,
    /// Parallel when the batch is larger than the threshold
    Auto(usize),
}

impl ProcessingStrategy {
    /// Determine if parallel processing should be used for the given item count
    pub fn should_use_parallel(&self, item_count: usize) -> bool {
        match self {
            ProcessingStrategy::Sequential => false,
            ProcessingStrategy::Parallel => true,
            ProcessingStrategy::Auto(threshold) => item_count > *threshold,
        }
    }
}

/// An image after the classification branch.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    /// The image to recognize.
    pub image: GrayImage,
    pub assessment: QualityAssessment,
    /// Whether the enhancement chain ran.
    pub enhanced: bool,
    /// Whether enhancement fell back to adaptive thresholding.
    pub used_fallback: bool,
}

/// Grayscale conversion, downscaling, classification, enhancement and
/// deskewing.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    max_dimension: u32,
    classifier: QualityClassifier,
    enhancer: AdaptiveEnhancer,
    deskewer: ContourCropDeskewer,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl Preprocessor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            max_dimension: config.max_dimension,
            classifier: QualityClassifier::new(config.quality.clone(), config.max_dimension),
            enhancer: AdaptiveEnhancer::new(config.enhancer.clone()),
            deskewer: ContourCropDeskewer::new(config.deskew.clone()),
        }
    }

    /// Converts to grayscale and bounds the long side.
    pub fn prepare(&self, image: &DynamicImage) -> GrayImage {
        downscale_to_max_dimension(&dynamic_to_gray(image), self.max_dimension)
    }

    /// Scores the prepared image without transforming it.
    pub fn assess(&self, image: &GrayImage) -> QualityAssessment {
        self.classifier.classify(image)
    }

    /// Routes a prepared image down the clean or the enhancement path.
    pub fn preprocess(&self, image: &GrayImage) -> PreprocessedImage {
        let assessment = self.assess(image);
        if assessment.ocr_ready {
            debug!("image is OCR-ready, deskewing only");
            return PreprocessedImage {
                image: self.deskewer.deskew(image),
                assessment,
                enhanced: false,
                used_fallback: false,
            };
        }

        debug!("image needs enhancement");
        let enhanced = self.enhancer.enhance(image);
        PreprocessedImage {
            image: self.deskewer.crop_and_deskew(&enhanced.image),
            assessment,
            enhanced: true,
            used_fallback: enhanced.used_fallback,
        }
    }

    /// [`Self::prepare`] followed by [`Self::preprocess`].
    pub fn run(&self, image: &DynamicImage) -> PreprocessedImage {
        self.preprocess(&self.prepare(image))
    }
}

/// Builder for [`MathPipeline`].
///
/// # Examples
///
/// ```rust,no_run
/// use mathsnap::pipeline::{MathPipelineBuilder, PipelineConfig};
/// # use mathsnap::recognition::{LayoutMode, RasterOcrEngine};
/// # use std::sync::Arc;
/// # #[derive(Debug)]
/// # struct Engine;
/// # impl RasterOcrEngine for Engine {
/// #     fn recognize(&self, _: &image::DynamicImage, _: LayoutMode) -> mathsnap::core::OcrResult<String> {
/// #         Ok(String::new())
/// #     }
/// # }
///
/// let pipeline = MathPipelineBuilder::new(Arc::new(Engine))
///     .config(PipelineConfig::default())
///     .parallel_threshold(8)
///     .build()?;
/// let extraction = pipeline.process_path(std::path::Path::new("photo.jpg"))?;
/// println!("{}", extraction.query());
/// # Ok::<(), mathsnap::core::OCRError>(())
/// ```
#[derive(Debug)]
pub struct MathPipelineBuilder {
    raster: Arc<dyn RasterOcrEngine>,
    latex: Option<Arc<dyn LatexRecognizer>>,
    config: Option<PipelineConfig>,
    parallel_threshold: Option<usize>,
    max_dimension: Option<u32>,
}

impl MathPipelineBuilder {
    /// Starts a builder around the required raster engine.
    pub fn new(raster: Arc<dyn RasterOcrEngine>) -> Self {
        Self {
            raster,
            latex: None,
            config: None,
            parallel_threshold: None,
            max_dimension: None,
        }
    }

    /// Sets the LaTeX recognizer tried before the raster engine.
    ///
    /// Without one, every image goes straight to the raster engine.
    pub fn latex_recognizer(mut self, latex: Arc<dyn LatexRecognizer>) -> Self {
        self.latex = Some(latex);
        self
    }

    /// Sets every stage's configuration at once.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = Some(threshold);
        self
    }

    pub fn max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = Some(max_dimension);
        self
    }

    /// Validates the configuration and assembles the pipeline.
    pub fn build(self) -> OcrResult<MathPipeline> {
        let mut config = self.config.unwrap_or_default();
        if let Some(threshold) = self.parallel_threshold {
            config.parallel_threshold = threshold;
        }
        if let Some(max_dimension) = self.max_dimension {
            config.max_dimension = max_dimension;
        }
        config.validate()?;

        let latex = self
            .latex
            .unwrap_or_else(|| Arc::new(DisabledLatexRecognizer) as Arc<dyn LatexRecognizer>);
        let splitter = EquationQuestionSplitter::new(&config.splitter)?;

        info!(
            latex = latex.name(),
            raster = self.raster.name(),
            max_dimension = config.max_dimension,
            "building extraction pipeline"
        );

        Ok(MathPipeline {
            preprocessor: Preprocessor::new(&config),
            arbiter: OcrArbiter::new(latex, self.raster, config.arbiter.clone()),
            corrector: NoiseCorrector::new(),
            splitter,
            stats: StatsManager::new(),
            config,
        })
    }
}

/// The complete image-to-equation pipeline.
///
/// Invocations share nothing mutable apart from the statistics counters, so
/// one pipeline can serve many threads.
#[derive(Debug)]
pub struct MathPipeline {
    config: PipelineConfig,
    preprocessor: Preprocessor,
    arbiter: OcrArbiter,
    corrector: NoiseCorrector,
    splitter: EquationQuestionSplitter,
    stats: StatsManager,
}

impl MathPipeline {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats.get_stats()
    }

    pub fn reset_stats(&self) {
        self.stats.reset_stats();
    }

    /// Decodes and processes an encoded image.
    pub fn process(&self, raw: RawImage) -> OcrResult<EquationExtraction> {
        let image = raw.decode().inspect_err(|e| {
            warn!(error = %e, "failed to decode image");
            self.stats.record_failure();
        })?;
        Ok(self.process_image(&image))
    }

    /// Processes an encoded image held in memory.
    pub fn process_bytes(&self, bytes: &[u8]) -> OcrResult<EquationExtraction> {
        self.process(RawImage::new(bytes.to_vec()))
    }

    /// Reads and processes an image file.
    pub fn process_path(&self, path: &Path) -> OcrResult<EquationExtraction> {
        self.process(RawImage::from_path(path)?)
    }

    /// Processes an already decoded image. Never fails: recognizer problems
    /// surface as an empty equation.
    pub fn process_image(&self, image: &DynamicImage) -> EquationExtraction {
        let start = Instant::now();

        let pre = self.preprocessor.run(image);
        let recognized = self
            .arbiter
            .recognize(&DynamicImage::ImageLuma8(pre.image.clone()));
        let normalized = self.corrector.strip_glyphs(&recognized.text);
        let pair = self.splitter.split(&normalized);

        let extraction = EquationExtraction {
            equation: pair.equation,
            question: pair.question,
            raw_text: recognized.text,
            engine: recognized.engine,
            valid_math: recognized.valid_math,
            quality: pre.assessment.metrics,
            enhanced: pre.enhanced,
            image: pre.image,
        };

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.stats.record(&extraction, elapsed_ms);
        info!(
            engine = %extraction.engine,
            enhanced = extraction.enhanced,
            equation = %extraction.equation,
            question = %extraction.question,
            elapsed_ms,
            "extraction complete"
        );
        extraction
    }

    /// Processes several images, in parallel once the batch exceeds the
    /// configured threshold. Results keep input order; a failing item does
    /// not abort the others.
    pub fn process_batch(&self, images: Vec<RawImage>) -> Vec<OcrResult<EquationExtraction>> {
        let strategy = ProcessingStrategy::Auto(self.config.parallel_threshold);
        self.process_batch_with(images, strategy)
    }

    /// [`Self::process_batch`] with an explicit strategy.
    pub fn process_batch_with(
        &self,
        images: Vec<RawImage>,
        strategy: ProcessingStrategy,
    ) -> Vec<OcrResult<EquationExtraction>> {
        let total = images.len();
        let run = |(index, raw): (usize, RawImage)| {
            self.process(raw)
                .map_err(|e| OCRError::batch_item_error(index, total, e))
        };

        if strategy.should_use_parallel(total) {
            debug!("Using parallel processing for {} images", total);
            images.into_par_iter().enumerate().map(run).collect()
        } else {
            debug!("Using sequential processing for {} images", total);
            images.into_iter().enumerate().map(run).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::quality::tests::clean_scan;
    use crate::recognition::EngineTag;
    use crate::recognition::arbiter::tests::{FixedLatex, FixedRaster};
    use image::{ImageFormat, Luma};
    use std::io::Cursor;

    fn encode(image: &GrayImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(image.clone())
            .write_to(&mut buf, format)
            .unwrap();
        buf.into_inner()
    }

    /// Dim, low-contrast photo of a few strokes.
    fn dim_photo() -> GrayImage {
        GrayImage::from_fn(160, 90, |x, y| {
            let stroke = (40..50).contains(&y) && (20..140).contains(&x)
                || (20..70).contains(&y) && (75..82).contains(&x);
            let noise = ((x * 7 + y * 13) % 5) as u8;
            if stroke { Luma([70 + noise]) } else { Luma([95 + noise]) }
        })
    }

    fn pipeline(latex: FixedLatex, raster: FixedRaster) -> MathPipeline {
        MathPipelineBuilder::new(Arc::new(raster))
            .latex_recognizer(Arc::new(latex))
            .build()
            .unwrap()
    }

    #[test]
    fn test_strategy_threshold() {
        let auto = ProcessingStrategy::Auto(4);
        assert!(!auto.should_use_parallel(4));
        assert!(auto.should_use_parallel(5));
        assert!(!ProcessingStrategy::Sequential.should_use_parallel(100));
        assert!(ProcessingStrategy::Parallel.should_use_parallel(1));
    }

    #[test]
    fn test_clean_image_goes_through_latex() {
        let p = pipeline(
            FixedLatex::returning("3x-5=10"),
            FixedRaster::returning("unused", "unused"),
        );
        let out = p.process_bytes(&encode(&clean_scan(), ImageFormat::Png)).unwrap();
        assert_eq!(out.equation, "3x-5=10");
        assert_eq!(out.question, "");
        assert_eq!(out.engine, EngineTag::Latex);
        assert!(!out.enhanced);
        assert_eq!(out.image.dimensions(), (400, 200));
    }

    #[test]
    fn test_noisy_image_falls_back_to_raster() {
        let p = pipeline(
            FixedLatex::returning("@@"),
            FixedRaster::returning("4(2ns3)n=2", "unused"),
        );
        let out = p.process_bytes(&encode(&dim_photo(), ImageFormat::Png)).unwrap();
        assert_eq!(out.equation, "4(2ns3)n=2");
        assert!(out.equation.is_ascii());
        assert_eq!(out.engine, EngineTag::RasterPrimary);
        assert!(out.enhanced);
        assert!(out.valid_math);
    }

    #[test]
    fn test_question_is_split_off() {
        let p = pipeline(
            FixedLatex::returning("x² − 4 = 0, what is x"),
            FixedRaster::returning("unused", "unused"),
        );
        let out = p.process_image(&DynamicImage::ImageLuma8(dim_photo()));
        assert_eq!(out.raw_text, "x²−4=0,whatisx");
        assert_eq!(out.equation, "x^2-4=0");
        assert_eq!(out.question, "whatisx");
        assert_eq!(out.query(), "whatisx: x^2-4=0");
    }

    #[test]
    fn test_raster_question_words_survive_correction() {
        let image = DynamicImage::ImageLuma8(dim_photo());
        for (raster, equation, question) in [
            ("Solve 2x+3=0", "", "solve 2x+3=0"),
            ("2x+3=0 find x", "2x+3=0", "find x"),
            ("x^2-4=0 calculate roots", "x^2-4=0", "calculate roots"),
            ("S+l=Z, what is x", "5+1=2", "what is x"),
        ] {
            let p = pipeline(FixedLatex::returning(""), FixedRaster::returning(raster, "unused"));
            let out = p.process_image(&image);
            assert_eq!(out.engine, EngineTag::RasterPrimary, "{raster}");
            assert_eq!(out.equation, equation, "{raster}");
            assert_eq!(out.question, question, "{raster}");
        }
    }

    #[test]
    fn test_large_images_are_downscaled() {
        let big = GrayImage::from_fn(3000, 600, |x, _| Luma([if x % 50 < 5 { 30 } else { 200 }]));
        let prepared = Preprocessor::default().prepare(&DynamicImage::ImageLuma8(big));
        assert_eq!(prepared.dimensions(), (1500, 300));
    }

    #[test]
    fn test_large_noisy_image_is_enhanced_at_bounded_size() {
        // Two gray levels only: entropy is far below the readiness bound.
        let big = GrayImage::from_fn(3000, 600, |x, _| Luma([if x % 50 < 5 { 30 } else { 200 }]));
        let preprocessor = Preprocessor::default();
        let pre = preprocessor.run(&DynamicImage::ImageLuma8(big));
        assert!(!pre.assessment.ocr_ready);
        assert!(pre.enhanced);
        let (w, h) = pre.image.dimensions();
        assert!(w > 0 && w <= 1500, "width {w}");
        assert!(h > 0 && h <= 300, "height {h}");
    }

    #[test]
    fn test_nothing_recognized_is_not_an_error() {
        let p = pipeline(FixedLatex::returning(""), FixedRaster::returning("", ""));
        let out = p.process_image(&DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, Luma([255]))));
        assert!(out.is_empty());
        assert_eq!(p.stats().empty_results, 1);
    }

    #[test]
    fn test_decode_errors() {
        let p = pipeline(FixedLatex::returning(""), FixedRaster::returning("", ""));
        assert!(matches!(p.process_bytes(&[]), Err(OCRError::InvalidInput { .. })));
        assert!(matches!(
            p.process_bytes(b"definitely not an image"),
            Err(OCRError::ImageDecode(_))
        ));
        assert_eq!(p.stats().failed, 2);
    }

    #[test]
    fn test_batch_keeps_order_and_isolates_failures() {
        let p = MathPipelineBuilder::new(Arc::new(FixedRaster::returning("x+1=2", "")))
            .parallel_threshold(1)
            .build()
            .unwrap();
        let good = encode(&dim_photo(), ImageFormat::Png);
        let images = vec![
            RawImage::new(good.clone()),
            RawImage::new(b"broken".to_vec()),
            RawImage::new(good),
        ];
        let results = p.process_batch(images);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().equation, "x+1=2");
        let err = results[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("item 2/3"));
        assert!(results[2].is_ok());
        assert_eq!(p.stats().total_processed, 2);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        let result = MathPipelineBuilder::new(Arc::new(FixedRaster::default()))
            .max_dimension(0)
            .build();
        assert!(matches!(result, Err(OCRError::ConfigError { .. })));
    }
}
