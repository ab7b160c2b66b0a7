//! Subcommand implementations.

use crate::OutputFormat;
use mathsnap::pipeline::{PipelineConfig, Preprocessor};
use mathsnap::text::{EquationQuestionSplitter, NoiseCorrector};
use mathsnap::utils::{RawImage, encode_png};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::info;

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints quality metrics and the readiness decision.
pub fn quality(path: &Path, config: &PipelineConfig, format: OutputFormat) -> CliResult {
    let image = RawImage::from_path(path)?.decode()?;
    let preprocessor = Preprocessor::new(config);
    let assessment = preprocessor.assess(&preprocessor.prepare(&image));

    match format {
        OutputFormat::Json => print_json(&assessment)?,
        OutputFormat::Pretty => {
            let m = &assessment.metrics;
            println!("File: {}", path.display());
            println!("  Entropy:        {:.3} bits", m.entropy);
            println!("  Contrast:       {:.4}", m.contrast);
            println!("  Brightness:     {:.1}", m.brightness);
            println!("  Stroke density: {:.4}", m.stroke_density);
            println!("  Black fraction: {:.4}", m.black_fraction);
            println!("  White fraction: {:.4}", m.white_fraction);
            println!(
                "  Decision:       {}",
                if assessment.ocr_ready { "OCR-ready" } else { "needs enhancement" }
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct PreprocessReport<'a> {
    output: &'a Path,
    width: u32,
    height: u32,
    enhanced: bool,
    used_fallback: bool,
}

/// Writes the processed image as PNG.
pub fn preprocess(
    path: &Path,
    output: &Path,
    config: &PipelineConfig,
    format: OutputFormat,
) -> CliResult {
    let start = Instant::now();
    let image = RawImage::from_path(path)?.decode()?;
    let pre = Preprocessor::new(config).run(&image);
    std::fs::write(output, encode_png(&pre.image)?)?;
    info!(
        "Preprocessed {} in {:.2}ms",
        path.display(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    let report = PreprocessReport {
        output,
        width: pre.image.width(),
        height: pre.image.height(),
        enhanced: pre.enhanced,
        used_fallback: pre.used_fallback,
    };
    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Pretty => println!(
            "Wrote {} ({}x{}, {})",
            output.display(),
            report.width,
            report.height,
            if report.enhanced { "enhanced" } else { "clean" }
        ),
    }
    Ok(())
}

/// Noise-corrects and splits a piece of text.
pub fn split(text: &str, config: &PipelineConfig, format: OutputFormat) -> CliResult {
    let corrected = NoiseCorrector::new().correct(text);
    let pair = EquationQuestionSplitter::new(&config.splitter)?.split(&corrected);

    match format {
        OutputFormat::Json => print_json(&pair)?,
        OutputFormat::Pretty => {
            println!("Equation: {}", pair.equation);
            if !pair.question.is_empty() {
                println!("Question: {}", pair.question);
            }
        }
    }
    Ok(())
}

/// Runs the full pipeline over every image.
#[cfg(feature = "tesseract")]
pub fn extract(
    paths: Vec<std::path::PathBuf>,
    language: String,
    config: PipelineConfig,
    format: OutputFormat,
) -> CliResult {
    use mathsnap::pipeline::MathPipelineBuilder;
    use mathsnap::recognition::{TesseractConfig, TesseractEngine};
    use std::sync::Arc;

    let engine = TesseractEngine::new(TesseractConfig {
        language,
        ..Default::default()
    })?;
    let pipeline = MathPipelineBuilder::new(Arc::new(engine)).config(config).build()?;

    let raws = paths
        .iter()
        .map(|p| RawImage::from_path(p))
        .collect::<Result<Vec<_>, _>>()?;
    let results = pipeline.process_batch(raws);

    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(extraction) => match format {
                OutputFormat::Json => print_json(&extraction)?,
                OutputFormat::Pretty => {
                    println!("File: {}", path.display());
                    print!("{}", extraction);
                    println!("Query: {}", extraction.query());
                }
            },
            Err(e) => eprintln!("{}: {}", path.display(), e),
        }
    }
    info!("{}", pipeline.stats());
    Ok(())
}
