//! mathsnap command-line tool
//!
//! # Usage
//!
//! ```bash
//! mathsnap quality photo.jpg
//! mathsnap preprocess photo.jpg --output processed.png
//! mathsnap split "2x+3=0, what is x"
//! mathsnap --format json extract photo.jpg      # requires the `tesseract` feature
//! ```

mod cli;

use clap::{Parser, Subcommand, ValueEnum};
use mathsnap::pipeline::PipelineConfig;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "mathsnap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract equations and questions from photographed math", long_about = None)]
struct Cli {
    /// JSON pipeline configuration; omitted fields keep their defaults
    #[arg(long, global = true, env = "MATHSNAP_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Print quality metrics and the OCR-readiness decision
    Quality {
        /// Image to assess
        image: PathBuf,
    },
    /// Write the image the recognizers would see
    Preprocess {
        /// Image to process
        image: PathBuf,

        /// Destination PNG
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Noise-correct text and split it into equation and question
    Split {
        /// Recognized text
        text: String,
    },
    /// Run the full pipeline with Tesseract as the raster engine
    #[cfg(feature = "tesseract")]
    Extract {
        /// Images to process
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Tesseract language
        #[arg(long, default_value = "eng", env = "MATHSNAP_TESSERACT_LANG")]
        language: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    mathsnap::utils::init_tracing();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Quality { image } => cli::quality(&image, &config, cli.format)?,
        Commands::Preprocess { image, output } => {
            cli::preprocess(&image, &output, &config, cli.format)?
        }
        Commands::Split { text } => cli::split(&text, &config, cli.format)?,
        #[cfg(feature = "tesseract")]
        Commands::Extract { images, language } => {
            cli::extract(images, language, config, cli.format)?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_config_path_from_environment() {
        let cmd = Cli::command();
        let config = cmd
            .get_arguments()
            .find(|a| a.get_id() == "config")
            .unwrap();
        assert_eq!(config.get_env(), Some(std::ffi::OsStr::new("MATHSNAP_CONFIG")));
    }

    #[test]
    fn test_parse_split() {
        let cli = Cli::try_parse_from(["mathsnap", "--format", "json", "split", "x+1=2"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Split { ref text } if text == "x+1=2"));
    }
}
