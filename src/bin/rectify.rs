//! Blind geometric distortion correction.
//!
//! # Usage
//! ```bash
//! rectify --input distorted.jpg --output out/corrected.jpg --model-dir models
//! ```
//!
//! The model directory must contain `model_en.pkl`, `model_de.pkl` and
//! `model_class.pkl` (names can be overridden with `--config`).

use blind_rectify::core::ComputeTarget;
use blind_rectify::pipeline::{CorrectorConfig, DistortionCorrector};
use blind_rectify::utils::init_tracing;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Command-line arguments for the correction tool
#[derive(Parser)]
#[command(name = "rectify")]
#[command(about = "Blind Geometric Distortion Correction")]
struct Args {
    /// Path to input JPG image
    #[arg(short, long)]
    input: PathBuf,

    /// Path to output JPG image
    #[arg(short, long)]
    output: PathBuf,

    /// Directory containing the encoder, decoder and classifier artifacts
    #[arg(short, long)]
    model_dir: PathBuf,

    /// Device to run inference on (cpu, cuda, cuda:N, auto)
    #[arg(short, long, default_value = "cpu")]
    device: String,

    /// Optional JSON file with corrector settings
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<CorrectorConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(CorrectorConfig::default()),
    }
}

fn run(args: &Args) -> Result<bool, Box<dyn std::error::Error>> {
    if !args.input.exists() {
        error!("Input file {} does not exist", args.input.display());
        return Ok(false);
    }
    let is_jpeg = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
    if !is_jpeg {
        warn!("Input file should be a JPG image");
    }

    if !args.model_dir.is_dir() {
        error!("Model directory {} does not exist", args.model_dir.display());
        return Ok(false);
    }

    let target: ComputeTarget = args.device.parse()?;
    let config = load_config(args.config.as_deref())?.with_target(target);

    let missing: Vec<&str> = [
        &config.files.encoder,
        &config.files.decoder,
        &config.files.classifier,
    ]
    .into_iter()
    .filter(|f| !args.model_dir.join(f).exists())
    .map(String::as_str)
    .collect();
    if !missing.is_empty() {
        error!("Missing model files: {:?}", missing);
        return Ok(false);
    }

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    info!("Using device: {}", target);
    let corrector = DistortionCorrector::new(&args.model_dir, config)?;
    Ok(corrector.correct_distortion(&args.input, &args.output).is_some())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
