//! Geometric distortion type detection.
//!
//! # Usage
//! ```bash
//! detect_distortion --image photo.jpg --probabilities --estimate-params
//! detect_distortion --batch a.jpg b.jpg c.jpg --model-dir geoProjModels
//! ```

use blind_rectify::core::ComputeTarget;
use blind_rectify::detector::{DetectionResult, DetectorConfig, DistortionDetector};
use blind_rectify::utils::init_tracing;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

/// Command-line arguments for the detection tool
#[derive(Parser)]
#[command(name = "detect_distortion")]
#[command(about = "Detect geometric distortion in images")]
struct Args {
    /// Path to input image
    #[arg(long, required_unless_present = "batch")]
    image: Option<PathBuf>,

    /// Multiple image paths for batch processing
    #[arg(long, num_args = 1..)]
    batch: Option<Vec<PathBuf>>,

    /// Directory containing the detector models
    #[arg(long, default_value = "geoProjModels")]
    model_dir: PathBuf,

    /// Show probability distribution for all distortion types
    #[arg(long)]
    probabilities: bool,

    /// Estimate distortion parameters
    #[arg(long)]
    estimate_params: bool,

    /// Device to use for inference (auto, cuda, cpu)
    #[arg(long, default_value = "auto")]
    device: String,

    /// Print results as JSON lines
    #[arg(long)]
    json: bool,

    /// Optional JSON file with detector settings
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<DetectorConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(DetectorConfig::default()),
    }
}

fn report(
    detector: &DistortionDetector,
    args: &Args,
    image_path: &Path,
    result: &DetectionResult,
) -> Result<(), Box<dyn std::error::Error>> {
    let parameter = if args.estimate_params {
        Some(detector.estimate_parameters(image_path, result.distortion_type)?)
    } else {
        None
    };

    if args.json {
        let mut value = serde_json::to_value(result)?;
        value["image_path"] = serde_json::json!(image_path);
        if let Some(p) = parameter {
            value["estimated_parameter"] = serde_json::json!(p);
        }
        println!("{value}");
        return Ok(());
    }

    println!("Image: {}", image_path.display());
    println!("Detected distortion: {}", result.distortion_type);
    println!("Confidence: {:.4}", result.confidence);
    if let Some(probabilities) = &result.all_probabilities {
        println!("All probabilities:");
        for (distortion_type, p) in probabilities {
            println!("  {distortion_type}: {p:.4}");
        }
    }
    if let Some(p) = parameter {
        println!("Estimated parameter: {p:.6}");
    }
    Ok(())
}

fn run(args: &Args) -> Result<bool, Box<dyn std::error::Error>> {
    let target: ComputeTarget = args.device.parse()?;
    let config = load_config(args.config.as_deref())?.with_target(target);
    let detector = DistortionDetector::from_dir(&args.model_dir, &config)?;
    info!("Using device: {}", target.resolve());

    let mut all_ok = true;
    match (&args.batch, &args.image) {
        (Some(paths), _) => {
            for entry in detector.batch_detect(paths, args.probabilities) {
                match &entry.outcome {
                    Ok(result) => {
                        if let Err(e) = report(&detector, args, &entry.image_path, result) {
                            error!("Error processing {}: {}", entry.image_path.display(), e);
                            all_ok = false;
                        }
                    }
                    Err(e) => {
                        error!("Error processing {}: {}", entry.image_path.display(), e.chain());
                        all_ok = false;
                    }
                }
                if !args.json {
                    println!("{}", "-".repeat(30));
                }
            }
        }
        (None, Some(image)) => {
            match detector
                .detect_distortion(image, args.probabilities)
                .map_err(Box::<dyn std::error::Error>::from)
                .and_then(|result| report(&detector, args, image, &result))
            {
                Ok(()) => {}
                Err(e) => {
                    error!("Error processing image: {}", e);
                    all_ok = false;
                }
            }
        }
        (None, None) => return Err("either --image or --batch is required".into()),
    }
    Ok(all_ok)
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
