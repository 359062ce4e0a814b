use clap::Parser;
use std::error::Error;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use needle_audit::annotate::annotate_detections;
use needle_audit::detect::{Detector, StrokeDetector, StrokeDetectorConfig};
use needle_audit::reconcile::{AlertState, DEFAULT_CONFIDENCE_THRESHOLD, reconcile_detections};

#[derive(Parser, Debug)]
#[command(
    name = "audit_batch",
    about = "Run the needle count audit over every photo in a directory",
    version
)]
struct Cli {
    /// Directory containing captured photos
    #[arg(short = 'd', long = "dir")]
    dir: PathBuf,

    /// Number of needles expected in every photo
    #[arg(short = 'e', long = "expected")]
    expected: i64,

    /// Minimum confidence for a detection to be counted, in [0, 1]
    #[arg(short = 't', long = "threshold", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    threshold: f32,

    /// Write audit_{i}_annotated.png next to the current directory
    #[arg(short = 'a', long = "annotate")]
    annotate: bool,
}

fn is_image_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(OsStr::to_str) else {
        return false;
    };
    matches!(
        ext.to_ascii_lowercase().as_str(),
        "png" | "jpg" | "jpeg" | "bmp" | "gif" | "tif" | "tiff" | "webp"
    )
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Reject a bad threshold before touching any image.
    needle_audit::reconcile::filter_detections(&[], cli.threshold)?;

    if !cli.dir.is_dir() {
        return Err(format!("Not a directory: {}", cli.dir.display()).into());
    }

    let mut images: Vec<PathBuf> = fs::read_dir(&cli.dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();

    images.sort();

    if images.is_empty() {
        eprintln!("No images found in {}", cli.dir.display());
        return Ok(());
    }

    let detector = StrokeDetector::new(StrokeDetectorConfig::default());

    let mut matched = 0usize;
    let mut deficient = 0usize;
    let mut surplus = 0usize;

    for (i, image_path) in images.iter().enumerate() {
        let img = match image::open(image_path) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Failed to open {}: {e}", image_path.display());
                continue;
            }
        };

        let detections = match detector.detect(&img) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("Detection failed for {}: {e}", image_path.display());
                continue;
            }
        };

        let (kept, result) = reconcile_detections(cli.expected, &detections, cli.threshold)?;

        match result.state {
            AlertState::Matched => matched += 1,
            AlertState::Deficient => deficient += 1,
            AlertState::Surplus => surplus += 1,
        }
        println!(
            "{}: {} [{}]",
            image_path.display(),
            result.message,
            result.state
        );

        if cli.annotate {
            let out = PathBuf::from(format!("audit_{i}_annotated.png"));
            let annotated = annotate_detections(&img, &kept);
            if let Err(e) = annotated.save(&out) {
                eprintln!(
                    "Failed to save {} for {}: {e}",
                    out.display(),
                    image_path.display()
                );
            }
        }
    }

    println!("matched: {matched} | deficient: {deficient} | surplus: {surplus}");

    Ok(())
}
