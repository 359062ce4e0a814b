use clap::Parser;
use std::error::Error;
use std::path::PathBuf;

use needle_audit::annotate::annotate_detections;
use needle_audit::detect::{Detector, StrokeDetector, StrokeDetectorConfig};
use needle_audit::reconcile::{DEFAULT_CONFIDENCE_THRESHOLD, reconcile_detections};
use needle_audit::session::ScanRecord;

#[derive(Parser, Debug)]
#[command(
    name = "audit",
    about = "Count needle-like marks in a treatment site photo and reconcile against the expected total",
    version
)]
struct Cli {
    /// Path to the captured photo
    #[arg(short = 'i', long = "image")]
    image: PathBuf,

    /// Number of needles that were inserted
    #[arg(short = 'e', long = "expected")]
    expected: i64,

    /// Minimum confidence for a detection to be counted, in [0, 1]
    #[arg(short = 't', long = "threshold", default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    threshold: f32,

    /// Operator performing the scan
    #[arg(long = "operator", default_value = "unattended")]
    operator: String,

    /// Station or bed label
    #[arg(long = "station", default_value = "station 1")]
    station: String,

    /// Write the annotated photo to this path
    #[arg(short = 'a', long = "annotated-out")]
    annotated_out: Option<PathBuf>,

    /// Print the scan record as JSON on stdout
    #[arg(long = "record")]
    record: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Reject a bad threshold before touching any image.
    needle_audit::reconcile::filter_detections(&[], cli.threshold)?;

    let img = image::open(&cli.image)
        .map_err(|e| format!("failed to open {}: {e}", cli.image.display()))?;

    // One detector for the whole run; callers reuse it across scans.
    let detector = StrokeDetector::new(StrokeDetectorConfig::default());
    let detections = detector.detect(&img)?;
    log::info!(
        "{}: {} raw detection(s) from the {} detector",
        cli.image.display(),
        detections.len(),
        detector.name()
    );

    let (kept, result) = reconcile_detections(cli.expected, &detections, cli.threshold)?;
    log::info!(
        "{} detection(s) at or above threshold {}",
        kept.len(),
        cli.threshold
    );

    let record = ScanRecord::new(&cli.operator, &cli.station, &result);
    println!("{}", result.message);
    println!("{}", record.summary_line());
    if cli.record {
        println!("{}", record.to_json()?);
    }

    if let Some(out) = &cli.annotated_out {
        let annotated = annotate_detections(&img, &kept);
        annotated
            .save(out)
            .map_err(|e| format!("failed to save annotated photo {}: {e}", out.display()))?;
        log::info!("wrote annotated photo to {}", out.display());
    }

    Ok(())
}
