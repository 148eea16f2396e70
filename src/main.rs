use anyhow::{Context, bail};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use rectprobe::overlay::render_overlay;
use rectprobe::{DetectionOrchestrator, HarnessConfig, ImageFile, ProcessDetector, RunOutcome};

#[derive(Parser)]
#[command(name = "rectprobe")]
#[command(about = "Run a rectangle detector against an image and inspect the candidates")]
struct Cli {
    /// Path to input image file
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Detector program; receives the image path as its last argument and
    /// prints detection JSON on stdout
    #[arg(long, value_name = "PROGRAM")]
    detector: PathBuf,

    /// Extra argument passed to the detector before the image path
    #[arg(long = "detector-arg", value_name = "ARG", allow_hyphen_values = true)]
    detector_args: Vec<String>,

    /// Give up on the detector after this many milliseconds
    #[arg(long, value_name = "MS", default_value_t = 30_000)]
    timeout_ms: u64,

    /// Invoke the detector immediately instead of after the short start delay
    #[arg(long)]
    no_start_delay: bool,

    /// Select a rectangle (1-based) and compare it to the standard card ratio
    #[arg(long, value_name = "N")]
    select: Option<usize>,

    /// Save the rectangles drawn over the image to this PNG
    #[arg(long, value_name = "PATH")]
    overlay: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_filter = if args.verbose { "rectprobe=debug" } else { "rectprobe=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();

    let mut config = HarnessConfig::default().with_timeout(Duration::from_millis(args.timeout_ms));
    if args.no_start_delay {
        config = config.with_start_delay(Duration::ZERO);
    }

    let detector = ProcessDetector::new(&args.detector).with_args(args.detector_args.clone());
    let session = DetectionOrchestrator::new(detector, config);

    let file = ImageFile::from_path(&args.image_path).await?;
    session
        .load(file)
        .await
        .with_context(|| format!("Failed to load {}", args.image_path.display()))?;

    match session.run().await? {
        RunOutcome::Completed { .. } => {}
        RunOutcome::Failed(reason) => bail!(reason),
        RunOutcome::Discarded => bail!("detection run was discarded"),
    }

    let rectangles = session.rectangles();
    println!("\n=== Rectangle Detection Results ===");
    println!("Total candidates: {}", rectangles.len());
    println!(
        "Processing steps: {}",
        session.debug_info().processing_steps.len()
    );

    if rectangles.is_empty() {
        println!("No rectangles detected.");
    } else {
        println!("\nCandidates:");
        for (i, rect) in rectangles.iter().enumerate() {
            println!(
                "  {:>2}. at ({}, {}) size {}x{} - confidence: {:.2}, ratio: {:.3}",
                i + 1,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                rect.confidence,
                rect.aspect_ratio
            );
        }
    }

    if args.verbose {
        for (i, step) in session.debug_info().processing_steps.iter().enumerate() {
            println!("  step {:02}: {}", i + 1, step.payload);
        }
    }

    if let Some(n) = args.select {
        let Some(rect) = n.checked_sub(1).and_then(|i| rectangles.get(i)) else {
            bail!("--select {n} is out of range (1..={})", rectangles.len());
        };
        session.select(rect);
        if let Some(cmp) = session.compare_selection() {
            println!("\nSelected rectangle {n}:");
            println!("  ratio:      {:.4}", rect.aspect_ratio);
            println!("  target:     {:.4}", cmp.target);
            println!("  difference: {:.4}", cmp.difference);
            println!(
                "  match:      {}",
                if cmp.good_match { "card-like" } else { "not card-like" }
            );
        }
    }

    if let Some(path) = &args.overlay {
        let image = session.image().context("No image loaded")?;
        let selection = session.selection();
        let canvas = render_overlay(&image.raster, &rectangles, selection.as_ref());
        canvas
            .save(path)
            .with_context(|| format!("Failed to save overlay to {}", path.display()))?;
        println!("\nOverlay saved to {}", path.display());
    }

    Ok(())
}
