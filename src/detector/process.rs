use anyhow::{Context, bail};
use image::ImageFormat;
use std::future::Future;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use super::Detector;
use crate::models::{DetectionOutput, RasterHandle};

/// Runs an external detection program.
///
/// The raster is written to a temporary PNG whose path is passed as the last
/// argument; the program prints a `DetectionOutput` JSON document on stdout.
/// The child is left running if the harness stops waiting for it.
#[derive(Debug, Clone)]
pub struct ProcessDetector {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessDetector {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl Detector for ProcessDetector {
    fn detect(
        &self,
        raster: RasterHandle,
    ) -> impl Future<Output = anyhow::Result<DetectionOutput>> + Send + 'static {
        let program = self.program.clone();
        let args = self.args.clone();

        async move {
            let input = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
                let file = tempfile::Builder::new()
                    .prefix("rectprobe-")
                    .suffix(".png")
                    .tempfile()?;
                raster
                    .to_rgba8()
                    .save_with_format(file.path(), ImageFormat::Png)
                    .context("Failed to write detector input")?;
                Ok(file)
            })
            .await??;

            debug!(program = %program.display(), input = %input.path().display(), "starting detector");

            let output = Command::new(&program)
                .args(&args)
                .arg(input.path())
                .output()
                .await
                .with_context(|| format!("Failed to start {}", program.display()))?;

            if !output.status.success() {
                bail!(
                    "{} exited with {}: {}",
                    program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }

            serde_json::from_slice(&output.stdout)
                .context("Detector output is not a valid detection result")
        }
    }

    fn name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("external")
    }
}
