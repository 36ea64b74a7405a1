//! Batch driver: collect images, run the engine on each, print one line per image.

use crate::color_utils::{progress::create_batch_progress_bar, symbols};
use crate::config::ClassifyConfig;
use crate::decision::{ClassificationResult, DecisionEngine};
use crate::image_input::{collect_images_from_sources, ImageInputConfig};
use crate::labels::LabelSet;
use crate::multi_view::ForwardPass;
use crate::onnx_session::OnnxForwardPass;
use crate::pixel_buffer::PixelBuffer;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// One `--json` output line.
#[derive(Debug, Serialize)]
pub struct ImageReport<'a> {
    pub path: String,
    #[serde(flatten)]
    pub result: &'a ClassificationResult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub detected: usize,
    pub failed: usize,
}

fn classify_one<F: ForwardPass + ?Sized>(
    engine: &DecisionEngine,
    forward: &mut F,
    image_path: &Path,
) -> Result<ClassificationResult> {
    let buffer = PixelBuffer::open(image_path)?;
    let result = engine
        .classify(&buffer, forward)
        .with_context(|| format!("Failed to classify {}", image_path.display()))?;
    Ok(result)
}

pub fn write_result(
    out: &mut impl Write,
    image_path: &Path,
    result: &ClassificationResult,
    json: bool,
) -> Result<()> {
    if json {
        let report = ImageReport {
            path: image_path.display().to_string(),
            result,
        };
        writeln!(out, "{}", serde_json::to_string(&report)?)?;
    } else {
        writeln!(out, "{}: {}", image_path.display(), result.label)?;
    }
    Ok(())
}

/// Classify every image in order.
///
/// In strict mode the first failing image aborts the batch; otherwise the
/// failure is logged and counted.
pub fn classify_images<F: ForwardPass + ?Sized>(
    engine: &DecisionEngine,
    forward: &mut F,
    image_files: &[PathBuf],
    strict: bool,
    json: bool,
    out: &mut impl Write,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();
    let progress_bar = create_batch_progress_bar(image_files.len());

    for (index, image_path) in image_files.iter().enumerate() {
        let start = Instant::now();
        match classify_one(engine, forward, image_path) {
            Ok(result) => {
                summary.processed += 1;
                if result.label.is_detected() {
                    summary.detected += 1;
                }
                write_result(out, image_path, &result, json)?;
                log::info!(
                    "{} Classified {} ({}/{}) in {:.1}ms",
                    symbols::completed_successfully(),
                    image_path.display(),
                    index + 1,
                    image_files.len(),
                    start.elapsed().as_secs_f64() * 1000.0
                );
            }
            Err(e) => {
                summary.failed += 1;
                if strict {
                    if let Some(pb) = &progress_bar {
                        pb.finish_and_clear();
                    }
                    return Err(e);
                }
                log::warn!(
                    "{}Failed to process {} ({}/{}): {e:#}",
                    symbols::warning(),
                    image_path.display(),
                    index + 1,
                    image_files.len()
                );
            }
        }
        if let Some(pb) = &progress_bar {
            pb.set_message(format!("{} detected", summary.detected));
            pb.inc(1);
        }
    }

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }
    Ok(summary)
}

/// Entry point for the `classify` subcommand; returns the number of images classified.
pub fn run_classification(config: ClassifyConfig) -> Result<usize> {
    let framework_start = Instant::now();

    let image_config = ImageInputConfig::from_strict_flag(config.strict);
    let image_files = collect_images_from_sources(&config.sources, &image_config)?;
    if image_files.is_empty() {
        log::warn!("No valid images found to process");
        return Ok(0);
    }
    log::info!(
        "{} Found {} image(s) to process",
        symbols::resources_found(),
        image_files.len()
    );

    let labels = LabelSet::load(&config.labels_path)?;
    log::debug!(
        "Loaded {} labels from {}",
        labels.len(),
        config.labels_path.display()
    );
    let engine = DecisionEngine::new(labels, config.engine.clone())?;

    let session_start = Instant::now();
    let (mut forward, model_info) = OnnxForwardPass::load(&config.model_path, &config.device)?;
    log::info!(
        "{} Model ready in {:.1}ms ({})",
        symbols::model_loaded(),
        session_start.elapsed().as_secs_f64() * 1000.0,
        model_info.execution_providers.join(", ")
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let summary = classify_images(
        &engine,
        &mut forward,
        &image_files,
        config.strict,
        config.json,
        &mut out,
    )?;

    let total_time = framework_start.elapsed();
    if summary.processed > 0 {
        log::info!(
            "{} Classified {} images in {:.1}s ({} burn detected)",
            symbols::completed_successfully(),
            summary.processed,
            total_time.as_secs_f64(),
            summary.detected
        );
    }
    if summary.failed > 0 {
        log::warn!(
            "{}{} of {} images failed to process",
            symbols::completed_partially_successfully(),
            summary.failed,
            image_files.len()
        );
    }

    Ok(summary.processed)
}
