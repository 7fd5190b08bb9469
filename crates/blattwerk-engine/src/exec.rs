// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transform execution. One function per job, dispatched on the params
// variant. PDF work is CPU-bound and runs on the blocking pool; office
// conversion shells out to the configured converter binary.

use std::collections::HashMap;

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{CompressMode, CompressionReport, Job, JobParams};
use blattwerk_document::compress::{CompressOptions, compress_pdf};
use blattwerk_document::diff::diff_documents;
use blattwerk_document::pdf::{PdfFile, assemble, text};
use blattwerk_document::search::search_target_size;
use tracing::{info, instrument};

use crate::naming;
use crate::service::EngineCtx;

/// Result of one executed transform, ready to be persisted.
pub(crate) struct TransformOutput {
    /// Files to write into the job directory, `(storage name, bytes)`.
    pub files: Vec<(String, Vec<u8>)>,
    /// Storage name of the file served on fetch.
    pub primary_ref: String,
    /// Download filename presented to the caller.
    pub download_name: String,
    /// Structured auxiliary data attached to the job record.
    pub report: Option<serde_json::Value>,
}

impl TransformOutput {
    fn single(primary_ref: String, download_name: String, bytes: Vec<u8>) -> Self {
        Self {
            files: vec![(primary_ref.clone(), bytes)],
            primary_ref,
            download_name,
            report: None,
        }
    }
}

/// Execute one claimed job against its stored inputs.
#[instrument(skip_all, fields(job_id = %job.id, kind = %job.kind()))]
pub(crate) async fn execute(job: &Job, ctx: &EngineCtx) -> Result<TransformOutput> {
    let mut inputs = Vec::with_capacity(job.input_refs.len());
    for name in &job.input_refs {
        inputs.push(ctx.storage.read(job.id, name).await?);
    }

    let first_name = job.input_names.first().cloned().unwrap_or_default();
    let download = naming::download_name(&job.params, &first_name);
    let primary = naming::output_ref(&job.params);

    match job.params.clone() {
        JobParams::Merge => {
            let bytes = run_blocking(move || {
                let files = load_all(&inputs)?;
                assemble::merge(&files)
            })
            .await?;
            Ok(TransformOutput::single(primary, download, bytes))
        }
        JobParams::Rotate { pages, angle } => {
            let input = take_one(inputs)?;
            let bytes = run_blocking(move || {
                assemble::rotate(&PdfFile::from_bytes(&input)?, &pages, angle)
            })
            .await?;
            Ok(TransformOutput::single(primary, download, bytes))
        }
        JobParams::Delete { pages } => {
            let input = take_one(inputs)?;
            let bytes = run_blocking(move || {
                assemble::delete(&PdfFile::from_bytes(&input)?, &pages)
            })
            .await?;
            Ok(TransformOutput::single(primary, download, bytes))
        }
        JobParams::Extract { pages } => {
            let input = take_one(inputs)?;
            let bytes = run_blocking(move || {
                assemble::extract(&PdfFile::from_bytes(&input)?, &pages)
            })
            .await?;
            Ok(TransformOutput::single(primary, download, bytes))
        }
        JobParams::Reorder { order } => {
            let input = take_one(inputs)?;
            let bytes = run_blocking(move || {
                assemble::reorder(&PdfFile::from_bytes(&input)?, &order)
            })
            .await?;
            Ok(TransformOutput::single(primary, download, bytes))
        }
        JobParams::PdfToText { format } => {
            let input = take_one(inputs)?;
            let bytes = run_blocking(move || {
                let file = PdfFile::from_bytes(&input)?;
                let pages = text::page_texts(&file)?;
                Ok(text::render_text(&pages, format).into_bytes())
            })
            .await?;
            Ok(TransformOutput::single(primary, download, bytes))
        }
        JobParams::Compress { mode, grayscale } => {
            compress(ctx, take_one(inputs)?, mode, grayscale, primary, download).await
        }
        JobParams::Compare => {
            let (left, right) = take_two(inputs)?;
            let report = run_blocking(move || {
                diff_documents(&PdfFile::from_bytes(&left)?, &PdfFile::from_bytes(&right)?)
            })
            .await?;
            info!(changes = report.total, "comparison finished");

            let bytes = serde_json::to_vec_pretty(&report)?;
            let mut output = TransformOutput::single(primary, download, bytes);
            output.report = Some(serde_json::to_value(&report)?);
            Ok(output)
        }
        JobParams::OfficeToPdf => {
            let bytes = convert_office(job, ctx).await?;
            Ok(TransformOutput::single(primary, download, bytes))
        }
    }
}

// -- Compression --------------------------------------------------------------

async fn compress(
    ctx: &EngineCtx,
    input: Vec<u8>,
    mode: CompressMode,
    grayscale: bool,
    primary: String,
    download: String,
) -> Result<TransformOutput> {
    let (bytes, report) = match mode {
        CompressMode::Quality { level } => {
            let options = CompressOptions { level, grayscale };
            let bytes = run_blocking(move || compress_pdf(&input, &options)).await?;
            let report = CompressionReport {
                level,
                output_bytes: bytes.len() as u64,
                target_bytes: None,
                attempts: 1,
                warning: None,
            };
            (bytes, report)
        }
        CompressMode::FileSize { desired_size, unit } => {
            let target = unit.to_bytes(desired_size);
            let tolerance = ctx.config.compress_tolerance;
            let budget = ctx.config.compress_attempt_budget;

            let (outcome, bytes) = run_blocking(move || {
                let mut candidates: HashMap<u8, Vec<u8>> = HashMap::new();
                let outcome = search_target_size(target, tolerance, budget, |level| {
                    let out = compress_pdf(&input, &CompressOptions { level, grayscale })?;
                    let size = out.len() as u64;
                    candidates.insert(level, out);
                    Ok(size)
                })?;
                let bytes = candidates.remove(&outcome.level).ok_or_else(|| {
                    BlattwerkError::Transform(
                        "size search selected a level it never probed".to_string(),
                    )
                })?;
                Ok((outcome, bytes))
            })
            .await?;

            let warning = (!outcome.within_target).then(|| {
                format!(
                    "target of {} bytes was not reachable; kept the smallest achievable output ({} bytes at level {})",
                    target, outcome.size_bytes, outcome.level
                )
            });
            let report = CompressionReport {
                level: outcome.level,
                output_bytes: outcome.size_bytes,
                target_bytes: Some(target),
                attempts: outcome.attempts.len(),
                warning,
            };
            (bytes, report)
        }
    };

    info!(
        level = report.level,
        output_bytes = report.output_bytes,
        attempts = report.attempts,
        "compression finished"
    );
    let mut output = TransformOutput::single(primary, download, bytes);
    output.report = Some(serde_json::to_value(&report)?);
    Ok(output)
}

// -- Office conversion --------------------------------------------------------

/// Convert an office document via the external converter binary. An
/// unlaunchable converter is a dependency failure; a converter that runs
/// and fails is a transform failure.
async fn convert_office(job: &Job, ctx: &EngineCtx) -> Result<Vec<u8>> {
    let converter = &ctx.config.office_converter;
    let dir = ctx.storage.job_dir(job.id);
    let input_ref = job
        .input_refs
        .first()
        .ok_or_else(|| BlattwerkError::Transform("job has no stored inputs".to_string()))?;
    let input_path = ctx.storage.path_of(job.id, input_ref);

    let produced_name = match input_ref.rsplit_once('.') {
        Some((stem, _)) => format!("{}.pdf", stem),
        None => format!("{}.pdf", input_ref),
    };
    let produced = dir.join(&produced_name);

    // kill_on_drop: when the transform timeout cancels this future, the
    // converter must not keep running and write into the job directory
    // after the job has already failed.
    let output = tokio::process::Command::new(converter)
        .arg("--headless")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(&dir)
        .arg(&input_path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|err| {
            BlattwerkError::Dependency(format!(
                "office converter '{}' is unavailable: {}",
                converter, err
            ))
        })?;

    if !output.status.success() {
        // The converter may have written a partial PDF before failing.
        let _ = tokio::fs::remove_file(&produced).await;
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BlattwerkError::Transform(format!(
            "office conversion failed: {}",
            stderr.trim()
        )));
    }
    let bytes = tokio::fs::read(&produced).await.map_err(|_| {
        BlattwerkError::Transform("office converter reported success but produced no PDF".to_string())
    })?;
    let _ = tokio::fs::remove_file(&produced).await;
    Ok(bytes)
}

// -- Helpers ------------------------------------------------------------------

async fn run_blocking<T>(f: impl FnOnce() -> Result<T> + Send + 'static) -> Result<T>
where
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| BlattwerkError::Transform(format!("transform task aborted: {}", err)))?
}

fn load_all(inputs: &[Vec<u8>]) -> Result<Vec<PdfFile>> {
    inputs.iter().map(|bytes| PdfFile::from_bytes(bytes)).collect()
}

fn take_one(mut inputs: Vec<Vec<u8>>) -> Result<Vec<u8>> {
    inputs
        .pop()
        .ok_or_else(|| BlattwerkError::Transform("job has no stored inputs".to_string()))
}

fn take_two(mut inputs: Vec<Vec<u8>>) -> Result<(Vec<u8>, Vec<u8>)> {
    let second = inputs
        .pop()
        .ok_or_else(|| BlattwerkError::Transform("job has fewer than two inputs".to_string()))?;
    let first = inputs
        .pop()
        .ok_or_else(|| BlattwerkError::Transform("job has fewer than two inputs".to_string()))?;
    Ok((first, second))
}
