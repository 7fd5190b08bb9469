// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Submission validation. Everything here runs before a job record exists,
// so a rejected submission leaves no trace. Checks are ordered cheapest
// first: arity, then per-file name/type/size, then parameter shape, then
// the PDF-level constraints that require parsing the bytes.

use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{CompressMode, JobParams, MediaKind};
use blattwerk_document::pdf::PdfFile;
use blattwerk_document::pdf::info::inspect;
use tracing::debug;

use crate::naming;
use crate::registry::TransformSpec;

/// One uploaded file as received from the embedding adapter.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    /// Claimed content type, when the transport provides one.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Validate a full submission against the transform's registered spec.
pub fn validate_submission(
    spec: &TransformSpec,
    params: &JobParams,
    uploads: &[Upload],
    config: &EngineConfig,
) -> Result<()> {
    if !spec.arity.accepts(uploads.len()) {
        return Err(BlattwerkError::Validation(format!(
            "{} requires {}, got {}",
            spec.kind,
            spec.arity.describe(),
            uploads.len()
        )));
    }

    for upload in uploads {
        validate_upload(upload, spec.media, config.max_upload_bytes)?;
    }

    validate_params(params)?;

    if spec.media == MediaKind::Pdf {
        for upload in uploads {
            validate_pdf_constraints(upload, config.max_pages)?;
        }
        validate_page_references(params, uploads)?;
    }

    debug!(operation = %spec.kind, files = uploads.len(), "submission validated");
    Ok(())
}

pub(crate) fn validate_upload(upload: &Upload, media: MediaKind, max_bytes: u64) -> Result<()> {
    if upload.data.is_empty() {
        return Err(BlattwerkError::Validation(format!(
            "'{}' is empty",
            upload.filename
        )));
    }
    if upload.data.len() as u64 > max_bytes {
        return Err(BlattwerkError::Validation(format!(
            "'{}' is {} bytes, exceeding the {} byte limit",
            upload.filename,
            upload.data.len(),
            max_bytes
        )));
    }

    let extension = naming::extension(&upload.filename).ok_or_else(|| {
        BlattwerkError::Validation(format!("'{}' has no file extension", upload.filename))
    })?;
    if !media.extensions().contains(&extension.as_str()) {
        return Err(BlattwerkError::Validation(format!(
            "'{}' is not a {} (accepted: {})",
            upload.filename,
            media.label(),
            media.extensions().join(", ")
        )));
    }

    if let Some(content_type) = &upload.content_type {
        let claimed = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim()
            .to_ascii_lowercase();
        if !media.content_types().contains(&claimed.as_str()) {
            return Err(BlattwerkError::Validation(format!(
                "'{}' has unsupported content type '{}'",
                upload.filename, claimed
            )));
        }
    }
    Ok(())
}

/// Structural checks on caller-supplied options.
fn validate_params(params: &JobParams) -> Result<()> {
    match params {
        JobParams::Rotate { pages, angle } => {
            require_pages(pages, "pages")?;
            if *angle == 0 || angle % 90 != 0 {
                return Err(BlattwerkError::Validation(format!(
                    "rotation angle must be a non-zero multiple of 90, got {}",
                    angle
                )));
            }
        }
        JobParams::Delete { pages } => require_pages(pages, "pages")?,
        JobParams::Extract { pages } => require_pages(pages, "pages")?,
        JobParams::Reorder { order } => require_pages(order, "order")?,
        JobParams::Compress { mode, .. } => match mode {
            CompressMode::Quality { level } => {
                if !(1..=9).contains(level) {
                    return Err(BlattwerkError::Validation(format!(
                        "compression level must be between 1 and 9, got {}",
                        level
                    )));
                }
            }
            CompressMode::FileSize { desired_size, .. } => {
                if !desired_size.is_finite() || *desired_size <= 0.0 {
                    return Err(BlattwerkError::Validation(format!(
                        "desired size must be positive, got {}",
                        desired_size
                    )));
                }
            }
        },
        JobParams::Merge
        | JobParams::PdfToText { .. }
        | JobParams::Compare
        | JobParams::OfficeToPdf => {}
    }
    Ok(())
}

fn require_pages(pages: &[u32], field: &str) -> Result<()> {
    if pages.is_empty() {
        return Err(BlattwerkError::Validation(format!(
            "'{}' must list at least one page",
            field
        )));
    }
    if pages.contains(&0) {
        return Err(BlattwerkError::Validation(format!(
            "'{}' pages are 1-indexed; 0 is not a page",
            field
        )));
    }
    Ok(())
}

/// Parse the PDF and enforce the page cap; encrypted documents are
/// rejected because no transform can process them.
fn validate_pdf_constraints(upload: &Upload, max_pages: usize) -> Result<()> {
    let info = inspect(&upload.data).map_err(|_| {
        BlattwerkError::Validation(format!(
            "'{}' is not a readable PDF",
            upload.filename
        ))
    })?;
    if info.encrypted {
        return Err(BlattwerkError::Validation(format!(
            "'{}' is encrypted; password-protected PDFs are not supported",
            upload.filename
        )));
    }
    if info.page_count == 0 {
        return Err(BlattwerkError::Validation(format!(
            "'{}' has no pages",
            upload.filename
        )));
    }
    if info.page_count > max_pages {
        return Err(BlattwerkError::Validation(format!(
            "'{}' has {} pages, exceeding the {} page limit",
            upload.filename, info.page_count, max_pages
        )));
    }
    Ok(())
}

/// For single-input page operations, check the requested pages against the
/// actual page count at submission time.
fn validate_page_references(params: &JobParams, uploads: &[Upload]) -> Result<()> {
    let pages: &[u32] = match params {
        JobParams::Rotate { pages, .. } => pages,
        JobParams::Delete { pages } => pages,
        JobParams::Extract { pages } => pages,
        JobParams::Reorder { order } => order,
        _ => return Ok(()),
    };

    let file = PdfFile::from_bytes(&uploads[0].data).map_err(|_| {
        BlattwerkError::Validation(format!(
            "'{}' is not a readable PDF",
            uploads[0].filename
        ))
    })?;
    let total = file.page_count();

    let bad: Vec<u32> = pages
        .iter()
        .copied()
        .filter(|p| *p as usize > total)
        .collect();
    if !bad.is_empty() {
        return Err(BlattwerkError::Validation(format!(
            "page number(s) {:?} do not exist; document has {} page(s) (valid: 1-{})",
            bad, total, total
        )));
    }

    if let JobParams::Reorder { order } = params {
        let mut seen = order.clone();
        seen.sort();
        seen.dedup();
        if order.len() != total || seen.len() != total {
            return Err(BlattwerkError::Validation(format!(
                "order must list each of the {} page(s) exactly once",
                total
            )));
        }
    }
    if let JobParams::Delete { pages } = params {
        let mut distinct = pages.clone();
        distinct.sort();
        distinct.dedup();
        if distinct.len() >= total {
            return Err(BlattwerkError::Validation(
                "deleting all pages would produce an empty document".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::types::{SizeUnit, TextFormat};
    use crate::registry::spec_for;
    use blattwerk_core::types::JobKind;

    fn pdf_upload(name: &str, pages: usize) -> Upload {
        let lines: Vec<Vec<&str>> = (0..pages).map(|_| vec!["text"]).collect();
        let refs: Vec<&[&str]> = lines.iter().map(|v| v.as_slice()).collect();
        Upload {
            filename: name.to_string(),
            content_type: Some("application/pdf".to_string()),
            data: crate::testutil::pdf_with_pages(&refs),
        }
    }

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn merge_needs_two_files() {
        let err = validate_submission(
            spec_for(JobKind::Merge),
            &JobParams::Merge,
            &[pdf_upload("a.pdf", 1)],
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, BlattwerkError::Validation(_)));
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn rejects_wrong_extension_and_bad_bytes() {
        let mut upload = pdf_upload("a.txt", 1);
        let err = validate_submission(
            spec_for(JobKind::Compress),
            &JobParams::Compress {
                mode: CompressMode::Quality { level: 5 },
                grayscale: false,
            },
            std::slice::from_ref(&upload),
            &config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a PDF"));

        upload.filename = "a.pdf".to_string();
        upload.data = b"this is not a pdf".to_vec();
        let err = validate_submission(
            spec_for(JobKind::Compress),
            &JobParams::Compress {
                mode: CompressMode::Quality { level: 5 },
                grayscale: false,
            },
            &[upload],
            &config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a readable PDF"));
    }

    #[test]
    fn enforces_size_cap() {
        let mut cfg = config();
        cfg.max_upload_bytes = 16;
        let err = validate_submission(
            spec_for(JobKind::PdfToText),
            &JobParams::PdfToText { format: TextFormat::Plain },
            &[pdf_upload("big.pdf", 1)],
            &cfg,
        )
        .unwrap_err();
        assert!(err.to_string().contains("byte limit"));
    }

    #[test]
    fn enforces_page_cap() {
        let mut cfg = config();
        cfg.max_pages = 2;
        let err = validate_submission(
            spec_for(JobKind::PdfToText),
            &JobParams::PdfToText { format: TextFormat::Plain },
            &[pdf_upload("long.pdf", 3)],
            &cfg,
        )
        .unwrap_err();
        assert!(err.to_string().contains("page limit"));
    }

    #[test]
    fn page_references_checked_at_submission() {
        let err = validate_submission(
            spec_for(JobKind::Extract),
            &JobParams::Extract { pages: vec![5] },
            &[pdf_upload("short.pdf", 2)],
            &config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("do not exist"));

        let err = validate_submission(
            spec_for(JobKind::Delete),
            &JobParams::Delete { pages: vec![1, 2] },
            &[pdf_upload("short.pdf", 2)],
            &config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("empty document"));
    }

    #[test]
    fn compress_options_are_checked() {
        let upload = pdf_upload("a.pdf", 1);
        let err = validate_submission(
            spec_for(JobKind::Compress),
            &JobParams::Compress {
                mode: CompressMode::Quality { level: 12 },
                grayscale: false,
            },
            std::slice::from_ref(&upload),
            &config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("between 1 and 9"));

        let err = validate_submission(
            spec_for(JobKind::Compress),
            &JobParams::Compress {
                mode: CompressMode::FileSize { desired_size: -3.0, unit: SizeUnit::Kb },
                grayscale: false,
            },
            &[upload],
            &config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn rotation_angle_must_be_multiple_of_90() {
        let err = validate_submission(
            spec_for(JobKind::Rotate),
            &JobParams::Rotate { pages: vec![1], angle: 45 },
            &[pdf_upload("a.pdf", 1)],
            &config(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("multiple of 90"));
    }
}
