// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output naming. The download name is derived from the first input's
// sanitised stem plus the operation's suffix; the extension depends on the
// operation (and for text extraction, on the requested format).

use blattwerk_core::types::{JobKind, JobParams, TextFormat};

use crate::registry::spec_for;

/// Sanitise a caller-supplied filename: path components are stripped and
/// anything outside a conservative character set becomes `_`.
pub fn sanitize(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "document".to_string()
    } else {
        cleaned
    }
}

/// Filename stem (sanitised, extension removed).
pub fn stem(name: &str) -> String {
    let sanitized = sanitize(name);
    match sanitized.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => sanitized,
    }
}

/// Lowercase extension of a filename, if any.
pub fn extension(name: &str) -> Option<String> {
    let sanitized = sanitize(name);
    sanitized
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Extension of the operation's output file.
pub fn output_extension(params: &JobParams) -> &'static str {
    match params {
        JobParams::PdfToText { format: TextFormat::Plain } => "txt",
        JobParams::PdfToText { format: TextFormat::Markdown } => "md",
        JobParams::Compare => "json",
        _ => "pdf",
    }
}

/// Storage-relative name of the primary output file.
pub fn output_ref(params: &JobParams) -> String {
    match params.kind() {
        JobKind::Compare => "report.json".to_string(),
        _ => format!("output.{}", output_extension(params)),
    }
}

/// Download filename presented to the caller.
pub fn download_name(params: &JobParams, first_input: &str) -> String {
    let spec = spec_for(params.kind());
    format!("{}{}.{}", stem(first_input), spec.suffix, output_extension(params))
}

/// MIME type for a served file, by extension.
pub fn media_type(filename: &str) -> &'static str {
    match extension(filename).as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}
