// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content-stream text extraction.
//
// Walks each page's decoded content stream and collects the string operands
// of the text-showing operators (Tj, ', ", TJ). Each operator invocation
// becomes one line, which gives the diff engine a stable tokenisation that
// does not depend on glyph positioning heuristics.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::TextFormat;
use lopdf::Object;
use lopdf::content::Content;
use tracing::{debug, instrument};

use super::PdfFile;

/// Extract the text lines of every page, outer Vec indexed by page order.
#[instrument(skip_all)]
pub fn page_lines(file: &PdfFile) -> Result<Vec<Vec<String>>> {
    let doc = file.document();
    let pages = doc.get_pages();
    let mut numbers: Vec<u32> = pages.keys().copied().collect();
    numbers.sort();

    let mut result = Vec::with_capacity(numbers.len());
    for number in numbers {
        let content_bytes = doc.get_page_content(pages[&number]).map_err(|err| {
            BlattwerkError::PdfError(format!("cannot read content of page {}: {}", number, err))
        })?;
        let content = Content::decode(&content_bytes).map_err(|err| {
            BlattwerkError::PdfError(format!("cannot decode content of page {}: {}", number, err))
        })?;
        result.push(lines_from_content(&content));
    }
    debug!(pages = result.len(), "text extracted");
    Ok(result)
}

/// Extract each page's text joined into one string per page.
pub fn page_texts(file: &PdfFile) -> Result<Vec<String>> {
    Ok(page_lines(file)?
        .into_iter()
        .map(|lines| lines.join("\n"))
        .collect())
}

/// Render per-page texts into a single output document.
pub fn render_text(pages: &[String], format: TextFormat) -> String {
    match format {
        TextFormat::Plain => {
            let mut out = String::new();
            for (index, text) in pages.iter().enumerate() {
                if index > 0 {
                    out.push_str("\n\n");
                }
                out.push_str(text);
            }
            out.push('\n');
            out
        }
        TextFormat::Markdown => {
            let mut out = String::new();
            for (index, text) in pages.iter().enumerate() {
                if index > 0 {
                    out.push('\n');
                }
                out.push_str(&format!("## Page {}\n\n", index + 1));
                out.push_str(text);
                out.push('\n');
            }
            out
        }
    }
}

fn lines_from_content(content: &Content) -> Vec<String> {
    let mut lines = Vec::new();
    for operation in &content.operations {
        let text = match operation.operator.as_str() {
            "Tj" | "'" => operation.operands.first().and_then(string_operand),
            // " takes (aw, ac, string); the string is the last operand.
            "\"" => operation.operands.last().and_then(string_operand),
            "TJ" => operation.operands.first().and_then(|operand| {
                let Object::Array(items) = operand else {
                    return None;
                };
                let joined: String = items.iter().filter_map(string_operand).collect();
                (!joined.is_empty()).then_some(joined)
            }),
            _ => None,
        };
        if let Some(text) = text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed.to_string());
            }
        }
    }
    lines
}

fn string_operand(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}
