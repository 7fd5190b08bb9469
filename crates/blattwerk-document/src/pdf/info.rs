// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document inspection: page count, encryption flag, and the classic
// /Info dictionary metadata fields.

use blattwerk_core::error::Result;
use lopdf::{Dictionary, Object};
use serde::Serialize;
use tracing::instrument;

use super::PdfFile;

/// Metadata summary of a PDF document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modification_date: Option<String>,
}

/// Inspect a PDF held in memory.
#[instrument(skip_all, fields(bytes_len = data.len()))]
pub fn inspect(data: &[u8]) -> Result<DocumentInfo> {
    let file = PdfFile::from_bytes(data)?;
    let doc = file.document();

    let encrypted = doc.trailer.get(b"Encrypt").is_ok();
    let info_dict = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| resolve_dict(doc, obj));

    let field = |key: &[u8]| {
        info_dict
            .as_ref()
            .and_then(|dict| dict.get(key).ok())
            .and_then(string_value)
    };

    Ok(DocumentInfo {
        page_count: file.page_count(),
        encrypted,
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
        creation_date: field(b"CreationDate"),
        modification_date: field(b"ModDate"),
    })
}

fn resolve_dict<'a>(doc: &'a lopdf::Document, object: &'a Object) -> Option<Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict.clone()),
        Object::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|resolved| resolved.as_dict().ok())
            .cloned(),
        _ => None,
    }
}

fn string_value(object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}
