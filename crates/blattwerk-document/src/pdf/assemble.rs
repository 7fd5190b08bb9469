// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page assembly — merge, extract, delete, reorder, and rotate reduce to
// "copy this sequence of pages into a fresh document", so they all route
// through one assembly primitive. Inputs are never mutated; every operation
// serialises a new document.

use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::{Document, Object, ObjectId, dictionary};
use tracing::{debug, info, instrument, warn};

use super::PdfFile;

/// Merge all pages of each file, in file order then page order.
#[instrument(skip_all, fields(file_count = files.len()))]
pub fn merge(files: &[PdfFile]) -> Result<Vec<u8>> {
    info!(file_count = files.len(), "merging documents");

    let mut picks: Vec<(&Document, ObjectId)> = Vec::new();
    for file in files {
        let pages = file.document().get_pages();
        let mut numbers: Vec<u32> = pages.keys().copied().collect();
        numbers.sort();
        for number in numbers {
            picks.push((file.document(), pages[&number]));
        }
    }
    build_document(&picks)
}

/// Keep only the listed pages (1-indexed), in the listed order.
pub fn extract(file: &PdfFile, pages: &[u32]) -> Result<Vec<u8>> {
    check_page_bounds(file.page_count(), pages)?;
    select_pages(file, pages)
}

/// Remove the listed pages (1-indexed), keeping the rest in order.
pub fn delete(file: &PdfFile, pages: &[u32]) -> Result<Vec<u8>> {
    let total = file.page_count();
    check_page_bounds(total, pages)?;

    let kept: Vec<u32> = (1..=total as u32).filter(|n| !pages.contains(n)).collect();
    if kept.is_empty() {
        return Err(BlattwerkError::Transform(
            "deleting all pages would produce an empty document".to_string(),
        ));
    }
    select_pages(file, &kept)
}

/// Reorder all pages; `order` must list each page exactly once.
pub fn reorder(file: &PdfFile, order: &[u32]) -> Result<Vec<u8>> {
    let total = file.page_count();
    check_page_bounds(total, order)?;

    let mut seen: Vec<u32> = order.to_vec();
    seen.sort();
    seen.dedup();
    if order.len() != total || seen.len() != total {
        return Err(BlattwerkError::Transform(format!(
            "order must list each page exactly once (1-{}); got {} page(s)",
            total,
            order.len()
        )));
    }
    select_pages(file, order)
}

/// Rotate the listed pages (1-indexed) by `degrees`, a multiple of 90.
///
/// Rotation is the one operation that edits in place (on a clone): the
/// page tree is untouched, only /Rotate values change.
#[instrument(skip(file), fields(page_count = pages.len(), degrees))]
pub fn rotate(file: &PdfFile, pages: &[u32], degrees: i32) -> Result<Vec<u8>> {
    if degrees % 90 != 0 {
        return Err(BlattwerkError::Transform(format!(
            "rotation must be a multiple of 90, got {}",
            degrees
        )));
    }
    check_page_bounds(file.page_count(), pages)?;

    let mut doc = file.document().clone();
    let page_ids = doc.get_pages();

    for number in pages {
        let page_id = page_ids[number];

        // Read the existing /Rotate value, default 0.
        let existing = doc
            .get_object(page_id)
            .ok()
            .and_then(|obj| match obj {
                Object::Dictionary(dict) => dict
                    .get(b"Rotate")
                    .ok()
                    .and_then(|r| r.as_i64().ok())
                    .map(|v| v as i32),
                _ => None,
            })
            .unwrap_or(0);

        let rotation = (existing + degrees).rem_euclid(360);
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            dict.set("Rotate", Object::Integer(rotation as i64));
        }
        debug!(page = number, existing, rotation, "page rotated");
    }

    save_to_bytes(&mut doc)
}

// -- Assembly primitive -------------------------------------------------------

/// Serialise a new document from one source's pages, in the given order.
fn select_pages(file: &PdfFile, pages: &[u32]) -> Result<Vec<u8>> {
    let page_ids = file.document().get_pages();
    let picks: Vec<(&Document, ObjectId)> = pages
        .iter()
        .map(|number| (file.document(), page_ids[number]))
        .collect();
    build_document(&picks)
}

/// Build a fresh document containing the picked pages in order.
///
/// Each pick is deep-cloned (page dictionary plus everything it
/// transitively references) so the output is self-contained.
fn build_document(picks: &[(&Document, ObjectId)]) -> Result<Vec<u8>> {
    let mut target = Document::with_version("1.5");
    let pages_id = target.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(picks.len());
    for (source, page_id) in picks {
        let cloned_id = import_page(source, &mut target, *page_id)?;
        if let Ok(Object::Dictionary(dict)) = target.get_object_mut(cloned_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
        kids.push(Object::Reference(cloned_id));
    }

    let count = kids.len() as i64;
    target.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    target.trailer.set("Root", catalog_id);

    save_to_bytes(&mut target)
}

fn save_to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| BlattwerkError::PdfError(format!("failed to serialise document: {}", err)))?;
    debug!(output_bytes = output.len(), "document serialised");
    Ok(output)
}

/// Clone one page object from `source` into `target`, returning its new id.
fn import_page(source: &Document, target: &mut Document, page_id: ObjectId) -> Result<ObjectId> {
    let page_object = source.get_object(page_id).map_err(|err| {
        BlattwerkError::PdfError(format!("cannot read page object {:?}: {}", page_id, err))
    })?;
    let cloned = import_object(source, target, page_object)?;
    Ok(target.add_object(cloned))
}

/// Deep-clone an lopdf object, recursively resolving references. /Parent is
/// deliberately skipped to avoid circular cloning; the assembly loop patches
/// it to point at the new page tree.
fn import_object(source: &Document, target: &mut Document, object: &Object) -> Result<Object> {
    match object {
        Object::Dictionary(dict) => {
            let mut new_dict = lopdf::Dictionary::new();
            for (key, value) in dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned = import_object(source, target, value)?;
                new_dict.set(key.clone(), cloned);
            }
            Ok(Object::Dictionary(new_dict))
        }
        Object::Array(items) => {
            let mut new_items = Vec::with_capacity(items.len());
            for item in items {
                new_items.push(import_object(source, target, item)?);
            }
            Ok(Object::Array(new_items))
        }
        Object::Reference(ref_id) => match source.get_object(*ref_id) {
            Ok(referenced) => {
                let cloned = import_object(source, target, referenced)?;
                let new_id = target.add_object(cloned);
                Ok(Object::Reference(new_id))
            }
            Err(err) => {
                warn!(?ref_id, %err, "cannot resolve reference, using Null");
                Ok(Object::Null)
            }
        },
        Object::Stream(stream) => {
            let mut new_dict = lopdf::Dictionary::new();
            for (key, value) in stream.dict.iter() {
                if key == b"Parent" {
                    continue;
                }
                let cloned = import_object(source, target, value)?;
                new_dict.set(key.clone(), cloned);
            }
            Ok(Object::Stream(lopdf::Stream::new(
                new_dict,
                stream.content.clone(),
            )))
        }
        other => Ok(other.clone()),
    }
}

/// Reject page numbers outside 1..=total, with every offender listed.
fn check_page_bounds(total: usize, pages: &[u32]) -> Result<()> {
    let bad: Vec<u32> = pages
        .iter()
        .copied()
        .filter(|p| *p == 0 || *p as usize > total)
        .collect();
    if bad.is_empty() {
        Ok(())
    } else {
        Err(BlattwerkError::Transform(format!(
            "page number(s) {:?} do not exist; document has {} page(s) (valid: 1-{})",
            bad, total, total
        )))
    }
}
