// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF compression.
//
// Two levers: re-encode embedded DCT (JPEG) images at a level-derived
// quality, and flate-compress any remaining unfiltered streams. Level runs
// 1..=9; higher levels compress harder and lose more image detail.

use blattwerk_core::error::{BlattwerkError, Result};
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use lopdf::{Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 9;

/// Knobs for a single compression pass.
#[derive(Debug, Clone, Copy)]
pub struct CompressOptions {
    /// Compression level, 1 (lightest) to 9 (strongest).
    pub level: u8,
    /// Convert embedded images to grayscale before re-encoding.
    pub grayscale: bool,
}

/// JPEG quality used for image re-encoding at a given level.
///
/// Monotonically non-increasing in the level, so output size is
/// (approximately) non-increasing too, which the target-size search
/// depends on.
pub fn jpeg_quality(level: u8) -> u8 {
    95u8.saturating_sub(level.saturating_mul(8)).max(30)
}

/// Compress a PDF held in memory, returning the new serialised bytes.
#[instrument(skip_all, fields(level = options.level, grayscale = options.grayscale))]
pub fn compress_pdf(data: &[u8], options: &CompressOptions) -> Result<Vec<u8>> {
    if !(MIN_LEVEL..=MAX_LEVEL).contains(&options.level) {
        return Err(BlattwerkError::Transform(format!(
            "compression level must be between {} and {}, got {}",
            MIN_LEVEL, MAX_LEVEL, options.level
        )));
    }

    let mut doc = Document::load_mem(data)
        .map_err(|err| BlattwerkError::PdfError(format!("failed to load PDF: {}", err)))?;

    let quality = jpeg_quality(options.level);
    let image_ids: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter(|(_, object)| is_dct_image(object))
        .map(|(id, _)| *id)
        .collect();

    let mut reencoded = 0usize;
    for id in image_ids {
        match reencode_image(&doc, id, quality, options.grayscale) {
            Ok(Some(stream)) => {
                doc.objects.insert(id, Object::Stream(stream));
                reencoded += 1;
            }
            Ok(None) => {}
            Err(err) => {
                // A single undecodable image should not fail the whole pass.
                warn!(?id, %err, "skipping image that could not be re-encoded");
            }
        }
    }
    debug!(reencoded, "image re-encoding pass done");

    doc.compress();

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| BlattwerkError::PdfError(format!("failed to serialise PDF: {}", err)))?;
    info!(
        input_bytes = data.len(),
        output_bytes = output.len(),
        "compression pass complete"
    );
    Ok(output)
}

fn is_dct_image(object: &Object) -> bool {
    let Object::Stream(stream) = object else {
        return false;
    };
    let is_image = matches!(
        stream.dict.get(b"Subtype"),
        Ok(Object::Name(name)) if name == b"Image"
    );
    is_image && has_dct_filter(stream)
}

fn has_dct_filter(stream: &Stream) -> bool {
    match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|f| matches!(f, Object::Name(name) if name == b"DCTDecode")),
        _ => false,
    }
}

/// Re-encode one embedded JPEG. Returns `None` when re-encoding would not
/// shrink the stream and no colorspace change was requested.
fn reencode_image(
    doc: &Document,
    id: ObjectId,
    quality: u8,
    grayscale: bool,
) -> Result<Option<Stream>> {
    let Ok(Object::Stream(stream)) = doc.get_object(id) else {
        return Ok(None);
    };

    let decoded = image::load_from_memory(&stream.content)
        .map_err(|err| BlattwerkError::ImageError(format!("cannot decode image: {}", err)))?;

    let (converted, colorspace) = if grayscale {
        (DynamicImage::ImageLuma8(decoded.to_luma8()), "DeviceGray")
    } else {
        (DynamicImage::ImageRgb8(decoded.to_rgb8()), "DeviceRGB")
    };

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(&converted)
        .map_err(|err| BlattwerkError::ImageError(format!("cannot encode JPEG: {}", err)))?;

    if !grayscale && jpeg.len() >= stream.content.len() {
        return Ok(None);
    }

    let mut dict = stream.dict.clone();
    dict.set("ColorSpace", colorspace);
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", "DCTDecode");
    dict.remove(b"DecodeParms");
    Ok(Some(Stream::new(dict, jpeg)))
}
