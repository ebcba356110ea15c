//! PDF parsing: per-page text through `pdf-extract`, page imagery through
//! `lopdf`.
//!
//! Each page contributes its largest embedded image XObject, kept only when
//! both sides exceed [`MIN_PAGE_IMAGE_SIDE`]. Every kept image becomes a
//! section numbered by its page; section text is left empty.

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use uuid::Uuid;

use crate::core::errors::{AppError, AppResult};
use crate::core::types::{DocumentSection, ExtractedImage};
use crate::extractor::images;

pub const MIN_PAGE_IMAGE_SIDE: u32 = 100;

#[derive(Debug, Default)]
pub struct PdfExtraction {
    pub text: String,
    pub images: Vec<ExtractedImage>,
    pub sections: Vec<DocumentSection>,
}

pub fn extract(bytes: &[u8]) -> AppResult<PdfExtraction> {
    // pdf-extract panics on some malformed font tables.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| AppError::Parse("pdf-extract panicked on malformed input".to_string()))?
        .map_err(|e| AppError::Parse(format!("pdf-extract failed: {e}")))?;
    let text = pages.join("\n");

    let (images, sections) = match Document::load_mem(bytes) {
        Ok(doc) => page_images(&doc),
        Err(err) => {
            tracing::warn!(error = %err, "lopdf could not load pdf, skipping page images");
            (Vec::new(), Vec::new())
        }
    };

    Ok(PdfExtraction {
        text,
        images,
        sections,
    })
}

pub(crate) fn page_images(doc: &Document) -> (Vec<ExtractedImage>, Vec<DocumentSection>) {
    let mut images = Vec::new();
    let mut sections = Vec::new();

    for (page_number, page_id) in doc.get_pages() {
        let Some(candidate) = largest_page_image(doc, page_id) else {
            continue;
        };
        if candidate.width <= MIN_PAGE_IMAGE_SIDE || candidate.height <= MIN_PAGE_IMAGE_SIDE {
            tracing::debug!(page_number, "page image below size threshold");
            continue;
        }
        let Some((bytes, mime)) = decode_image_stream(doc, candidate.stream, &candidate) else {
            tracing::debug!(page_number, "page image uses an unsupported encoding");
            continue;
        };
        let image = ExtractedImage {
            name: format!("Page {page_number}"),
            data_url: images::to_data_url(mime, &bytes),
            width: candidate.width,
            height: candidate.height,
        };
        sections.push(DocumentSection {
            id: format!("pdf-page-{}", Uuid::new_v4()),
            section_number: page_number as usize,
            title: format!("Page {page_number}"),
            text: String::new(),
            images: vec![image.clone()],
        });
        images.push(image);
    }

    (images, sections)
}

struct ImageCandidate<'a> {
    stream: &'a Stream,
    width: u32,
    height: u32,
    bits_per_component: i64,
}

fn largest_page_image(doc: &Document, page_id: ObjectId) -> Option<ImageCandidate<'_>> {
    let page = doc.get_dictionary(page_id).ok()?;
    let resources = page_resources(doc, page)?;
    let xobjects = match resources.get(b"XObject").ok().map(|o| resolve(doc, o)) {
        Some(Object::Dictionary(dict)) => dict,
        _ => return None,
    };

    xobjects
        .iter()
        .filter_map(|(_name, obj)| match resolve(doc, obj) {
            Object::Stream(stream) if is_image(doc, &stream.dict) => {
                let width = integer(doc, &stream.dict, b"Width")?;
                let height = integer(doc, &stream.dict, b"Height")?;
                Some(ImageCandidate {
                    stream,
                    width: u32::try_from(width).ok()?,
                    height: u32::try_from(height).ok()?,
                    bits_per_component: integer(doc, &stream.dict, b"BitsPerComponent")
                        .unwrap_or(8),
                })
            }
            _ => None,
        })
        .max_by_key(|c| u64::from(c.width) * u64::from(c.height))
}

/// Resources live on the page or are inherited from an ancestor `Pages` node.
fn page_resources<'a>(doc: &'a Document, page: &'a Dictionary) -> Option<&'a Dictionary> {
    let mut current = page;
    for _ in 0..32 {
        if let Ok(obj) = current.get(b"Resources") {
            if let Object::Dictionary(dict) = resolve(doc, obj) {
                return Some(dict);
            }
        }
        current = match current.get(b"Parent").ok().map(|o| resolve(doc, o)) {
            Some(Object::Dictionary(parent)) => parent,
            _ => return None,
        };
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn integer(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Integer(value) => Some(*value),
        Object::Real(value) => Some(*value as i64),
        _ => None,
    }
}

fn is_image(doc: &Document, dict: &Dictionary) -> bool {
    matches!(
        dict.get(b"Subtype").ok().map(|o| resolve(doc, o)),
        Some(Object::Name(name)) if name == b"Image"
    )
}

fn filters(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").ok().map(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match resolve(doc, item) {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_image_stream(
    doc: &Document,
    stream: &Stream,
    candidate: &ImageCandidate<'_>,
) -> Option<(Vec<u8>, &'static str)> {
    let filters = filters(doc, &stream.dict);
    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") if filters.len() == 1 => {
            return Some((stream.content.clone(), "image/jpeg"));
        }
        Some(b"JPXDecode") if filters.len() == 1 => {
            return Some((stream.content.clone(), "image/jp2"));
        }
        _ => {}
    }

    if candidate.bits_per_component != 8 {
        return None;
    }
    let raw = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().ok()?
    };

    // Channel count is inferred from the sample buffer; indexed and ICC
    // colour spaces that are not 1 or 3 channels wide are skipped.
    // Declared dimensions are untrusted; overflow means the stream is bogus.
    let pixels = (candidate.width as usize).checked_mul(candidate.height as usize)?;
    let rgb_len = pixels.checked_mul(3)?;
    let image = if raw.len() >= rgb_len {
        RgbImage::from_raw(candidate.width, candidate.height, raw[..rgb_len].to_vec())
            .map(DynamicImage::ImageRgb8)?
    } else if raw.len() >= pixels {
        GrayImage::from_raw(candidate.width, candidate.height, raw[..pixels].to_vec())
            .map(DynamicImage::ImageLuma8)?
    } else {
        return None;
    };
    let png = images::encode_png(&image).ok()?;
    Some((png, "image/png"))
}
