use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::core::errors::{AppError, AppResult};
use crate::core::types::ExtractedImage;

/// MIME type for an embedded part, by sniffing first and falling back to the
/// part's file extension.
pub fn mime_for(bytes: &[u8], file_name: &str) -> String {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type().to_string();
    }
    let ext = file_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "emf" => "image/x-emf",
        "wmf" => "image/x-wmf",
        _ => "application/octet-stream",
    }
    .to_string()
}

/// Pixel dimensions, or `(0, 0)` for formats the `image` crate cannot decode
/// (EMF/WMF vector parts in Word files, for instance).
pub fn dimensions(bytes: &[u8]) -> (u32, u32) {
    image::load_from_memory(bytes)
        .map(|img| img.dimensions())
        .unwrap_or((0, 0))
}

pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

pub fn extracted_image(name: String, bytes: &[u8], part_name: &str) -> ExtractedImage {
    let (width, height) = dimensions(bytes);
    ExtractedImage {
        name,
        data_url: to_data_url(&mime_for(bytes, part_name), bytes),
        width,
        height,
    }
}

pub fn encode_png(image: &DynamicImage) -> AppResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AppError::Parse(format!("png encode failed: {e}")))?;
    Ok(out.into_inner())
}

/// Decoded `data:` URL payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DecodedDataUrl {
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            "image/x-emf" => "emf",
            "image/x-wmf" => "wmf",
            _ => "bin",
        }
    }
}

pub fn decode_data_url(data_url: &str) -> AppResult<DecodedDataUrl> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| AppError::InvalidInput("not a data url".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AppError::InvalidInput("data url has no payload".to_string()))?;
    let mime = header
        .strip_suffix(";base64")
        .ok_or_else(|| AppError::InvalidInput("only base64 data urls are supported".to_string()))?;
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| AppError::InvalidInput(format!("invalid base64 payload: {e}")))?;
    Ok(DecodedDataUrl {
        mime: if mime.is_empty() {
            "application/octet-stream".to_string()
        } else {
            mime.to_ascii_lowercase()
        },
        bytes,
    })
}
