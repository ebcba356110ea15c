//! Document network-data extraction.
//!
//! One upload in, one [`ExtractedNetworkData`] out:
//!   file type gate → raw text (+ images and sections) → keyword heuristics.

pub mod docx;
pub mod file_type;
pub mod heuristics;
pub mod images;
pub mod pdf;
pub mod sections;

use std::path::Path;

use crate::core::errors::{AppError, AppResult};
use crate::core::types::{DocumentSection, ExtractedImage, ExtractedNetworkData};
use file_type::DocumentKind;
use sections::ImageRegistry;

pub fn extract_file(file_path: &Path, mime_type: &str) -> AppResult<ExtractedNetworkData> {
    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    // Reject before touching the file contents.
    DocumentKind::detect(mime_type, file_name)?;
    let bytes = std::fs::read(file_path)
        .map_err(|e| AppError::Io(format!("cannot read {}: {e}", file_path.display())))?;
    extract_bytes(file_name, mime_type, &bytes)
}

pub fn extract_bytes(
    file_name: &str,
    mime_type: &str,
    bytes: &[u8],
) -> AppResult<ExtractedNetworkData> {
    let kind = DocumentKind::detect(mime_type, file_name)?;
    tracing::info!(file = file_name, kind = kind.label(), size = bytes.len(), "extracting document");

    let parsed = match kind {
        DocumentKind::PlainText => ParsedDocument::text_only(String::from_utf8_lossy(bytes).into_owned()),
        DocumentKind::Pdf => {
            let pdf = pdf::extract(bytes)?;
            ParsedDocument {
                raw_text: pdf.text,
                images: pdf.images,
                sections: pdf.sections,
            }
        }
        DocumentKind::Word | DocumentKind::LegacyWord => parse_word(bytes)?,
    };

    let data = analyze(parsed);
    tracing::info!(
        file = file_name,
        servers = data.servers.len(),
        devices = data.network_devices.len(),
        ips = data.ip_addresses.len(),
        branches = data.branches.len(),
        images = data.extracted_images.len(),
        sections = data.sections.len(),
        "extraction finished"
    );
    Ok(data)
}

/// Runs only the keyword heuristics over already-extracted text.
pub fn extract_from_text(text: &str) -> ExtractedNetworkData {
    analyze(ParsedDocument::text_only(text.to_string()))
}

struct ParsedDocument {
    raw_text: String,
    images: Vec<ExtractedImage>,
    sections: Vec<DocumentSection>,
}

impl ParsedDocument {
    fn text_only(raw_text: String) -> Self {
        Self {
            raw_text,
            images: Vec::new(),
            sections: Vec::new(),
        }
    }
}

fn parse_word(bytes: &[u8]) -> AppResult<ParsedDocument> {
    let raw_text = docx::extract_raw_text(bytes)?;

    let mut registry = ImageRegistry::new();
    match docx::extract_structure(bytes, &mut registry) {
        Ok(blocks) => {
            let sections = sections::build_sections(&blocks, &registry);
            Ok(ParsedDocument {
                raw_text,
                images: registry.into_images(),
                sections,
            })
        }
        Err(err) => {
            tracing::warn!(error = %err, "structural conversion failed, returning text only");
            Ok(ParsedDocument::text_only(raw_text))
        }
    }
}

fn analyze(parsed: ParsedDocument) -> ExtractedNetworkData {
    let text = parsed.raw_text.as_str();
    ExtractedNetworkData {
        servers: heuristics::extract_servers(text),
        network_devices: heuristics::extract_network_devices(text),
        ip_addresses: heuristics::extract_ip_addresses(text),
        branches: heuristics::extract_branches(text),
        extracted_images: parsed.images,
        sections: parsed.sections,
        raw_text: parsed.raw_text,
    }
}
