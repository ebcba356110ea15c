use std::path::Path;

use crate::core::errors::{AppError, AppResult};

pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["docx", "doc", "pdf", "txt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    /// Office Open XML (`.docx`).
    Word,
    /// Legacy `.doc`. Only readable when it is really an OOXML package.
    LegacyWord,
}

impl DocumentKind {
    /// Accepts an upload when either the MIME type or the file extension
    /// matches; everything else is rejected before any parsing happens.
    pub fn detect(mime_type: &str, file_name: &str) -> AppResult<Self> {
        let mime = mime_type.trim().to_ascii_lowercase();
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        if let Some(kind) = Self::from_mime(&mime) {
            return Ok(kind);
        }
        match ext.as_str() {
            "docx" => Ok(Self::Word),
            "doc" => Ok(Self::LegacyWord),
            "pdf" => Ok(Self::Pdf),
            "txt" => Ok(Self::PlainText),
            _ => Err(AppError::UnsupportedFileType(format!(
                "{file_name} ({}); accepted: .{}",
                if mime.is_empty() { "no mime type" } else { mime.as_str() },
                ACCEPTED_EXTENSIONS.join(", .")
            ))),
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Word)
            }
            "application/msword" => Some(Self::LegacyWord),
            "application/pdf" => Some(Self::Pdf),
            "text/plain" => Some(Self::PlainText),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PlainText => "text",
            Self::Pdf => "pdf",
            Self::Word => "docx",
            Self::LegacyWord => "doc",
        }
    }
}
