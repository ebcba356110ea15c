//! Groups a document's block-level elements into image-anchored sections.
//!
//! Rules, applied top to bottom:
//!   * a heading flushes the open section and titles the next one;
//!   * a block carrying image placeholders attaches those images plus its
//!     remaining text, then flushes immediately (images end a section);
//!   * a plain block appends text, flushing a text-only section once more
//!     than [`MAX_PENDING_TEXT`] characters pile up without an image;
//!   * whatever is left is flushed at the end.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::core::types::{DocumentSection, ExtractedImage};

pub const MAX_PENDING_TEXT: usize = 1000;

const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

// Private-use delimiters never occur in extracted document text.
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}image:(\\d+)\u{E001}").expect("placeholder regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    /// Paragraph, table or list text; may contain image placeholders.
    Body(String),
}

/// Images intercepted while converting a document, addressable by the
/// placeholder token that replaced each of them in the block text.
#[derive(Debug, Default)]
pub struct ImageRegistry {
    images: Vec<ExtractedImage>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the image and returns its placeholder token.
    pub fn register(&mut self, image: ExtractedImage) -> String {
        let idx = self.images.len();
        self.images.push(image);
        placeholder(idx)
    }

    pub fn next_name(&self) -> String {
        format!("Image {}", self.images.len() + 1)
    }

    pub fn into_images(self) -> Vec<ExtractedImage> {
        self.images
    }

    /// Splits block text into its non-placeholder text and the images the
    /// placeholders refer to, in order of appearance.
    pub fn resolve(&self, text: &str) -> (String, Vec<ExtractedImage>) {
        let mut images = Vec::new();
        for caps in PLACEHOLDER_RE.captures_iter(text) {
            let image = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .and_then(|idx| self.images.get(idx));
            if let Some(image) = image {
                images.push(image.clone());
            }
        }
        let stripped = PLACEHOLDER_RE.replace_all(text, " ");
        (normalize_whitespace(&stripped), images)
    }
}

pub fn placeholder(idx: usize) -> String {
    format!("{PLACEHOLDER_OPEN}image:{idx}{PLACEHOLDER_CLOSE}")
}

pub fn has_placeholder(text: &str) -> bool {
    PLACEHOLDER_RE.is_match(text)
}

fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Default)]
struct SectionBuilder {
    sections: Vec<DocumentSection>,
    title: Option<String>,
    pending: Vec<String>,
    pending_len: usize,
    images: Vec<ExtractedImage>,
}

impl SectionBuilder {
    fn push_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        self.pending_len += text.chars().count();
        self.pending.push(text);
    }

    fn flush(&mut self) {
        if self.pending.is_empty() && self.images.is_empty() {
            return;
        }
        let section_number = self.sections.len() + 1;
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| format!("Section {section_number}"));
        self.sections.push(DocumentSection {
            id: format!("section-{}", Uuid::new_v4()),
            section_number,
            title,
            text: self.pending.join("\n"),
            images: std::mem::take(&mut self.images),
        });
        self.pending.clear();
        self.pending_len = 0;
    }
}

pub fn build_sections(blocks: &[Block], registry: &ImageRegistry) -> Vec<DocumentSection> {
    let mut builder = SectionBuilder::default();

    for block in blocks {
        match block {
            Block::Heading(title) if !has_placeholder(title) => {
                builder.flush();
                let title = normalize_whitespace(title);
                builder.title = (!title.is_empty()).then_some(title);
            }
            Block::Heading(text) | Block::Body(text) => {
                let (text, images) = registry.resolve(text);
                if images.is_empty() {
                    builder.push_text(text);
                    if builder.images.is_empty() && builder.pending_len > MAX_PENDING_TEXT {
                        builder.flush();
                    }
                } else {
                    builder.images.extend(images);
                    builder.push_text(text);
                    builder.flush();
                }
            }
        }
    }
    builder.flush();
    builder.sections
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn image(name: &str) -> ExtractedImage {
        ExtractedImage {
            name: name.to_string(),
            data_url: "data:image/png;base64,AAAA".to_string(),
            width: 200,
            height: 120,
        }
    }

    #[test]
    fn two_headings_with_an_image_under_the_second() {
        let mut registry = ImageRegistry::new();
        let token = registry.register(image("Image 1"));
        let blocks = vec![
            Block::Heading("Overview".into()),
            Block::Body("Head office network summary.".into()),
            Block::Heading("Topology".into()),
            Block::Body(format!("{token} Figure 1: core switch stack")),
        ];

        let sections = build_sections(&blocks, &registry);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Overview");
        assert_eq!(sections[0].text, "Head office network summary.");
        assert!(sections[0].images.is_empty());
        assert_eq!(sections[1].title, "Topology");
        assert_eq!(sections[1].text, "Figure 1: core switch stack");
        assert_eq!(sections[1].images.len(), 1);
        assert_eq!(sections[1].section_number, 2);
    }

    #[test]
    fn image_block_closes_the_section_with_its_preceding_text() {
        let mut registry = ImageRegistry::new();
        let a = registry.register(image("Image 1"));
        let b = registry.register(image("Image 2"));
        let blocks = vec![
            Block::Body("Before the diagram.".into()),
            Block::Body(format!("{a}{b}")),
            Block::Body("After the diagram.".into()),
        ];

        let sections = build_sections(&blocks, &registry);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].text, "Before the diagram.");
        assert_eq!(
            sections[0]
                .images
                .iter()
                .map(|i| i.name.as_str())
                .collect::<Vec<_>>(),
            vec!["Image 1", "Image 2"]
        );
        assert_eq!(sections[1].text, "After the diagram.");
        assert_eq!(sections[1].title, "Section 2");
    }

    #[test]
    fn long_text_without_images_is_split() {
        let registry = ImageRegistry::new();
        let paragraph = "x".repeat(600);
        let blocks = vec![
            Block::Body(paragraph.clone()),
            Block::Body(paragraph.clone()),
            Block::Body("tail".into()),
        ];

        let sections = build_sections(&blocks, &registry);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].text, format!("{paragraph}\n{paragraph}"));
        assert_eq!(sections[1].text, "tail");
    }

    #[test]
    fn empty_heading_runs_do_not_emit_sections() {
        let registry = ImageRegistry::new();
        let blocks = vec![
            Block::Heading("One".into()),
            Block::Heading("Two".into()),
            Block::Body("body".into()),
        ];
        let sections = build_sections(&blocks, &registry);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Two");
    }

    #[test]
    fn sections_partition_body_text_in_order() {
        let mut registry = ImageRegistry::new();
        let token = registry.register(image("Image 1"));
        let bodies = [
            "Alpha paragraph.".to_string(),
            "y".repeat(1200),
            format!("caption {token}"),
            "Omega paragraph.".to_string(),
        ];
        let mut blocks = vec![Block::Heading("Start".into())];
        blocks.extend(bodies.iter().cloned().map(Block::Body));

        let sections = build_sections(&blocks, &registry);
        let joined: Vec<String> = sections.iter().map(|s| s.text.clone()).collect();
        let expected: Vec<String> = bodies
            .iter()
            .map(|b| registry.resolve(b).0)
            .collect();
        assert_eq!(joined.join("\n"), expected.join("\n"));

        let numbers: Vec<usize> = sections.iter().map(|s| s.section_number).collect();
        assert_eq!(numbers, (1..=sections.len()).collect::<Vec<_>>());
        let ids: HashSet<&str> = sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), sections.len());
    }
}
