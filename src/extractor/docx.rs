//! Word (OOXML) parsing.
//!
//! Raw text is the mandatory result and comes from `docx-rs`, with a direct
//! `word/document.xml` walk as fallback. The structural pass is separate and
//! best-effort: it turns the body into [`Block`]s, swapping every embedded
//! picture for a placeholder registered in an [`ImageRegistry`].

use std::collections::HashMap;
use std::io::{Cursor, Read};

use roxmltree::Node;

use crate::core::errors::{AppError, AppResult};
use crate::extractor::images;
use crate::extractor::sections::{Block, ImageRegistry};

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// An empty string is a valid result: a package that only holds pictures
/// still goes through the structural pass. Fails only when neither path can
/// read the package.
pub fn extract_raw_text(bytes: &[u8]) -> AppResult<String> {
    let primary = raw_text_with_docx_rs(bytes);
    if let Ok(text) = &primary {
        if !text.trim().is_empty() {
            return Ok(text.clone());
        }
    }
    match (raw_text_with_xml_fallback(bytes), primary) {
        (Ok(text), _) => Ok(text),
        (Err(fallback_err), Ok(text)) => {
            tracing::debug!(error = %fallback_err, "xml fallback failed after empty docx-rs text");
            Ok(text)
        }
        (Err(fallback_err), Err(primary_err)) => Err(AppError::Parse(format!(
            "DOCX text extraction failed (docx-rs: {primary_err}; xml fallback: {fallback_err})"
        ))),
    }
}

fn raw_text_with_docx_rs(bytes: &[u8]) -> AppResult<String> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| AppError::Parse(format!("docx-rs failed: {e}")))?;

    let mut lines: Vec<String> = Vec::new();
    for child in &docx.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => lines.push(paragraph_text(para)),
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    #[allow(irrefutable_let_patterns)]
                    let docx_rs::TableChild::TableRow(row) = row
                    else {
                        continue;
                    };
                    let mut cells: Vec<String> = Vec::new();
                    for cell in &row.cells {
                        #[allow(irrefutable_let_patterns)]
                        let docx_rs::TableRowChild::TableCell(cell) = cell
                        else {
                            continue;
                        };
                        let mut cell_text: Vec<String> = Vec::new();
                        for content in &cell.children {
                            if let docx_rs::TableCellContent::Paragraph(para) = content {
                                cell_text.push(paragraph_text(para));
                            }
                        }
                        cells.push(cell_text.join(" ").trim().to_string());
                    }
                    lines.push(cells.join("\t"));
                }
            }
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut buf = String::new();
    for run_child in &para.children {
        if let docx_rs::ParagraphChild::Run(run) = run_child {
            for r in &run.children {
                match r {
                    docx_rs::RunChild::Text(t) => buf.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => buf.push('\t'),
                    docx_rs::RunChild::Break(_) => buf.push('\n'),
                    _ => {}
                }
            }
        }
    }
    buf
}

fn raw_text_with_xml_fallback(bytes: &[u8]) -> AppResult<String> {
    let mut package = DocxPackage::open(bytes)?;
    let xml = package.document_xml()?;
    let xml_doc = roxmltree::Document::parse(&xml)
        .map_err(|e| AppError::Parse(format!("document.xml parse failed: {e}")))?;

    let mut lines: Vec<String> = Vec::new();
    for para in xml_doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "p")
    {
        let mut buf = String::new();
        for node in para.descendants().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "t" => {
                    if let Some(text) = node.text() {
                        buf.push_str(text);
                    }
                }
                "tab" => buf.push('\t'),
                "br" | "cr" => buf.push('\n'),
                _ => {}
            }
        }
        lines.push(buf);
    }

    Ok(lines.join("\n"))
}

// ── Structural pass ──────────────────────────────────────────────────────────

struct DocxPackage {
    archive: zip::ZipArchive<Cursor<Vec<u8>>>,
}

impl DocxPackage {
    fn open(bytes: &[u8]) -> AppResult<Self> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| AppError::Parse(format!("zip open failed: {e}")))?;
        Ok(Self { archive })
    }

    fn read_part(&mut self, name: &str) -> AppResult<Vec<u8>> {
        let mut part = self
            .archive
            .by_name(name)
            .map_err(|e| AppError::Parse(format!("{name} missing: {e}")))?;
        let mut buf = Vec::new();
        part.read_to_end(&mut buf)
            .map_err(|e| AppError::Parse(format!("cannot read {name}: {e}")))?;
        Ok(buf)
    }

    fn document_xml(&mut self) -> AppResult<String> {
        let bytes = self.read_part(DOCUMENT_PART)?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Parse(format!("document.xml is not utf-8: {e}")))
    }

    /// Relationship id → package part name (`word/media/image1.png`).
    fn image_relationships(&mut self) -> HashMap<String, String> {
        let Ok(bytes) = self.read_part(DOCUMENT_RELS_PART) else {
            return HashMap::new();
        };
        let Ok(xml) = String::from_utf8(bytes) else {
            return HashMap::new();
        };
        let Ok(doc) = roxmltree::Document::parse(&xml) else {
            return HashMap::new();
        };
        doc.descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
            .filter(|n| n.attribute("TargetMode") != Some("External"))
            .filter_map(|n| {
                let id = n.attribute("Id")?;
                let target = n.attribute("Target")?;
                Some((id.to_string(), resolve_target(target)))
            })
            .collect()
    }
}

fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = vec!["word"];
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Converts the document body into blocks, registering each embedded image.
pub fn extract_structure(bytes: &[u8], registry: &mut ImageRegistry) -> AppResult<Vec<Block>> {
    let mut package = DocxPackage::open(bytes)?;
    let xml = package.document_xml()?;
    let relationships = package.image_relationships();
    let doc = roxmltree::Document::parse(&xml)
        .map_err(|e| AppError::Parse(format!("document.xml parse failed: {e}")))?;
    let body = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "body")
        .ok_or_else(|| AppError::Parse("document.xml has no body".to_string()))?;

    let mut converter = Converter {
        package: &mut package,
        relationships: &relationships,
        registry,
        media_cache: HashMap::new(),
    };
    let mut blocks = Vec::new();
    converter.collect_blocks(body, &mut blocks);
    Ok(blocks)
}

struct Converter<'a> {
    package: &'a mut DocxPackage,
    relationships: &'a HashMap<String, String>,
    registry: &'a mut ImageRegistry,
    // Same picture referenced twice gets one placeholder per reference but
    // is only decoded once.
    media_cache: HashMap<String, Vec<u8>>,
}

impl Converter<'_> {
    fn collect_blocks(&mut self, container: Node<'_, '_>, blocks: &mut Vec<Block>) {
        for child in container.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "p" => {
                    let text = self.inline_text(child);
                    if text.trim().is_empty() {
                        continue;
                    }
                    if is_heading(child) {
                        blocks.push(Block::Heading(text));
                    } else {
                        blocks.push(Block::Body(text));
                    }
                }
                "tbl" => {
                    let text = self.table_text(child);
                    if !text.trim().is_empty() {
                        blocks.push(Block::Body(text));
                    }
                }
                // Content controls wrap ordinary paragraphs and tables.
                "sdt" => {
                    if let Some(content) = child
                        .children()
                        .find(|n| n.is_element() && n.tag_name().name() == "sdtContent")
                    {
                        self.collect_blocks(content, blocks);
                    }
                }
                _ => {}
            }
        }
    }

    fn table_text(&mut self, table: Node<'_, '_>) -> String {
        let mut rows: Vec<String> = Vec::new();
        for row in table
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "tr")
        {
            let mut cells: Vec<String> = Vec::new();
            for cell in row
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "tc")
            {
                let paragraphs: Vec<String> = cell
                    .children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "p")
                    .map(|p| self.inline_text(p))
                    .collect();
                cells.push(paragraphs.join(" ").trim().to_string());
            }
            rows.push(cells.join("\t"));
        }
        rows.join("\n")
    }

    fn inline_text(&mut self, node: Node<'_, '_>) -> String {
        let mut buf = String::new();
        self.walk_inline(node, &mut buf);
        buf
    }

    fn walk_inline(&mut self, node: Node<'_, '_>, buf: &mut String) {
        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "t" => {
                    if let Some(text) = child.text() {
                        buf.push_str(text);
                    }
                }
                "tab" => buf.push('\t'),
                "br" | "cr" => buf.push('\n'),
                // Alternate content repeats the picture in its fallback branch.
                "Fallback" => {}
                "blip" => {
                    if let Some(rel_id) = relationship_attr(child, "embed") {
                        self.push_image(&rel_id, buf);
                    }
                }
                "imagedata" => {
                    if let Some(rel_id) = relationship_attr(child, "id") {
                        self.push_image(&rel_id, buf);
                    }
                }
                _ => self.walk_inline(child, buf),
            }
        }
    }

    fn push_image(&mut self, rel_id: &str, buf: &mut String) {
        let Some(part_name) = self.relationships.get(rel_id).cloned() else {
            tracing::debug!(rel_id, "image relationship not found");
            return;
        };
        let bytes = match self.media_cache.get(&part_name) {
            Some(bytes) => bytes.clone(),
            None => match self.package.read_part(&part_name) {
                Ok(bytes) => {
                    self.media_cache.insert(part_name.clone(), bytes.clone());
                    bytes
                }
                Err(err) => {
                    tracing::warn!(part = %part_name, error = %err, "skipping unreadable image part");
                    return;
                }
            },
        };
        let name = self.registry.next_name();
        let token = self
            .registry
            .register(images::extracted_image(name, &bytes, &part_name));
        buf.push_str(&token);
    }
}

fn relationship_attr(node: Node<'_, '_>, local_name: &str) -> Option<String> {
    node.attributes()
        .find(|attr| attr.name() == local_name && attr.namespace().is_some())
        .map(|attr| attr.value().to_string())
}

fn is_heading(para: Node<'_, '_>) -> bool {
    let Some(props) = para
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "pPr")
    else {
        return false;
    };
    props.children().filter(|n| n.is_element()).any(|n| {
        match n.tag_name().name() {
            "pStyle" => n
                .attributes()
                .find(|attr| attr.name() == "val")
                .map(|attr| {
                    let style = attr.value().to_ascii_lowercase();
                    style.starts_with("heading") || style.starts_with("title")
                })
                .unwrap_or(false),
            "outlineLvl" => true,
            _ => false,
        }
    })
}
