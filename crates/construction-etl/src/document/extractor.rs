use calamine::{open_workbook_auto, Reader};
use lopdf::Document as PdfDocument;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader as XmlReader;
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use super::page::{pages_from_texts, Page};
use crate::config::ExtractionConfig;
use crate::utils::encoding;
use crate::utils::error::{PipelineError, Result};

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)*").expect("valid regex"));
static TRAILING_SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").expect("valid regex"));

/// Turns one input file into numbered pages
#[cfg_attr(test, mockall::automock)]
pub trait PageExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<Page>>;
}

/// Pick the extractor for a file by extension
pub fn extractor_for(path: &Path, config: &ExtractionConfig) -> Result<Box<dyn PageExtractor>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| PipelineError::UnsupportedFileType(format!("{:?} has no extension", path)))?;

    let extractor: Box<dyn PageExtractor> = match extension.as_str() {
        "pdf" => Box::new(PdfExtractor),
        "docx" => Box::new(DocxExtractor::new(config.chars_per_page)),
        "pptx" => Box::new(PptxExtractor),
        "xlsx" | "xlsm" | "xls" | "ods" => Box::new(XlsxExtractor),
        "txt" | "text" | "md" | "csv" | "log" => {
            Box::new(TextExtractor::new(config.chars_per_page))
        }
        other => return Err(PipelineError::UnsupportedFileType(other.to_string())),
    };

    Ok(extractor)
}

/// Tidy extracted text: trailing spaces dropped, blank-line runs collapsed
pub fn normalize_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let text = TRAILING_SPACES.replace_all(&text, "\n");
    BLANK_LINES.replace_all(&text, "\n\n").trim().to_string()
}

/// Group paragraphs into virtual pages of at most `chars_per_page` chars.
/// A paragraph longer than the budget becomes a page of its own.
pub fn paginate<I, S>(paragraphs: I, chars_per_page: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    const SEPARATOR: &str = "\n\n";

    let mut pages = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for paragraph in paragraphs {
        let paragraph = paragraph.as_ref().trim();
        if paragraph.is_empty() {
            continue;
        }

        let chars = paragraph.chars().count();
        if !current.is_empty() && current_chars + SEPARATOR.len() + chars > chars_per_page {
            pages.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        if !current.is_empty() {
            current.push_str(SEPARATOR);
            current_chars += SEPARATOR.len();
        }
        current.push_str(paragraph);
        current_chars += chars;
    }

    if !current.is_empty() {
        pages.push(current);
    }

    pages
}

/// Fixed-layout documents: one page per PDF page
pub struct PdfExtractor;

impl PageExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<Page>> {
        let doc = PdfDocument::load(path).map_err(|e| {
            PipelineError::ParsingError(format!("Failed to load PDF {:?}: {}", path, e))
        })?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let texts = page_numbers.iter().map(|&page_num| match doc.extract_text(&[page_num]) {
            Ok(text) => normalize_text(&text),
            Err(e) => {
                // keep the page so numbering matches the source
                warn!("Failed to extract text from page {}: {}", page_num, e);
                String::new()
            }
        });
        let pages = pages_from_texts(texts);

        debug!("Extracted {} pages from {:?}", pages.len(), path);
        Ok(pages)
    }
}

/// Flow-text Word documents, split into virtual pages
pub struct DocxExtractor {
    chars_per_page: usize,
}

impl DocxExtractor {
    pub fn new(chars_per_page: usize) -> Self {
        Self { chars_per_page }
    }

    fn paragraphs(bytes: &[u8]) -> Result<Vec<String>> {
        let doc = docx_rs::read_docx(bytes)
            .map_err(|e| PipelineError::ParsingError(format!("Failed to read DOCX: {}", e)))?;

        let mut paragraphs = Vec::new();
        for child in doc.document.children {
            // Tables and section properties carry no body text we use
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut text = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                text.push_str(&t.text);
                            }
                        }
                    }
                }
                paragraphs.push(text);
            }
        }

        Ok(paragraphs)
    }
}

impl PageExtractor for DocxExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<Page>> {
        let bytes = fs::read(path)?;
        let paragraphs = Self::paragraphs(&bytes)?;
        let pages = pages_from_texts(paginate(&paragraphs, self.chars_per_page));

        debug!(
            "Extracted {} paragraphs into {} virtual pages from {:?}",
            paragraphs.len(),
            pages.len(),
            path
        );
        Ok(pages)
    }
}

/// Presentations: one page per slide
pub struct PptxExtractor;

impl PptxExtractor {
    fn slide_number(name: &str) -> u32 {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(0)
    }

    /// Text of `<a:t>` runs, one line per `<a:p>` paragraph
    pub fn slide_text(xml: &str) -> String {
        let mut reader = XmlReader::from_str(xml);

        let mut lines = Vec::new();
        let mut current = String::new();
        let mut in_text = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
                Ok(Event::Text(e)) if in_text => match e.unescape() {
                    Ok(text) => current.push_str(&text),
                    Err(err) => debug!("Skipping undecodable slide text: {}", err),
                },
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" => {
                        let line = current.trim();
                        if !line.is_empty() {
                            lines.push(line.to_string());
                        }
                        current.clear();
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    warn!("Malformed slide XML at {}: {}", reader.buffer_position(), e);
                    break;
                }
                _ => {}
            }
        }

        let tail = current.trim();
        if !tail.is_empty() {
            lines.push(tail.to_string());
        }

        lines.join("\n")
    }
}

impl PageExtractor for PptxExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<Page>> {
        let file = fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| {
            PipelineError::ParsingError(format!("Failed to open PPTX as ZIP: {}", e))
        })?;

        let mut slide_names: Vec<String> = archive
            .file_names()
            .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
            .map(str::to_string)
            .collect();
        slide_names.sort_by_key(|name| Self::slide_number(name));

        if slide_names.is_empty() {
            warn!("No slide files found in {:?}", path);
        }

        let mut texts = Vec::with_capacity(slide_names.len());
        for name in &slide_names {
            let mut entry = archive.by_name(name).map_err(|e| {
                PipelineError::ParsingError(format!("Failed to read {}: {}", name, e))
            })?;
            let mut xml = String::new();
            entry.read_to_string(&mut xml)?;
            texts.push(Self::slide_text(&xml));
        }

        let pages = pages_from_texts(texts);
        debug!("Extracted {} slides from {:?}", pages.len(), path);
        Ok(pages)
    }
}

/// Workbooks: one page per worksheet
pub struct XlsxExtractor;

impl PageExtractor for XlsxExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<Page>> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            PipelineError::ParsingError(format!("Failed to open workbook {:?}: {}", path, e))
        })?;

        let texts = workbook.worksheets().into_iter().map(|(name, range)| {
            let mut content = format!("Sheet: {}\n", name);
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| cell.to_string())
                    .filter(|s| !s.trim().is_empty())
                    .collect();
                if !cells.is_empty() {
                    content.push_str(&cells.join(" "));
                    content.push('\n');
                }
            }
            content.trim_end().to_string()
        });
        let pages = pages_from_texts(texts);

        debug!("Extracted {} sheets from {:?}", pages.len(), path);
        Ok(pages)
    }
}

/// Plain text and markdown, split into virtual pages
pub struct TextExtractor {
    chars_per_page: usize,
}

impl TextExtractor {
    pub fn new(chars_per_page: usize) -> Self {
        Self { chars_per_page }
    }

    pub fn pages_from_str(&self, text: &str) -> Vec<Page> {
        let text = normalize_text(text);
        pages_from_texts(paginate(text.split("\n\n"), self.chars_per_page))
    }
}

impl PageExtractor for TextExtractor {
    fn extract(&self, path: &Path) -> Result<Vec<Page>> {
        let bytes = fs::read(path)?;
        let decoded = encoding::decode_with_labels(&bytes, encoding::DEFAULT_LABELS)?;
        let pages = self.pages_from_str(&decoded.text);

        debug!(
            "Extracted {} virtual pages from {:?} ({})",
            pages.len(),
            path,
            decoded.encoding_name
        );
        Ok(pages)
    }
}
