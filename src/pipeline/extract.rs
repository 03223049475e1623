//! Text extraction: turn a PDF, DOCX or PPTX into ordered text blocks.
//!
//! The pipeline only depends on the [`DocumentReader`] trait; byte-level
//! container parsing is a replaceable collaborator. [`FileDocumentReader`] is
//! the bundled implementation:
//!
//! | Format | Block unit | Backend |
//! |--------|------------|---------|
//! | PDF    | physical page | pdfium (`pdfium-render`) |
//! | DOCX   | paragraph (empty ones kept) | `zip` + `quick-xml` over `word/document.xml` |
//! | PPTX   | slide (paragraphs joined by `\n`) | `zip` + `quick-xml` over `ppt/slides/slideN.xml` |
//!
//! ## Why spawn_blocking?
//!
//! pdfium keeps thread-local state and zip inflation is CPU-bound; both run on
//! the blocking pool so Tokio worker threads never stall.

use crate::error::Doc2StudyError;
use async_trait::async_trait;
use pdfium_render::prelude::*;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Supported upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Pptx,
    Docx,
}

impl DocumentFormat {
    /// Match a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Result<Self, Doc2StudyError> {
        match ext.trim().to_lowercase().as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "pptx" => Ok(DocumentFormat::Pptx),
            "docx" => Ok(DocumentFormat::Docx),
            other => Err(Doc2StudyError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }

    /// Detect the format from a file name or path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Doc2StudyError> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        Self::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Pptx => "pptx",
            DocumentFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// One ordered unit of raw text: a paragraph, slide or PDF page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedBlock {
    /// 0-based position in the document.
    pub index: usize,
    pub text: String,
}

impl ExtractedBlock {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// Reads a document into ordered text blocks.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// # Errors
    /// [`Doc2StudyError::ExtractionFailed`] for malformed documents.
    async fn read(
        &self,
        path: &Path,
        format: DocumentFormat,
    ) -> Result<Vec<ExtractedBlock>, Doc2StudyError>;
}

/// Default reader backed by pdfium and zip/XML parsing.
#[derive(Debug, Clone, Default)]
pub struct FileDocumentReader;

#[async_trait]
impl DocumentReader for FileDocumentReader {
    async fn read(
        &self,
        path: &Path,
        format: DocumentFormat,
    ) -> Result<Vec<ExtractedBlock>, Doc2StudyError> {
        if !path.exists() {
            return Err(Doc2StudyError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let owned = path.to_path_buf();
        let texts = tokio::task::spawn_blocking(move || match format {
            DocumentFormat::Pdf => read_pdf_blocking(&owned),
            DocumentFormat::Docx => read_docx_blocking(&owned),
            DocumentFormat::Pptx => read_pptx_blocking(&owned),
        })
        .await
        .map_err(|e| Doc2StudyError::Internal(format!("Extraction task panicked: {}", e)))??;

        info!("Extracted {} blocks from {} ({})", texts.len(), path.display(), format);

        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(i, t)| ExtractedBlock::new(i, t))
            .collect())
    }
}

fn extraction_failed(path: &Path, detail: impl fmt::Display) -> Doc2StudyError {
    Doc2StudyError::ExtractionFailed {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

// ── PDF ──────────────────────────────────────────────────────────────────

/// Bind pdfium from `PDFIUM_LIB_PATH` when set, else from the system loader path.
fn bind_pdfium() -> Result<Pdfium, PdfiumError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(lib) if !lib.is_empty() => Pdfium::bind_to_library(lib)?,
        _ => Pdfium::bind_to_system_library()?,
    };
    Ok(Pdfium::new(bindings))
}

fn read_pdf_blocking(path: &Path) -> Result<Vec<String>, Doc2StudyError> {
    let pdfium = bind_pdfium()
        .map_err(|e| extraction_failed(path, format!("pdfium unavailable: {:?}", e)))?;

    let document = pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| extraction_failed(path, format!("{:?}", e)))?;

    let mut texts = Vec::new();
    for (i, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| extraction_failed(path, format!("page {}: {:?}", i + 1, e)))?
            .all();
        debug!("PDF page {} → {} chars", i + 1, text.len());
        texts.push(text);
    }
    Ok(texts)
}

// ── Office (zipped XML) ──────────────────────────────────────────────────

fn open_archive(path: &Path) -> Result<zip::ZipArchive<std::fs::File>, Doc2StudyError> {
    let file = std::fs::File::open(path).map_err(|e| extraction_failed(path, e))?;
    zip::ZipArchive::new(file).map_err(|e| extraction_failed(path, e))
}

fn read_entry(
    archive: &mut zip::ZipArchive<std::fs::File>,
    name: &str,
    path: &Path,
) -> Result<String, Doc2StudyError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| extraction_failed(path, format!("{name}: {e}")))?;
    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| extraction_failed(path, format!("{name}: {e}")))?;
    Ok(xml)
}

fn read_docx_blocking(path: &Path) -> Result<Vec<String>, Doc2StudyError> {
    let mut archive = open_archive(path)?;
    let xml = read_entry(&mut archive, "word/document.xml", path)?;
    xml_paragraphs(&xml).map_err(|e| extraction_failed(path, e))
}

fn read_pptx_blocking(path: &Path) -> Result<Vec<String>, Doc2StudyError> {
    let mut archive = open_archive(path)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut texts = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        let xml = read_entry(&mut archive, &name, path)?;
        let paragraphs = xml_paragraphs(&xml).map_err(|e| extraction_failed(path, e))?;
        let text = paragraphs
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        texts.push(text);
    }
    Ok(texts)
}

/// `ppt/slides/slide12.xml` → `Some(12)`; layouts, masters and rels → `None`.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Collect the text of every `<*:p>` paragraph in an OOXML part.
///
/// Only character data inside `<*:t>` runs counts; `<*:br>`/`<*:cr>` become
/// line breaks and `<*:tab>` a tab.
fn xml_paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // `<tab>` also names tab-stop definitions in paragraph properties.
    let mut in_run = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => current.clear(),
                b"r" => in_run = true,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"br" | b"cr" => current.push('\n'),
                b"tab" if in_run => current.push('\t'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(t) if in_text => {
                current.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const DOCX_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Photosynthesis</w:t></w:r><w:r><w:t xml:space="preserve"> &amp; light</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t>Line one</w:t><w:br/><w:t>Line two</w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    fn slide_xml(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{p}</a:t></a:r></a:p>"))
            .collect();
        format!(
            r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody>{body}<a:p/></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#
        )
    }

    fn write_zip(path: &Path, entries: &[(&str, String)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn format_detection_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_path("notes.PDF").unwrap(), DocumentFormat::Pdf);
        assert_eq!(DocumentFormat::from_path("a/b/deck.pptx").unwrap(), DocumentFormat::Pptx);
        assert_eq!(DocumentFormat::from_extension("Docx").unwrap(), DocumentFormat::Docx);
    }

    #[test]
    fn unknown_formats_are_rejected() {
        for name in ["slides.ppt", "essay.doc", "notes.txt", "no_extension"] {
            assert!(
                matches!(
                    DocumentFormat::from_path(name),
                    Err(Doc2StudyError::UnsupportedFormat { .. })
                ),
                "{name} should be unsupported"
            );
        }
    }

    #[test]
    fn slide_numbers_parse_only_slides() {
        assert_eq!(slide_number("ppt/slides/slide3.xml"), Some(3));
        assert_eq!(slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(slide_number("ppt/slides/_rels/slide3.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn docx_paragraphs_keep_empty_lines_and_breaks() {
        let paragraphs = xml_paragraphs(DOCX_BODY).unwrap();
        assert_eq!(
            paragraphs,
            vec!["Photosynthesis & light", "", "Line one\nLine two"]
        );
    }

    #[test]
    fn tab_stop_definitions_are_not_text() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/><w:tab w:val="right" w:pos="9000"/></w:tabs></w:pPr><w:r><w:t>Term</w:t><w:tab/><w:t>Definition</w:t></w:r></w:p>
</w:body></w:document>"#;
        assert_eq!(xml_paragraphs(xml).unwrap(), vec!["Term\tDefinition"]);
    }

    #[tokio::test]
    async fn reads_docx_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        write_zip(&path, &[("word/document.xml", DOCX_BODY.to_string())]);

        let blocks = FileDocumentReader
            .read(&path, DocumentFormat::Docx)
            .await
            .unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], ExtractedBlock::new(0, "Photosynthesis & light"));
        assert_eq!(blocks[2].index, 2);
    }

    #[tokio::test]
    async fn reads_pptx_slides_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        write_zip(
            &path,
            &[
                ("ppt/slides/slide10.xml", slide_xml(&["Ten"])),
                ("ppt/slides/slide2.xml", slide_xml(&["Two", "Second line"])),
                ("ppt/slides/slide1.xml", slide_xml(&["One"])),
                ("ppt/slideLayouts/slideLayout1.xml", slide_xml(&["Layout"])),
            ],
        );

        let blocks = FileDocumentReader
            .read(&path, DocumentFormat::Pptx)
            .await
            .unwrap();
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["One", "Two\nSecond line", "Ten"]);
    }

    #[tokio::test]
    async fn corrupt_container_is_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let err = FileDocumentReader
            .read(&path, DocumentFormat::Docx)
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2StudyError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = FileDocumentReader
            .read(Path::new("/definitely/not/here.docx"), DocumentFormat::Docx)
            .await
            .unwrap_err();
        assert!(matches!(err, Doc2StudyError::FileNotFound { .. }));
    }
}
