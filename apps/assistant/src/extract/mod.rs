//! Document Extractor: turns uploaded resume bytes into plain text.
//!
//! Extraction never fails past this module: decoding errors are reported
//! through `tracing` and collapse to an empty string, so callers detect
//! "no text extracted" the same way whatever went wrong.

use std::fmt;

use thiserror::Error;
use tracing::{debug, error};

mod docx;
mod pdf;

/// Upload formats accepted by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Determines the format from the filename suffix (case-insensitive).
    /// Returns `None` for anything other than `.pdf` or `.docx`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.trim().to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            Some(DocumentFormat::Pdf)
        } else if lower.ends_with(".docx") {
            Some(DocumentFormat::Docx)
        } else {
            None
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "PDF"),
            DocumentFormat::Docx => write!(f, "DOCX"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("PDF parser panicked")]
    PdfPanicked,

    #[error("Failed to read DOCX as ZIP: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid DOCX: missing word/document.xml")]
    MissingDocumentXml,

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pluggable extractor. The orchestrator holds an `Arc<dyn DocumentExtractor>`
/// so tests can substitute canned text for real documents.
pub trait DocumentExtractor: Send + Sync {
    /// Best-effort plain text; empty on any failure.
    fn extract(&self, content: &[u8], format: DocumentFormat) -> String;
}

/// Default extractor backed by `pdf-extract` and a `zip` + `quick-xml` DOCX reader.
pub struct TextExtractor;

impl DocumentExtractor for TextExtractor {
    fn extract(&self, content: &[u8], format: DocumentFormat) -> String {
        match try_extract(content, format) {
            Ok(text) => {
                debug!("Extracted {} chars from {} upload", text.len(), format);
                text
            }
            Err(e) => {
                error!("Error reading {} file: {}", format, e);
                String::new()
            }
        }
    }
}

/// Fallible extraction core.
pub fn try_extract(content: &[u8], format: DocumentFormat) -> Result<String, ExtractError> {
    match format {
        DocumentFormat::Pdf => pdf::extract_text(content),
        DocumentFormat::Docx => docx::extract_text(content),
    }
}
