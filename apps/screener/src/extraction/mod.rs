//! Text extraction: turns a raw document into plain text.
//!
//! Plain text passes through, DOCX is read from its XML document tree, and PDF
//! is extracted page by page with an OCR fallback for pages that carry no text
//! layer. Caching is layered on top by `crate::cache`, never done here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::document::{Document, DocumentFormat};

pub mod docx;
pub mod ocr;
pub mod pdf;

use ocr::OcrEngine;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Unsupported or corrupt document structure: {0}")]
    UnsupportedStructure(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("No text could be extracted")]
    EmptyText,

    #[error("Extraction task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Direct,
    Ocr,
}

/// Per-page (or per-segment) record of how the text was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageExtraction {
    pub ocr_used: bool,
    /// Set when OCR was attempted on this page and failed; the page contributed no text.
    pub ocr_error: Option<String>,
}

/// Plain text of a document plus how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub method: ExtractionMethod,
    pub pages: Vec<PageExtraction>,
}

impl ExtractedText {
    /// Single-segment text obtained without OCR.
    pub fn direct(text: String) -> Self {
        Self {
            text,
            method: ExtractionMethod::Direct,
            pages: vec![PageExtraction {
                ocr_used: false,
                ocr_error: None,
            }],
        }
    }

    /// Joins page texts in page order. The method is `Ocr` if any page needed OCR.
    pub fn from_pages(pages: Vec<(String, PageExtraction)>) -> Self {
        let method = if pages.iter().any(|(_, p)| p.ocr_used) {
            ExtractionMethod::Ocr
        } else {
            ExtractionMethod::Direct
        };
        let (texts, pages): (Vec<String>, Vec<PageExtraction>) = pages.into_iter().unzip();
        Self {
            text: texts.join("\n"),
            method,
            pages,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn ocr_page_count(&self) -> usize {
        self.pages.iter().filter(|p| p.ocr_used).count()
    }
}

/// Dispatches on the document format. Holds the OCR backend used for PDF pages.
#[derive(Clone)]
pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }

    pub async fn extract(&self, document: &Document) -> Result<ExtractedText, ExtractionError> {
        match document.format() {
            DocumentFormat::Txt => Ok(ExtractedText::direct(
                String::from_utf8_lossy(document.bytes()).into_owned(),
            )),
            DocumentFormat::Docx => {
                let content = document.content();
                let text = tokio::task::spawn_blocking(move || docx::extract_docx_text(&content))
                    .await
                    .map_err(|e| ExtractionError::Task(e.to_string()))??;
                Ok(ExtractedText::direct(text))
            }
            DocumentFormat::Pdf => pdf::extract_pdf(document.content(), self.ocr.as_ref()).await,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::ocr::{OcrEngine, OcrError};

    /// Scripted OCR engine: fixed page count, per-page results, call counter.
    #[derive(Default)]
    pub struct ScriptedOcr {
        pub page_count: Option<usize>,
        pub pages: HashMap<usize, Result<String, String>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedOcr {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OcrEngine for ScriptedOcr {
        async fn page_count(&self, _pdf: &[u8]) -> Result<usize, OcrError> {
            self.page_count
                .ok_or_else(|| OcrError::InvalidOutput("no page count scripted".to_string()))
        }

        async fn recognize_page(&self, _pdf: &[u8], page_index: usize) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(&page_index) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(msg)) => Err(OcrError::InvalidOutput(msg.clone())),
                None => Ok(String::new()),
            }
        }
    }
}
