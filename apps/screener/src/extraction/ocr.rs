//! OCR backends for PDF pages that carry no usable text layer.
//!
//! `TesseractOcr` shells out to poppler's `pdftoppm`/`pdfinfo` and the
//! `tesseract` CLI. Each call works in its own temporary directory.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected OCR output: {0}")]
    InvalidOutput(String),
}

/// Renders a single PDF page and recognizes its text.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Number of pages in the PDF, used when the text layer cannot be read at all.
    async fn page_count(&self, pdf: &[u8]) -> Result<usize, OcrError>;

    /// Text of page `page_index` (0-based).
    async fn recognize_page(&self, pdf: &[u8], page_index: usize) -> Result<String, OcrError>;
}

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    dpi: u32,
    language: String,
}

impl TesseractOcr {
    pub fn new(dpi: u32, language: impl Into<String>) -> Self {
        Self {
            dpi,
            language: language.into(),
        }
    }

    async fn stage_pdf(pdf: &[u8]) -> Result<(tempfile::TempDir, PathBuf), OcrError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("input.pdf");
        tokio::fs::write(&path, pdf).await?;
        Ok((dir, path))
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn page_count(&self, pdf: &[u8]) -> Result<usize, OcrError> {
        let (_dir, input) = Self::stage_pdf(pdf).await?;
        let output = run("pdfinfo", Command::new("pdfinfo").arg(&input)).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_pdfinfo_pages(&stdout)
            .ok_or_else(|| OcrError::InvalidOutput("pdfinfo reported no page count".to_string()))
    }

    async fn recognize_page(&self, pdf: &[u8], page_index: usize) -> Result<String, OcrError> {
        let (dir, input) = Self::stage_pdf(pdf).await?;
        let page = (page_index + 1).to_string();
        let image_root = dir.path().join("page");

        run(
            "pdftoppm",
            Command::new("pdftoppm")
                .args(["-f", &page, "-l", &page, "-r", &self.dpi.to_string()])
                .args(["-png", "-singlefile"])
                .arg(&input)
                .arg(&image_root),
        )
        .await?;

        let image = image_root.with_extension("png");
        let output = run(
            "tesseract",
            Command::new("tesseract")
                .arg(&image)
                .arg("stdout")
                .args(["-l", &self.language]),
        )
        .await?;

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(
            "OCR page {} produced {} chars ({})",
            page_index + 1,
            text.len(),
            file_label(&image)
        );
        Ok(text)
    }
}

async fn run(tool: &'static str, command: &mut Command) -> Result<Output, OcrError> {
    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| OcrError::Spawn { tool, source })?;

    if !output.status.success() {
        return Err(OcrError::ToolFailed {
            tool,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reads the `Pages:` line of `pdfinfo` output.
fn parse_pdfinfo_pages(stdout: &str) -> Option<usize> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|rest| rest.trim().parse().ok())
}
