use bytes::Bytes;
use tracing::{debug, warn};

use super::ocr::OcrEngine;
use super::{ExtractedText, ExtractionError, PageExtraction};

/// Pages with fewer non-whitespace characters than this are sent to OCR.
pub const MIN_DIRECT_CHARS: usize = 10;

/// Extracts a PDF page by page. Pages without a usable text layer are OCR'd
/// individually; an OCR failure empties that page instead of failing the document.
pub async fn extract_pdf(
    content: Bytes,
    ocr: &dyn OcrEngine,
) -> Result<ExtractedText, ExtractionError> {
    let direct = {
        let content = content.clone();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&content))
            .await
    };

    let page_texts: Vec<Option<String>> = match direct {
        Ok(Ok(pages)) => {
            let mut pages: Vec<Option<String>> = pages.into_iter().map(Some).collect();
            pad_missing_pages(&mut pages, &content, ocr).await;
            pages
        }
        Ok(Err(e)) => ocr_only_pages(&content, ocr, &e.to_string()).await?,
        // pdf-extract panics on some malformed inputs; treat that like a parse error.
        Err(join_err) => ocr_only_pages(&content, ocr, &join_err.to_string()).await?,
    };

    if page_texts.is_empty() {
        return Err(ExtractionError::Pdf("document has no pages".to_string()));
    }

    Ok(assemble_pages(page_texts, &content, ocr).await)
}

/// pdf-extract stops at the first page it cannot read, silently dropping the
/// rest. Pages beyond the text layer's count are queued for OCR.
async fn pad_missing_pages(pages: &mut Vec<Option<String>>, content: &[u8], ocr: &dyn OcrEngine) {
    match ocr.page_count(content).await {
        Ok(count) if count > pages.len() => {
            warn!(
                "PDF text layer ended after {} of {count} pages; running OCR on the rest",
                pages.len()
            );
            pages.resize(count, None);
        }
        Ok(_) => {}
        Err(e) => debug!("Could not confirm PDF page count ({e}); using the text layer as is"),
    }
}

/// Text layer unreadable: every page goes through OCR.
async fn ocr_only_pages(
    content: &[u8],
    ocr: &dyn OcrEngine,
    cause: &str,
) -> Result<Vec<Option<String>>, ExtractionError> {
    warn!("PDF text layer unreadable ({cause}); falling back to OCR for all pages");
    let count = ocr.page_count(content).await.map_err(|e| {
        ExtractionError::Pdf(format!("{cause}; OCR fallback could not count pages: {e}"))
    })?;
    Ok(vec![None; count])
}

/// `None` entries, and pages below `MIN_DIRECT_CHARS`, are OCR'd.
async fn assemble_pages(
    page_texts: Vec<Option<String>>,
    content: &[u8],
    ocr: &dyn OcrEngine,
) -> ExtractedText {
    let mut pages = Vec::with_capacity(page_texts.len());

    for (index, direct) in page_texts.into_iter().enumerate() {
        match direct {
            Some(text) if has_usable_text(&text) => pages.push((
                text,
                PageExtraction {
                    ocr_used: false,
                    ocr_error: None,
                },
            )),
            _ => {
                debug!("Page {} has no usable text layer, running OCR", index + 1);
                let page = match ocr.recognize_page(content, index).await {
                    Ok(text) => (
                        text,
                        PageExtraction {
                            ocr_used: true,
                            ocr_error: None,
                        },
                    ),
                    Err(e) => {
                        warn!("OCR failed on page {}: {e}", index + 1);
                        (
                            String::new(),
                            PageExtraction {
                                ocr_used: true,
                                ocr_error: Some(e.to_string()),
                            },
                        )
                    }
                };
                pages.push(page);
            }
        }
    }

    ExtractedText::from_pages(pages)
}

fn has_usable_text(text: &str) -> bool {
    text.chars().filter(|c| !c.is_whitespace()).count() >= MIN_DIRECT_CHARS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::testing::ScriptedOcr;
    use crate::extraction::ExtractionMethod;

    /// Minimal single-page PDF with a Helvetica text layer.
    fn text_pdf(line: &str) -> Vec<u8> {
        let stream = format!("BT /F1 12 Tf 72 720 Td ({line}) Tj ET");
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>"
                .to_string(),
            format!("<< /Length {} >>\nstream\n{stream}\nendstream", stream.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::new();
        for (n, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", n + 1));
        }
        let xref = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            pdf.push_str(&format!("{offset:010} 00000 n \n"));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        ));
        pdf.into_bytes()
    }

    fn squashed(text: &str) -> String {
        text.split_whitespace().collect()
    }

    #[tokio::test]
    async fn test_text_layer_pdf_is_extracted_directly() {
        let ocr = ScriptedOcr::default();
        let pdf = Bytes::from(text_pdf("Jane Doe Senior Rust Engineer"));

        let extracted = extract_pdf(pdf, &ocr).await.unwrap();

        assert!(
            squashed(&extracted.text).contains("JaneDoeSeniorRustEngineer"),
            "got {:?}",
            extracted.text
        );
        assert_eq!(extracted.method, ExtractionMethod::Direct);
        assert_eq!(extracted.pages.len(), 1);
        assert_eq!(ocr.calls(), 0);
    }

    #[tokio::test]
    async fn test_pages_missing_from_text_layer_are_ocrd() {
        let mut ocr = ScriptedOcr {
            page_count: Some(3),
            ..Default::default()
        };
        ocr.pages.insert(1, Ok("Second page from OCR".to_string()));
        ocr.pages.insert(2, Ok("Third page from OCR".to_string()));
        let pdf = Bytes::from(text_pdf("Jane Doe Senior Rust Engineer"));

        let extracted = extract_pdf(pdf, &ocr).await.unwrap();

        assert_eq!(extracted.pages.len(), 3);
        assert_eq!(
            extracted.pages.iter().map(|p| p.ocr_used).collect::<Vec<_>>(),
            vec![false, true, true]
        );
        assert_eq!(ocr.calls(), 2);
        assert!(squashed(&extracted.text)
            .ends_with("SecondpagefromOCRThirdpagefromOCR"));
    }

    #[test]
    fn test_near_empty_page_is_not_usable() {
        assert!(!has_usable_text("   \n\t "));
        assert!(!has_usable_text(" a b c "));
        assert!(has_usable_text("Experienced backend engineer"));
    }

    #[tokio::test]
    async fn test_only_blank_pages_are_ocrd_in_order() {
        let mut ocr = ScriptedOcr::default();
        ocr.pages.insert(1, Ok("Scanned page two text".to_string()));
        let pages = vec![
            Some("Native page one with a real text layer".to_string()),
            Some("  ".to_string()),
            Some("Native page three, also real text".to_string()),
        ];

        let extracted = assemble_pages(pages, b"%PDF", &ocr).await;

        assert_eq!(ocr.calls(), 1);
        assert_eq!(
            extracted.text,
            "Native page one with a real text layer\nScanned page two text\nNative page three, also real text"
        );
        assert_eq!(extracted.method, ExtractionMethod::Ocr);
        assert_eq!(
            extracted.pages.iter().map(|p| p.ocr_used).collect::<Vec<_>>(),
            vec![false, true, false]
        );
    }

    #[tokio::test]
    async fn test_ocr_failure_on_one_page_contributes_empty_text() {
        let mut ocr = ScriptedOcr::default();
        ocr.pages.insert(0, Err("tesseract crashed".to_string()));
        ocr.pages.insert(1, Ok("Recovered second page".to_string()));

        let extracted = assemble_pages(vec![None, None], b"%PDF", &ocr).await;

        assert_eq!(extracted.text, "\nRecovered second page");
        assert!(extracted.pages[0]
            .ocr_error
            .as_deref()
            .unwrap()
            .contains("tesseract crashed"));
        assert!(extracted.pages[1].ocr_error.is_none());
    }

    #[tokio::test]
    async fn test_all_native_pages_use_direct_method() {
        let ocr = ScriptedOcr::default();
        let extracted = assemble_pages(
            vec![Some("A page with plenty of characters".to_string())],
            b"%PDF",
            &ocr,
        )
        .await;
        assert_eq!(extracted.method, ExtractionMethod::Direct);
        assert_eq!(ocr.calls(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_pdf_without_page_count_fails() {
        let ocr = ScriptedOcr::default();
        let err = extract_pdf(Bytes::from_static(b"this is not a pdf"), &ocr)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Pdf(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_unreadable_pdf_falls_back_to_full_ocr() {
        let mut ocr = ScriptedOcr {
            page_count: Some(2),
            ..Default::default()
        };
        ocr.pages.insert(0, Ok("first scanned".to_string()));
        ocr.pages.insert(1, Ok("second scanned".to_string()));

        let extracted = extract_pdf(Bytes::from_static(b"this is not a pdf"), &ocr)
            .await
            .unwrap();
        assert_eq!(extracted.text, "first scanned\nsecond scanned");
        assert_eq!(extracted.ocr_page_count(), 2);
    }
}
