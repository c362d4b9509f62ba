use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Extracts paragraph text from a DOCX container.
///
/// Fails with `UnsupportedStructure` if the ZIP container is corrupt, the main
/// document part is missing, or its XML is malformed.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        ExtractionError::UnsupportedStructure(format!("Failed to open DOCX container: {e}"))
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| {
            ExtractionError::UnsupportedStructure(format!("Missing {DOCUMENT_PART}: {e}"))
        })?
        .read_to_string(&mut xml)
        .map_err(|e| {
            ExtractionError::UnsupportedStructure(format!("Failed to read {DOCUMENT_PART}: {e}"))
        })?;

    document_xml_to_text(&xml)
}

/// Walks the WordprocessingML tree: `w:t` runs carry text, `w:tab` becomes a tab,
/// `w:br`/`w:cr` a line break, and every paragraph ends with a newline.
/// Tab stops declared in paragraph properties are ignored.
fn document_xml_to_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;
    let mut in_props = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:t" => in_text = true,
                b"w:pPr" => in_props = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:pPr" => in_props = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" if !in_props => out.push('\t'),
                b"w:br" | b"w:cr" | b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| {
                    ExtractionError::UnsupportedStructure(format!("Bad text run: {e}"))
                })?;
                out.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::UnsupportedStructure(format!(
                    "Malformed {DOCUMENT_PART} at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(out.trim_end().to_string())
}

#[cfg(test)]
pub(crate) fn build_docx(document_xml: &str) -> Vec<u8> {
    use std::io::Write;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(DOCUMENT_PART, zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(document_xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p>
      <w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr>
      <w:r><w:t>Jane</w:t></w:r><w:r><w:t xml:space="preserve"> Doe</w:t></w:r>
    </w:p>
    <w:p>
      <w:r><w:t>Skills:</w:t><w:tab/><w:t>Rust &amp; SQL</w:t></w:r>
    </w:p>
    <w:p>
      <w:r><w:t>Line one</w:t><w:br/><w:t>Line two</w:t></w:r>
    </w:p>
  </w:body>
</w:document>"#;

    #[test]
    fn test_paragraphs_tabs_and_breaks() {
        let text = extract_docx_text(&build_docx(SAMPLE)).unwrap();
        assert_eq!(text, "Jane Doe\nSkills:\tRust & SQL\nLine one\nLine two");
    }

    #[test]
    fn test_missing_document_part() {
        use std::io::Write;

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/styles.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<w:styles/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = extract_docx_text(&bytes).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedStructure(_)));
    }

    #[test]
    fn test_mismatched_tags_are_rejected() {
        let xml = "<w:document><w:body><w:p><w:r><w:t>oops</w:r></w:p></w:body></w:document>";
        let err = extract_docx_text(&build_docx(xml)).unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedStructure(_)));
    }

    #[test]
    fn test_not_a_zip() {
        let err = extract_docx_text(b"PK\x03\x04garbage").unwrap_err();
        assert!(matches!(err, ExtractionError::UnsupportedStructure(_)));
    }
}
