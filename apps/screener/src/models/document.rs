use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::extraction::ExtractionError;

/// Document formats accepted by the extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "txt" => Some(DocumentFormat::Txt),
            _ => None,
        }
    }

    /// Infers the format from a file name such as `jane_doe.PDF`.
    pub fn from_file_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Txt => "txt",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted resume: identifier, format tag and raw bytes. Immutable once built.
#[derive(Debug, Clone)]
pub struct Document {
    id: String,
    format: DocumentFormat,
    bytes: Bytes,
}

impl Document {
    pub fn new(id: impl Into<String>, format: DocumentFormat, bytes: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            format,
            bytes: bytes.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap shared handle to the content, for moving into blocking tasks.
    pub fn content(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.bytes)
    }
}

/// Lowercase hex SHA-256 of a document's raw bytes. Used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of a batch as submitted. Files whose format is not recognized are
/// kept so they can be reported as failures in submission order.
#[derive(Debug, Clone)]
pub enum Submission {
    Accepted(Document),
    Rejected { id: String, reason: String },
}

impl Submission {
    /// Builds a submission from an uploaded file name and its bytes.
    pub fn from_upload(file_name: &str, bytes: impl Into<Bytes>) -> Self {
        match DocumentFormat::from_file_name(file_name) {
            Some(format) => Submission::Accepted(Document::new(file_name, format, bytes)),
            None => Submission::Rejected {
                id: file_name.to_string(),
                reason: ExtractionError::UnsupportedFormat(file_name.to_string()).to_string(),
            },
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Submission::Accepted(document) => document.id(),
            Submission::Rejected { id, .. } => id,
        }
    }
}

impl From<Document> for Submission {
    fn from(document: Document) -> Self {
        Submission::Accepted(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_file_name_is_case_insensitive() {
        assert_eq!(
            DocumentFormat::from_file_name("Jane Doe.PDF"),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_file_name("cv.docx"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(DocumentFormat::from_file_name("notes.txt"), Some(DocumentFormat::Txt));
        assert_eq!(DocumentFormat::from_file_name("photo.png"), None);
        assert_eq!(DocumentFormat::from_file_name("README"), None);
    }

    #[test]
    fn test_submission_from_upload() {
        match Submission::from_upload("jane.PDF", b"%PDF".to_vec()) {
            Submission::Accepted(doc) => assert_eq!(doc.format(), DocumentFormat::Pdf),
            other => panic!("expected accepted, got {other:?}"),
        }
        let rejected = Submission::from_upload("photo.png", b"png".to_vec());
        assert!(matches!(rejected, Submission::Rejected { ref reason, .. } if reason.contains("photo.png")));
        assert_eq!(rejected.id(), "photo.png");
    }

    #[test]
    fn test_identical_bytes_identical_fingerprint() {
        let a = Document::new("a.txt", DocumentFormat::Txt, b"hello world".to_vec());
        let b = Document::new("b.txt", DocumentFormat::Txt, b"hello world".to_vec());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_single_byte_difference_changes_fingerprint() {
        assert_ne!(Fingerprint::of(b"hello world"), Fingerprint::of(b"hello worle"));
    }

    #[test]
    fn test_fingerprint_is_lowercase_sha256_hex() {
        let fp = Fingerprint::of(b"abc");
        assert_eq!(
            fp.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
