//! Text extraction for PDF, Word and plain-text files

use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Paragraphs assumed per page when a format carries no page structure
const PARAGRAPHS_PER_PAGE: usize = 10;
/// Characters assumed per page for plain text
const CHARS_PER_PAGE: usize = 3000;
/// pdf-extract can spin on some embedded fonts
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Text pulled out of an uploaded file
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Detected file type
    pub file_type: FileType,
    /// Full extracted text
    pub text: String,
    /// Page count (exact for PDF, estimated otherwise; at least 1)
    pub page_count: usize,
    /// SHA-256 of the extracted text
    pub content_hash: String,
}

/// Extracts text from supported files and enforces the page limit
#[derive(Debug, Clone)]
pub struct FileParser {
    max_pages: usize,
}

impl FileParser {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }

    /// Read a file from disk and extract its text
    pub fn extract(&self, path: &Path) -> Result<ExtractedText> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let data = std::fs::read(path)?;
        self.extract_bytes(&filename, &data)
    }

    /// Extract text from in-memory file contents; the type comes from `filename`
    pub fn extract_bytes(&self, filename: &str, data: &[u8]) -> Result<ExtractedText> {
        let file_type = FileType::from_filename(filename).ok_or_else(|| {
            let ext = filename.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
            Error::UnsupportedFileType(format!(
                "'{}' (supported: pdf, docx, doc, txt)",
                ext
            ))
        })?;

        let (text, page_count) = match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data)?,
            FileType::Docx | FileType::Doc => Self::parse_docx(filename, data)?,
            FileType::Txt => Self::parse_text(data),
        };

        if page_count > self.max_pages {
            return Err(Error::DocumentTooLarge {
                pages: page_count,
                max_pages: self.max_pages,
            });
        }

        tracing::debug!(
            "Extracted {} chars, {} pages from {}",
            text.len(),
            page_count,
            filename
        );

        Ok(ExtractedText {
            file_type,
            content_hash: hash_content(&text),
            text,
            page_count,
        })
    }

    fn parse_pdf(filename: &str, data: &[u8]) -> Result<(String, usize)> {
        let document = lopdf::Document::load_mem(data);
        let pages = match &document {
            Ok(doc) => doc.get_pages().len().max(1),
            Err(e) => {
                tracing::warn!("Could not count pages of {}: {}", filename, e);
                1
            }
        };

        let owned = data.to_vec();
        let extracted = run_with_timeout(PDF_EXTRACT_TIMEOUT, move || {
            pdf_extract::extract_text_from_mem(&owned).map_err(|e| e.to_string())
        });

        let text = match extracted {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                tracing::warn!("pdf-extract failed on {}: {}, trying lopdf", filename, e);
                Self::pdf_text_fallback(filename, document)?
            }
            None => {
                tracing::error!(
                    "pdf-extract gave no result for {} within {:?}, trying lopdf",
                    filename,
                    PDF_EXTRACT_TIMEOUT
                );
                Self::pdf_text_fallback(filename, document)?
            }
        };

        Ok((text, pages))
    }

    fn pdf_text_fallback(
        filename: &str,
        document: std::result::Result<lopdf::Document, lopdf::Error>,
    ) -> Result<String> {
        let doc = document
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let text = doc
            .extract_text(&page_numbers)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        if text.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF has no extractable text (image-based or encrypted)",
            ));
        }
        Ok(text)
    }

    fn parse_docx(filename: &str, data: &[u8]) -> Result<(String, usize)> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut text = String::new();
        let mut paragraphs = 0usize;

        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut line = String::new();
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(t) = child {
                                line.push_str(&t.text);
                            }
                        }
                    }
                }
                paragraphs += 1;
                text.push_str(&line);
                text.push('\n');
            }
        }

        Ok((text, (paragraphs / PARAGRAPHS_PER_PAGE).max(1)))
    }

    fn parse_text(data: &[u8]) -> (String, usize) {
        let text = String::from_utf8_lossy(data).into_owned();
        let pages = (text.chars().count() / CHARS_PER_PAGE).max(1);
        (text, pages)
    }
}

/// Run `op` on its own thread; `None` if it times out or panics.
///
/// A timed-out thread is left to finish in the background.
fn run_with_timeout<T, F>(timeout: Duration, op: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(op());
    });
    rx.recv_timeout(timeout).ok()
}

/// Hex SHA-256 of a string
pub fn hash_content(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        let parser = FileParser::new(1000);
        let out = parser
            .extract_bytes("notes.txt", "Refunds take 5 days.".as_bytes())
            .unwrap();

        assert_eq!(out.file_type, FileType::Txt);
        assert_eq!(out.text, "Refunds take 5 days.");
        assert_eq!(out.page_count, 1);
        assert_eq!(out.content_hash.len(), 64);
    }

    #[test]
    fn test_unsupported_type() {
        let parser = FileParser::new(1000);
        let err = parser.extract_bytes("budget.xlsx", b"PK").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_page_limit() {
        let parser = FileParser::new(2);
        let text = "a".repeat(CHARS_PER_PAGE * 3);

        let err = parser.extract_bytes("long.txt", text.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::DocumentTooLarge { pages: 3, max_pages: 2 }
        ));
    }

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let parser = FileParser::new(1000);
        let err = parser.extract_bytes("broken.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn test_timeout_guard() {
        let quick = run_with_timeout(Duration::from_secs(5), || 42);
        assert_eq!(quick, Some(42));

        let stuck = run_with_timeout(Duration::from_millis(20), || {
            thread::sleep(Duration::from_secs(2));
            42
        });
        assert_eq!(stuck, None);

        let crashed: Option<u32> = run_with_timeout(Duration::from_secs(5), || panic!("bad font"));
        assert_eq!(crashed, None);
    }

    #[test]
    fn test_extract_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("faq.txt");
        std::fs::write(&path, "Question one.\nAnswer one.").unwrap();

        let out = FileParser::new(10).extract(&path).unwrap();
        assert!(out.text.contains("Answer one."));
    }
}
