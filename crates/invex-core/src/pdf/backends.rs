//! Text-layer backends using lopdf and pdf-extract.

use std::borrow::Cow;

use lopdf::Document;
use tracing::{debug, trace};

use super::{Result, TextBackend};
use crate::error::PdfError;

/// Load a document, decrypting PDFs protected only by an empty password.
pub fn load_document(data: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    if doc.is_encrypted() {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    if doc.get_pages().is_empty() {
        return Err(PdfError::NoPages);
    }

    Ok(doc)
}

/// Reads the text layer page by page with lopdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageTextBackend;

impl PageTextBackend {
    pub fn new() -> Self {
        Self
    }
}

impl TextBackend for PageTextBackend {
    fn name(&self) -> &'static str {
        "page_text"
    }

    fn extract(&self, data: &[u8]) -> Result<String> {
        let doc = load_document(data)?;

        let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        page_numbers.sort_unstable();

        let mut pages = Vec::with_capacity(page_numbers.len());
        for number in &page_numbers {
            match doc.extract_text(&[*number]) {
                Ok(text) => {
                    trace!("Page {}: {} chars", number, text.len());
                    pages.push(text);
                }
                Err(e) => {
                    // One unreadable page should not hide the others.
                    debug!("Page {} has no readable text layer: {}", number, e);
                    pages.push(String::new());
                }
            }
        }

        debug!("Read {} pages from text layer", pages.len());
        Ok(pages.join("\n"))
    }
}

/// Whole-document content-stream extraction with pdf-extract.
///
/// Independent of lopdf's text decoder, so it recovers text from fonts and
/// encodings the page reader garbles.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamTextBackend;

impl StreamTextBackend {
    pub fn new() -> Self {
        Self
    }
}

impl TextBackend for StreamTextBackend {
    fn name(&self) -> &'static str {
        "stream_text"
    }

    fn extract(&self, data: &[u8]) -> Result<String> {
        let bytes = decrypted_bytes(data)?;
        // pdf-extract panics on some font programs.
        match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes)) {
            Ok(result) => result.map_err(|e| PdfError::TextExtraction(e.to_string())),
            Err(_) => Err(PdfError::TextExtraction("pdf-extract panicked".to_string())),
        }
    }
}

/// pdf-extract cannot decrypt, so hand it a re-saved copy of encrypted files.
fn decrypted_bytes(data: &[u8]) -> Result<Cow<'_, [u8]>> {
    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;
    if !doc.is_encrypted() {
        return Ok(Cow::Borrowed(data));
    }

    doc.decrypt("").map_err(|_| PdfError::Encrypted)?;
    let mut decrypted = Vec::new();
    doc.save_to(&mut decrypted)
        .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
    Ok(Cow::Owned(decrypted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_parse_error() {
        let err = PageTextBackend::new().extract(b"not a pdf").unwrap_err();
        assert!(matches!(err, PdfError::Parse(_)));

        assert!(StreamTextBackend::new().extract(b"").is_err());
    }

    #[test]
    fn test_backend_names_differ() {
        assert_ne!(PageTextBackend::new().name(), StreamTextBackend::new().name());
    }
}
