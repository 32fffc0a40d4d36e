//! Raw text for an invoice file.
//!
//! Tries each PDF text backend in turn and falls back to OCR. A stage only
//! wins if its output passes the plausibility check; otherwise the next stage
//! runs. Only reading the file itself can fail with an error.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::config::InvexConfig;
use crate::ocr::OcrPipeline;
use crate::pdf::{PageTextBackend, PlausibilityCheck, StreamTextBackend, TextBackend};

/// Stage of the chain that produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    PageText,
    StreamText,
    Ocr,
}

impl fmt::Display for TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PageText => "page_text",
            Self::StreamText => "stream_text",
            Self::Ocr => "ocr",
        })
    }
}

/// Text that passed the plausibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub source: TextSource,
}

/// Layered text extraction: text layers first, OCR last.
pub struct TextExtractor {
    backends: Vec<(TextSource, Box<dyn TextBackend>)>,
    ocr: OcrPipeline,
    check: PlausibilityCheck,
}

impl TextExtractor {
    /// The default chain with OCR capabilities detected from the config.
    pub fn from_config(config: &InvexConfig) -> Self {
        let backends: Vec<(TextSource, Box<dyn TextBackend>)> = vec![
            (TextSource::PageText, Box::new(PageTextBackend::new()) as Box<dyn TextBackend>),
            (TextSource::StreamText, Box::new(StreamTextBackend::new()) as Box<dyn TextBackend>),
        ];

        Self {
            backends,
            ocr: OcrPipeline::detect(&config.ocr),
            check: PlausibilityCheck::new(&config.pdf),
        }
    }

    /// Replace the text-layer backends; the first is tagged `page_text`, the rest `stream_text`.
    pub fn with_backends(mut self, backends: Vec<Box<dyn TextBackend>>) -> Self {
        self.backends = backends
            .into_iter()
            .enumerate()
            .map(|(i, b)| {
                let source = if i == 0 {
                    TextSource::PageText
                } else {
                    TextSource::StreamText
                };
                (source, b)
            })
            .collect();
        self
    }

    pub fn with_ocr(mut self, ocr: OcrPipeline) -> Self {
        self.ocr = ocr;
        self
    }

    pub fn with_check(mut self, check: PlausibilityCheck) -> Self {
        self.check = check;
        self
    }

    /// Read the file and run the chain. `Ok(None)` means no stage produced usable text.
    pub fn extract_text(&self, path: &Path) -> crate::Result<Option<ExtractedText>> {
        let data = std::fs::read(path)?;
        info!("Extracting text from {} ({} bytes)", path.display(), data.len());
        Ok(self.extract_from_bytes(&data))
    }

    /// Run the chain over PDF bytes already in memory.
    pub fn extract_from_bytes(&self, data: &[u8]) -> Option<ExtractedText> {
        for (source, backend) in &self.backends {
            match backend.extract(data) {
                Ok(text) => {
                    if self.check.is_plausible(&text) {
                        info!(
                            "{} produced {} characters",
                            backend.name(),
                            text.trim().chars().count()
                        );
                        return Some(ExtractedText {
                            text,
                            source: *source,
                        });
                    }
                    debug!(
                        "{} text not plausible ({} chars, {} keywords)",
                        backend.name(),
                        text.trim().chars().count(),
                        self.check.keyword_hits(&text)
                    );
                }
                Err(e) => warn!("{} failed: {}", backend.name(), e),
            }
        }

        debug!("Text layers unusable, trying OCR");
        match self.ocr.extract_text(data) {
            Some(text) if self.check.is_plausible(&text) => Some(ExtractedText {
                text,
                source: TextSource::Ocr,
            }),
            Some(text) => {
                debug!(
                    "OCR text not plausible ({} keywords)",
                    self.check.keyword_hits(&text)
                );
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfError;
    use crate::ocr::testing::{FakeEngine, FakeRasterizer};
    use pretty_assertions::assert_eq;

    struct FixedBackend(Result<&'static str, ()>);

    impl TextBackend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn extract(&self, _data: &[u8]) -> crate::pdf::Result<String> {
            self.0
                .map(str::to_string)
                .map_err(|_| PdfError::TextExtraction("broken".to_string()))
        }
    }

    fn extractor(first: Result<&'static str, ()>, second: Result<&'static str, ()>) -> TextExtractor {
        TextExtractor::from_config(&InvexConfig::default())
            .with_backends(vec![
                Box::new(FixedBackend(first)),
                Box::new(FixedBackend(second)),
            ])
            .with_ocr(OcrPipeline::disabled())
    }

    const GOOD: &str = "Invoice Number 1001 Total Amount $10.00";

    #[test]
    fn test_primary_backend_wins() {
        let got = extractor(Ok(GOOD), Ok("Invoice date and total from second")).extract_from_bytes(b"");
        assert_eq!(
            got,
            Some(ExtractedText {
                text: GOOD.to_string(),
                source: TextSource::PageText
            })
        );
    }

    #[test]
    fn test_implausible_primary_falls_through() {
        let got = extractor(Ok("   "), Ok(GOOD)).extract_from_bytes(b"").unwrap();
        assert_eq!(got.source, TextSource::StreamText);
    }

    #[test]
    fn test_backend_error_falls_through() {
        let got = extractor(Err(()), Ok(GOOD)).extract_from_bytes(b"").unwrap();
        assert_eq!(got.source, TextSource::StreamText);
    }

    #[test]
    fn test_ocr_runs_only_when_layers_fail() {
        let ocr = OcrPipeline::disabled()
            .with_rasterizer(Box::new(FakeRasterizer { pages: 1 }))
            .with_engine(Box::new(FakeEngine::new("Invoice total due 12.00")));

        let got = extractor(Ok("x"), Err(()))
            .with_ocr(ocr)
            .extract_from_bytes(b"")
            .unwrap();
        assert_eq!(got.source, TextSource::Ocr);
        assert_eq!(got.text, "Invoice total due 12.00");
    }

    #[test]
    fn test_nothing_plausible_is_none() {
        let ocr = OcrPipeline::disabled()
            .with_rasterizer(Box::new(FakeRasterizer { pages: 1 }))
            .with_engine(Box::new(FakeEngine::new("lorem ipsum dolor sit amet")));

        let got = extractor(Ok("hello world, nothing here"), Err(()))
            .with_ocr(ocr)
            .extract_from_bytes(b"");
        assert_eq!(got, None);
    }

    #[test]
    fn test_stricter_check_rejects_layer_text() {
        let strict = PlausibilityCheck::new(&crate::models::config::PdfConfig {
            min_keyword_hits: 5,
            ..Default::default()
        });

        let got = extractor(Ok(GOOD), Ok(GOOD)).with_check(strict).extract_from_bytes(b"");
        assert_eq!(got, None);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = extractor(Ok(GOOD), Ok(GOOD)).extract_text(Path::new("/nonexistent/invoice.pdf"));
        assert!(matches!(result, Err(crate::error::InvexError::Io(_))));
    }

    #[test]
    fn test_source_display() {
        assert_eq!(TextSource::StreamText.to_string(), "stream_text");
    }
}
