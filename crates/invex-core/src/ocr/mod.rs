//! OCR fallback for scanned invoices.
//!
//! Two capabilities are needed: something that turns PDF pages into images
//! and an engine that reads text off an image. Both are detected when the
//! pipeline is built; if either is missing the OCR stage is skipped.

mod preprocessing;
#[cfg(feature = "native")]
mod pure_engine;
mod rasterize;
mod tesseract;

pub use preprocessing::ImagePreprocessor;
#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;
pub use rasterize::{EmbeddedImageRasterizer, PdftoppmRasterizer};
pub use tesseract::TesseractEngine;

use image::{DynamicImage, GrayImage};
use tracing::{debug, info, warn};

use crate::error::OcrError;
use crate::models::config::{OcrConfig, OcrEngineKind};

/// Renders PDF pages to images.
pub trait PageRasterizer {
    fn name(&self) -> &'static str;

    /// One image per page, in page order.
    fn rasterize(&self, data: &[u8], dpi: u32) -> crate::Result<Vec<DynamicImage>>;
}

/// Recognizes text on a single grayscale page image.
pub trait OcrBackend {
    fn name(&self) -> &'static str;

    fn recognize(&self, image: &GrayImage) -> Result<String, OcrError>;
}

/// Rasterize, convert to grayscale, recognize, concatenate.
pub struct OcrPipeline {
    rasterizer: Option<Box<dyn PageRasterizer>>,
    engine: Option<Box<dyn OcrBackend>>,
    preprocessor: ImagePreprocessor,
    dpi: u32,
    max_pages: usize,
}

impl OcrPipeline {
    /// A pipeline with no capabilities; OCR always fails.
    pub fn disabled() -> Self {
        Self {
            rasterizer: None,
            engine: None,
            preprocessor: ImagePreprocessor::new(),
            dpi: 300,
            max_pages: 0,
        }
    }

    /// Probe the system for a rasterizer and an engine according to the config.
    pub fn detect(config: &OcrConfig) -> Self {
        let mut pipeline = Self::disabled()
            .with_dpi(config.render_dpi)
            .with_max_pages(config.max_pages)
            .with_preprocessor(ImagePreprocessor::new().with_max_size(config.max_image_size));

        if config.engine == OcrEngineKind::Disabled {
            info!("OCR disabled by configuration");
            return pipeline;
        }

        pipeline.engine = create_engine(config);
        pipeline.rasterizer = match PdftoppmRasterizer::detect(&config.pdftoppm_path) {
            Some(pdftoppm) => Some(Box::new(pdftoppm)),
            None => {
                debug!("pdftoppm not found, OCR will read embedded page images");
                Some(Box::new(EmbeddedImageRasterizer::new()))
            }
        };

        match (&pipeline.rasterizer, &pipeline.engine) {
            (Some(r), Some(e)) => info!("OCR available: {} + {}", r.name(), e.name()),
            _ => warn!("No OCR engine available; scanned invoices will yield no text"),
        }

        pipeline
    }

    pub fn with_rasterizer(mut self, rasterizer: Box<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn with_engine(mut self, engine: Box<dyn OcrBackend>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Limit the number of pages recognized (0 = unlimited).
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn is_available(&self) -> bool {
        self.rasterizer.is_some() && self.engine.is_some()
    }

    /// Run OCR over every page. `None` when unavailable or nothing was read.
    pub fn extract_text(&self, data: &[u8]) -> Option<String> {
        let (Some(rasterizer), Some(engine)) = (&self.rasterizer, &self.engine) else {
            debug!("OCR stage skipped: capability unavailable");
            return None;
        };

        let pages = match rasterizer.rasterize(data, self.dpi) {
            Ok(pages) => pages,
            Err(e) => {
                warn!("{} failed: {}", rasterizer.name(), e);
                return None;
            }
        };

        let limit = if self.max_pages == 0 { pages.len() } else { self.max_pages };
        let total = pages.len().min(limit);
        let mut texts = Vec::with_capacity(total);

        for (i, page) in pages.iter().take(limit).enumerate() {
            debug!("OCR processing page {}/{}", i + 1, total);
            let gray = self.preprocessor.prepare(page);
            match engine.recognize(&gray) {
                Ok(text) if !text.trim().is_empty() => texts.push(text),
                Ok(_) => debug!("No text recognized on page {}", i + 1),
                Err(e) => warn!("OCR failed for page {}: {}", i + 1, e),
            }
        }

        if texts.is_empty() {
            return None;
        }

        let text = texts.join("\n\n");
        info!("OCR extracted {} characters from {} pages", text.len(), total);
        Some(text)
    }
}

/// Pick an engine according to the configured kind.
pub fn create_engine(config: &OcrConfig) -> Option<Box<dyn OcrBackend>> {
    match config.engine {
        OcrEngineKind::Disabled => None,
        OcrEngineKind::Tesseract => tesseract_engine(config),
        OcrEngineKind::Onnx => onnx_engine(config),
        OcrEngineKind::Auto => onnx_engine(config).or_else(|| tesseract_engine(config)),
    }
}

fn tesseract_engine(config: &OcrConfig) -> Option<Box<dyn OcrBackend>> {
    TesseractEngine::detect(&config.tesseract_path, &config.language)
        .map(|e| Box::new(e) as Box<dyn OcrBackend>)
}

#[cfg(feature = "native")]
fn onnx_engine(config: &OcrConfig) -> Option<Box<dyn OcrBackend>> {
    match PureOcrEngine::from_dir(&config.model_dir, config.keep_unk) {
        Ok(engine) => Some(Box::new(engine)),
        Err(e) => {
            debug!("ONNX OCR engine unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "native"))]
fn onnx_engine(_config: &OcrConfig) -> Option<Box<dyn OcrBackend>> {
    debug!("ONNX OCR engine not compiled in");
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::Cell;

    /// Returns `pages` blank images.
    pub struct FakeRasterizer {
        pub pages: usize,
    }

    impl PageRasterizer for FakeRasterizer {
        fn name(&self) -> &'static str {
            "fake_rasterizer"
        }

        fn rasterize(&self, _data: &[u8], _dpi: u32) -> crate::Result<Vec<DynamicImage>> {
            Ok((0..self.pages)
                .map(|_| DynamicImage::new_rgb8(8, 8))
                .collect())
        }
    }

    /// Returns the same text for every page and counts calls.
    pub struct FakeEngine {
        pub text: String,
        pub calls: Cell<usize>,
    }

    impl FakeEngine {
        pub fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: Cell::new(0),
            }
        }
    }

    impl OcrBackend for FakeEngine {
        fn name(&self) -> &'static str {
            "fake_engine"
        }

        fn recognize(&self, _image: &GrayImage) -> Result<String, OcrError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.text.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_disabled_pipeline_yields_nothing() {
        let pipeline = OcrPipeline::disabled();
        assert!(!pipeline.is_available());
        assert_eq!(pipeline.extract_text(b"%PDF-1.4"), None);
    }

    #[test]
    fn test_pages_are_joined() {
        let pipeline = OcrPipeline::disabled()
            .with_rasterizer(Box::new(FakeRasterizer { pages: 2 }))
            .with_engine(Box::new(FakeEngine::new("Invoice total")));

        assert!(pipeline.is_available());
        assert_eq!(
            pipeline.extract_text(b"").as_deref(),
            Some("Invoice total\n\nInvoice total")
        );
    }

    #[test]
    fn test_max_pages_limits_recognition() {
        let pipeline = OcrPipeline::disabled()
            .with_rasterizer(Box::new(FakeRasterizer { pages: 5 }))
            .with_engine(Box::new(FakeEngine::new("page")))
            .with_max_pages(2);

        assert_eq!(pipeline.extract_text(b"").as_deref(), Some("page\n\npage"));
    }

    #[test]
    fn test_engine_without_rasterizer_is_unavailable() {
        let pipeline = OcrPipeline::disabled().with_engine(Box::new(FakeEngine::new("x")));
        assert!(!pipeline.is_available());
        assert_eq!(pipeline.extract_text(b""), None);
    }

    #[test]
    fn test_disabled_kind_creates_no_engine() {
        let config = OcrConfig {
            engine: OcrEngineKind::Disabled,
            ..OcrConfig::default()
        };
        assert!(create_engine(&config).is_none());
        assert!(!OcrPipeline::detect(&config).is_available());
    }
}
